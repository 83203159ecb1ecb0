//! Headless demo: log in, submit one query, print updates as they arrive.
//!
//! Run with: cargo run -p cli-app-demo -- "Draft an apology email"
//! List past sessions with: cargo run -p cli-app-demo -- --sessions
//!
//! Credentials come from `AGENTFORGE_EMAIL` / `AGENTFORGE_PASSWORD` when
//! no persisted session exists; the backend address from
//! `AGENTFORGE_API_URL`.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forge_client_core::{AgentApi, ExecutionPhase, ExecutionRequest, TokenStore, WorkflowKind};
use forge_client_session::{AuthManager, ExecutionController, FileTokenStore};
use forge_client_transport::{ApiClient, ClientConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let list_sessions = args.first().is_some_and(|a| a == "--sessions");
    if list_sessions {
        args.remove(0);
    }
    let workflow = if args.first().is_some_and(|a| a == "--maintenance") {
        args.remove(0);
        WorkflowKind::Maintenance
    } else {
        WorkflowKind::Execution
    };
    let query = args.join(" ");
    if !list_sessions && query.trim().is_empty() {
        bail!("usage: cli-app-demo [--sessions | [--maintenance] <query>]");
    }

    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new()?);
    let api = Arc::new(ApiClient::new(ClientConfig::from_env(), Arc::clone(&tokens)));
    let auth = AuthManager::new(Arc::clone(&api), Arc::clone(&tokens));

    match auth.restore().await? {
        Some(user) => tracing::info!("restored session for {}", user.email),
        None => {
            let email = std::env::var("AGENTFORGE_EMAIL")
                .context("no persisted session and AGENTFORGE_EMAIL not set")?;
            let password =
                std::env::var("AGENTFORGE_PASSWORD").context("AGENTFORGE_PASSWORD not set")?;
            let user = auth.login(&email, &password).await?;
            tracing::info!("logged in as {}", user.email);
        }
    }

    if list_sessions {
        let sessions = api.list_sessions(0, 50).await?;
        if sessions.is_empty() {
            println!("no past sessions");
        }
        for session in sessions {
            println!(
                "#{} [{}] {} {}",
                session.id,
                session.status,
                session.created_at.format("%Y-%m-%d %H:%M"),
                session.query
            );
        }
        return Ok(());
    }

    let controller = ExecutionController::new(Arc::clone(&api));
    controller
        .submit(ExecutionRequest::new(query, workflow))
        .await?;

    let mut rx = controller.subscribe();
    let mut printed = 0;
    loop {
        let state = rx.borrow_and_update().clone();

        for entry in &state.history[printed..] {
            printed += 1;
            let update = &entry.update;
            let progress = update
                .progress
                .map(|p| format!(" {p:>3}%"))
                .unwrap_or_default();
            let agent = update
                .current_agent
                .as_deref()
                .map(|a| format!(" [{a}]"))
                .unwrap_or_default();
            println!(
                "{}{progress}{agent} {}",
                entry.received_at.format("%H:%M:%S"),
                update.message.as_deref().unwrap_or("")
            );
            if let Some(result) = update.final_result.as_deref() {
                println!("\n{result}");
            }
            if let Some(error) = update.error_text() {
                eprintln!("workflow error: {error}");
            }
        }

        match state.phase {
            ExecutionPhase::Completed => return Ok(()),
            ExecutionPhase::Failed => bail!("workflow failed"),
            ExecutionPhase::Errored => {
                bail!(state.error.unwrap_or_else(|| "unknown error".to_string()))
            }
            _ => {}
        }

        rx.changed().await?;
    }
}
