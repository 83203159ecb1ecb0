//! Terminal UI demo rendering live execution state.
//!
//! Run with: cargo run -p tui-app-demo
//!
//! Type a query and press Enter to submit. F2 toggles the workflow
//! kind, Esc stops the current execution, Ctrl+L clears history,
//! Ctrl+C quits.

use std::{io, sync::Arc, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use forge_client_core::{
    ExecutionPhase, ExecutionRequest, ExecutionState, TokenStore, WorkflowKind,
};
use forge_client_session::{AuthManager, ExecutionController, FileTokenStore};
use forge_client_transport::{ApiClient, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new()?);
    let api = Arc::new(ApiClient::new(ClientConfig::from_env(), Arc::clone(&tokens)));
    let auth = AuthManager::new(Arc::clone(&api), Arc::clone(&tokens));

    let user = match auth.restore().await? {
        Some(user) => Some(user),
        None => {
            let email = std::env::var("AGENTFORGE_EMAIL").ok();
            let password = std::env::var("AGENTFORGE_PASSWORD").ok();
            match (email, password) {
                (Some(email), Some(password)) => Some(auth.login(&email, &password).await?),
                _ => None,
            }
        }
    };

    let controller = Arc::new(ExecutionController::new(Arc::clone(&api)));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, controller, user.map(|u| u.email)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

struct App {
    input: String,
    workflow: WorkflowKind,
    state: ExecutionState,
    user: Option<String>,
    scroll: u16,
}

impl App {
    fn new(user: Option<String>) -> Self {
        Self {
            input: String::new(),
            workflow: WorkflowKind::Execution,
            state: ExecutionState::default(),
            user,
            scroll: 0,
        }
    }

    fn toggle_workflow(&mut self) {
        self.workflow = match self.workflow {
            WorkflowKind::Execution => WorkflowKind::Maintenance,
            WorkflowKind::Maintenance => WorkflowKind::Execution,
        };
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: Arc<ExecutionController<ApiClient>>,
    user: Option<String>,
) -> anyhow::Result<()> {
    let mut app = App::new(user);
    let mut rx = controller.subscribe();

    loop {
        if rx.has_changed().unwrap_or(false) {
            app.state = rx.borrow_and_update().clone();
        }

        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                match key {
                    KeyEvent {
                        code: KeyCode::Char('c'),
                        modifiers: KeyModifiers::CONTROL,
                        ..
                    } => {
                        controller.stop();
                        return Ok(());
                    }
                    KeyEvent {
                        code: KeyCode::Char('l'),
                        modifiers: KeyModifiers::CONTROL,
                        ..
                    } => controller.clear(),
                    KeyEvent {
                        code: KeyCode::Esc, ..
                    } => controller.stop(),
                    KeyEvent {
                        code: KeyCode::F(2),
                        ..
                    } => app.toggle_workflow(),
                    KeyEvent {
                        code: KeyCode::Enter,
                        ..
                    } => {
                        if !app.input.trim().is_empty() && !app.state.in_progress() {
                            let request = ExecutionRequest::new(
                                std::mem::take(&mut app.input),
                                app.workflow,
                            );
                            let controller = Arc::clone(&controller);
                            tokio::spawn(async move {
                                if let Err(e) = controller.submit(request).await {
                                    tracing::debug!("submit rejected: {e}");
                                }
                            });
                        }
                    }
                    KeyEvent {
                        code: KeyCode::Char(c),
                        modifiers: KeyModifiers::NONE | KeyModifiers::SHIFT,
                        ..
                    } => app.input.push(c),
                    KeyEvent {
                        code: KeyCode::Backspace,
                        ..
                    } => {
                        app.input.pop();
                    }
                    KeyEvent {
                        code: KeyCode::Up, ..
                    } => app.scroll = app.scroll.saturating_sub(1),
                    KeyEvent {
                        code: KeyCode::Down,
                        ..
                    } => app.scroll = app.scroll.saturating_add(1),
                    _ => {}
                }
            }
        }
    }
}

fn phase_label(phase: ExecutionPhase) -> &'static str {
    match phase {
        ExecutionPhase::Idle => "idle",
        ExecutionPhase::Starting => "starting",
        ExecutionPhase::Streaming => "streaming",
        ExecutionPhase::Completed => "completed",
        ExecutionPhase::Failed => "failed",
        ExecutionPhase::Errored => "error",
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Updates
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status
        ])
        .split(f.area());

    // Update history
    let mut lines: Vec<Line> = app
        .state
        .history
        .iter()
        .map(|entry| {
            let update = &entry.update;
            let mut spans = vec![Span::styled(
                entry.received_at.format("%H:%M:%S ").to_string(),
                Style::default().fg(Color::DarkGray),
            )];
            if let Some(progress) = update.progress {
                spans.push(Span::raw(format!("{progress:>3}% ")));
            }
            if let Some(agent) = update.current_agent.as_deref() {
                spans.push(Span::styled(
                    format!("[{agent}] "),
                    Style::default().fg(Color::Cyan),
                ));
            }
            spans.push(Span::raw(update.message.clone().unwrap_or_default()));
            Line::from(spans)
        })
        .collect();

    if let Some(result) = app
        .state
        .current
        .as_ref()
        .and_then(|c| c.update.final_result.as_deref())
    {
        lines.push(Line::from(""));
        for line in result.lines() {
            lines.push(Line::from(line.to_string()));
        }
    }

    if let Some(error) = &app.state.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let title = match app.state.session_id {
        Some(id) => format!("Updates (session {id})"),
        None => "Updates".to_string(),
    };
    let updates = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(updates, chunks[0]);

    // Input area
    let workflow = match app.workflow {
        WorkflowKind::Execution => "execution",
        WorkflowKind::Maintenance => "maintenance",
    };
    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Query ({workflow})")),
        );
    f.render_widget(input, chunks[1]);
    f.set_cursor_position((chunks[1].x + app.input.len() as u16 + 1, chunks[1].y + 1));

    // Status bar
    let phase = app.state.phase;
    let phase_style = match phase {
        ExecutionPhase::Completed => Style::default().fg(Color::Green),
        ExecutionPhase::Failed | ExecutionPhase::Errored => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::Yellow),
    };
    let user = app.user.as_deref().unwrap_or("not logged in");

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(phase_label(phase), phase_style),
        Span::raw(format!(" | {user} | ")),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" submit | "),
        Span::styled("F2", Style::default().fg(Color::Yellow)),
        Span::raw(" workflow | "),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" stop | "),
        Span::styled("Ctrl+L", Style::default().fg(Color::Yellow)),
        Span::raw(" clear | "),
        Span::styled("Ctrl+C", Style::default().fg(Color::Yellow)),
        Span::raw(" quit "),
    ]));
    f.render_widget(status, chunks[2]);
}
