//! Controller for one execution request and its update subscription.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;

use forge_client_core::{
    AgentApi, ExecutionPhase, ExecutionRequest, ExecutionState, RunStatus, StampedUpdate,
    StateCell, UpdateStream,
};

/// Rejected submit action.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("an execution is already in progress")]
    AlreadyRunning,
}

/// Drives the lifecycle of one execution request at a time.
///
/// At most one subscription is open; starting a new request, stopping,
/// or clearing bumps the generation counter, which both cancels the
/// running pump task and invalidates any in-flight call so a late
/// completion cannot repopulate state.
pub struct ExecutionController<A: AgentApi + ?Sized> {
    api: Arc<A>,
    state: StateCell,
    cancel: watch::Sender<u64>,
}

impl<A: AgentApi + ?Sized> ExecutionController<A> {
    /// Create a controller over the given transport.
    #[must_use]
    pub fn new(api: Arc<A>) -> Self {
        let (cancel, _) = watch::channel(0);
        Self {
            api,
            state: StateCell::new(),
            cancel,
        }
    }

    /// Point-in-time copy of the view state.
    #[must_use]
    pub fn snapshot(&self) -> ExecutionState {
        self.state.snapshot()
    }

    /// Get a receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ExecutionState> {
        self.state.subscribe()
    }

    /// Submit a query and stream its updates until a terminal status.
    ///
    /// Returns once the request has been accepted or rejected by the
    /// backend; updates then arrive through the subscribed state. All
    /// transport failures surface in the state's `error` field rather
    /// than as a return value.
    ///
    /// # Errors
    /// Returns an error only for an empty query or when an execution
    /// is already in progress.
    pub async fn submit(&self, request: ExecutionRequest) -> Result<(), SubmitError> {
        if request.query.trim().is_empty() {
            return Err(SubmitError::EmptyQuery);
        }
        let Some(generation) = self.try_begin() else {
            return Err(SubmitError::AlreadyRunning);
        };

        let response = match self.api.execute_agent(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.fail(generation, e.to_string());
                return Ok(());
            }
        };

        let Some(session_id) = response.session_id else {
            self.fail(generation, "no session id returned from server".to_string());
            return Ok(());
        };

        let accepted = self.state.update_if_current(generation, |s| {
            s.session_id = Some(session_id);
            s.phase = ExecutionPhase::Streaming;
        });
        if !accepted {
            // Stopped or cleared while the execute call was in flight.
            tracing::debug!(session_id, "discarding late execute response");
            return Ok(());
        }

        let stream = match self.api.open_execution_stream(session_id).await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(generation, e.to_string());
                return Ok(());
            }
        };

        tokio::spawn(pump_updates(
            stream,
            generation,
            self.state.clone(),
            self.cancel.subscribe(),
        ));
        Ok(())
    }

    /// Cancel the current request: closes any open subscription and
    /// marks execution no longer in progress. History, current update,
    /// and error are kept.
    pub fn stop(&self) {
        let generation = self.bump(|s| {
            s.phase = ExecutionPhase::Idle;
        });
        let _ = self.cancel.send(generation);
    }

    /// Reset history, current update, error, and session id; closes
    /// any open subscription.
    pub fn clear(&self) {
        let generation = self.bump(|s| {
            s.phase = ExecutionPhase::Idle;
            s.history.clear();
            s.current = None;
            s.error = None;
            s.session_id = None;
        });
        let _ = self.cancel.send(generation);
    }

    /// Start a new generation if no execution is in progress.
    fn try_begin(&self) -> Option<u64> {
        let mut started = None;
        self.state.update(|s| {
            if s.in_progress() {
                return;
            }
            s.generation += 1;
            s.phase = ExecutionPhase::Starting;
            s.error = None;
            s.history.clear();
            s.current = None;
            s.session_id = None;
            started = Some(s.generation);
        });
        if let Some(generation) = started {
            let _ = self.cancel.send(generation);
        }
        started
    }

    fn bump<F>(&self, f: F) -> u64
    where
        F: FnOnce(&mut ExecutionState),
    {
        let mut generation = 0;
        self.state.update(|s| {
            s.generation += 1;
            generation = s.generation;
            f(s);
        });
        generation
    }

    fn fail(&self, generation: u64, message: String) {
        self.state.update_if_current(generation, |s| {
            s.phase = ExecutionPhase::Errored;
            s.error = Some(message);
        });
    }
}

/// Forward stream events into the state until a terminal status,
/// a stream failure, or a generation change.
async fn pump_updates(
    mut stream: UpdateStream,
    generation: u64,
    state: StateCell,
    mut cancel: watch::Receiver<u64>,
) {
    loop {
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() != generation {
                    break;
                }
            }
            next = stream.next() => match next {
                Some(Ok(update)) => {
                    if update.is_keepalive() {
                        continue;
                    }
                    let terminal = update.terminal_status();
                    let stamped = StampedUpdate::now(update);
                    let applied = state.update_if_current(generation, |s| {
                        s.current = Some(stamped.clone());
                        s.history.push(stamped.clone());
                        match terminal {
                            Some(RunStatus::Completed) => s.phase = ExecutionPhase::Completed,
                            Some(RunStatus::Failed) => s.phase = ExecutionPhase::Failed,
                            _ => {}
                        }
                    });
                    if !applied || terminal.is_some() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!("execution stream error: {e}");
                    state.update_if_current(generation, |s| {
                        s.phase = ExecutionPhase::Errored;
                        s.error = Some(e.to_string());
                    });
                    break;
                }
                None => {
                    state.update_if_current(generation, |s| {
                        if s.phase == ExecutionPhase::Streaming {
                            s.phase = ExecutionPhase::Errored;
                            s.error = Some("stream closed before completion".to_string());
                        }
                    });
                    break;
                }
            }
        }
    }
    // Dropping the stream here closes the subscription.
}
