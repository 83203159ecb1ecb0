//! Observable execution state with subscribe/notify support.

use std::sync::Arc;

use tokio::sync::watch;

use crate::traits::SessionId;
use crate::types::StampedUpdate;

/// Lifecycle phase of the current execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionPhase {
    /// No request in flight.
    #[default]
    Idle,
    /// Execute call issued, session id not yet known.
    Starting,
    /// Subscription open, updates arriving.
    Streaming,
    /// Terminal `completed` status observed.
    Completed,
    /// Terminal `failed` status observed.
    Failed,
    /// Transport or subscription failure.
    Errored,
}

/// Full view state for one execution request.
///
/// The generation counter increments on every start/stop/clear so
/// stale writers (late call completions, straggling stream events)
/// can be rejected.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    pub phase: ExecutionPhase,
    pub generation: u64,
    pub session_id: Option<SessionId>,
    pub current: Option<StampedUpdate>,
    pub history: Vec<StampedUpdate>,
    pub error: Option<String>,
}

impl ExecutionState {
    /// Whether a request is currently being started or streamed.
    #[must_use]
    pub const fn in_progress(&self) -> bool {
        matches!(
            self.phase,
            ExecutionPhase::Starting | ExecutionPhase::Streaming
        )
    }
}

/// State cell with broadcast-on-change semantics.
///
/// Essential for decoupling views from the controller: observers
/// subscribe once and re-render on every notification, regardless of
/// the rendering technology.
#[derive(Clone)]
pub struct StateCell {
    tx: Arc<watch::Sender<ExecutionState>>,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    /// Create a cell holding the idle state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ExecutionState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Point-in-time copy of the state.
    #[must_use]
    pub fn snapshot(&self) -> ExecutionState {
        self.tx.borrow().clone()
    }

    /// Get a receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ExecutionState> {
        self.tx.subscribe()
    }

    /// Apply a mutation and notify observers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ExecutionState),
    {
        self.tx.send_modify(f);
    }

    /// Apply a mutation only if the state still belongs to `generation`.
    ///
    /// Returns whether the mutation was applied. Observers are only
    /// notified when it was.
    pub fn update_if_current<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut ExecutionState),
    {
        let mut applied = false;
        self.tx.send_if_modified(|state| {
            if state.generation == generation {
                f(state);
                applied = true;
            }
            applied
        });
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_generation_is_rejected() {
        let cell = StateCell::new();
        cell.update(|s| s.generation = 2);

        let applied = cell.update_if_current(1, |s| s.error = Some("late".into()));
        assert!(!applied);
        assert!(cell.snapshot().error.is_none());

        let applied = cell.update_if_current(2, |s| s.error = Some("current".into()));
        assert!(applied);
        assert_eq!(cell.snapshot().error.as_deref(), Some("current"));
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let cell = StateCell::new();
        let mut rx = cell.subscribe();

        cell.update(|s| s.phase = ExecutionPhase::Starting);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().phase, ExecutionPhase::Starting);
    }

    #[test]
    fn test_rejected_update_does_not_notify() {
        let cell = StateCell::new();
        let rx = cell.subscribe();

        cell.update_if_current(99, |s| s.phase = ExecutionPhase::Errored);
        assert!(!rx.has_changed().unwrap());
    }
}
