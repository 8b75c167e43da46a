//! Read-only progress reporting for an in-flight loop run.
//!
//! The controller owns the run's state; observers (a status endpoint, a
//! UI, a test) get an owned snapshot copy and never a live reference to
//! mutable state.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Controller states. `Retrying` loops back to `Generating`; the other
/// four right-hand states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    /// No attempt started yet.
    Idle,
    /// Waiting on the completion service.
    Generating,
    /// Waiting on the compiler.
    Verifying,
    /// Compile failed with attempts remaining; feedback is being carried
    /// into the next prompt.
    Retrying,
    Succeeded,
    Exhausted,
    Aborted,
}

impl LoopState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoopState::Succeeded | LoopState::Exhausted | LoopState::Aborted
        )
    }
}

/// Owned copy of the run's progress at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub state: LoopState,
    /// Sequence number of the attempt the state refers to (0 while idle).
    pub sequence_number: u32,
    /// Attempts fully recorded so far.
    pub attempts_recorded: usize,
}

/// Shared handle that hands out snapshots of the run's progress.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressSnapshot>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProgressSnapshot {
                state: LoopState::Idle,
                sequence_number: 0,
                attempts_recorded: 0,
            })),
        }
    }

    pub(crate) fn enter(&self, state: LoopState, sequence_number: u32, attempts_recorded: usize) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.state = state;
        guard.sequence_number = sequence_number;
        guard.attempts_recorded = attempts_recorded;
    }

    /// Owned copy of the current progress.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let tracker = ProgressTracker::new();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.state, LoopState::Idle);
        assert_eq!(snapshot.sequence_number, 0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let tracker = ProgressTracker::new();
        let before = tracker.snapshot();
        tracker.enter(LoopState::Generating, 1, 0);
        // The earlier snapshot is unaffected by later transitions.
        assert_eq!(before.state, LoopState::Idle);
        assert_eq!(tracker.snapshot().state, LoopState::Generating);
    }

    #[test]
    fn test_terminal_states() {
        assert!(LoopState::Succeeded.is_terminal());
        assert!(LoopState::Exhausted.is_terminal());
        assert!(LoopState::Aborted.is_terminal());
        assert!(!LoopState::Generating.is_terminal());
        assert!(!LoopState::Retrying.is_terminal());
    }
}
