//! Lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Idle → Running:     listener bound
//! Idle → Stopped:     bind failed, or stop requested before bind
//! Running → Stopping: first shutdown request
//! Stopping → Stopped: drain finished or deadline elapsed
//! ```
//!
//! `Stopped` is terminal.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Created, not yet accepting.
    Idle,
    /// Listener bound and accepting connections.
    Running,
    /// No longer accepting; in-flight requests are draining.
    Stopping,
    /// Terminal.
    Stopped,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Idle, Running) | (Idle, Stopped) | (Running, Stopping) | (Stopping, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Stopped
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleState::*;
    use super::*;

    const ALL: [LifecycleState; 4] = [Idle, Running, Stopping, Stopped];

    #[test]
    fn allowed_transitions() {
        assert!(Idle.can_transition_to(Running));
        assert!(Idle.can_transition_to(Stopped));
        assert!(Running.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Stopped));
    }

    #[test]
    fn no_shortcuts_or_reversals() {
        assert!(!Idle.can_transition_to(Stopping));
        assert!(!Running.can_transition_to(Stopped));
        assert!(!Running.can_transition_to(Idle));
        assert!(!Stopping.can_transition_to(Running));
        for state in ALL {
            assert!(!state.can_transition_to(state));
        }
    }

    #[test]
    fn stopped_is_terminal() {
        assert!(Stopped.is_terminal());
        for next in ALL {
            assert!(!Stopped.can_transition_to(next));
        }
    }
}
