//! Per-request completion state machine.

use tracing::debug;

/// States a single completion request moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    /// Input screening has not finished.
    Screening,
    /// Waiting on the provider for the given attempt.
    Calling(u32),
    /// Decoding and checking the provider's answer for the given attempt.
    Validating(u32),
    /// The given attempt failed and another will follow.
    Retrying(u32),
    /// An attempt produced an accepted result.
    Succeeded,
    /// Every attempt failed.
    Exhausted,
    /// The certified fallback was returned.
    Fallback,
    /// The caller cancelled the request.
    Cancelled,
}

impl CompletionState {
    /// Returns `true` when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Fallback | Self::Cancelled)
    }

    /// Returns `true` if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn permits(self, next: Self) -> bool {
        match (self, next) {
            (Self::Screening, Self::Calling(1))
            | (Self::Calling(_), Self::Exhausted)
            | (Self::Validating(_), Self::Succeeded | Self::Exhausted)
            | (Self::Screening | Self::Exhausted, Self::Fallback)
            | (Self::Screening | Self::Calling(_) | Self::Retrying(_), Self::Cancelled) => true,
            (Self::Calling(a), Self::Validating(b) | Self::Retrying(b))
            | (Self::Validating(a), Self::Retrying(b)) => a == b,
            (Self::Retrying(a), Self::Calling(b)) => b > a && b - a == 1,
            _ => false,
        }
    }
}

/// Tracks and traces the state of one request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StateTracker {
    state: CompletionState,
}

impl StateTracker {
    pub(crate) const fn new() -> Self {
        Self {
            state: CompletionState::Screening,
        }
    }

    pub(crate) fn enter(&mut self, next: CompletionState) {
        debug_assert!(
            self.state.permits(next),
            "illegal completion transition {:?} -> {next:?}",
            self.state
        );
        debug!(from = ?self.state, to = ?next, "completion state transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_on_first_attempt() {
        let mut tracker = StateTracker::new();
        tracker.enter(CompletionState::Calling(1));
        tracker.enter(CompletionState::Validating(1));
        tracker.enter(CompletionState::Succeeded);
        assert!(tracker.state.is_terminal());
    }

    #[test]
    fn retry_then_exhaust() {
        let mut tracker = StateTracker::new();
        tracker.enter(CompletionState::Calling(1));
        tracker.enter(CompletionState::Retrying(1));
        tracker.enter(CompletionState::Calling(2));
        tracker.enter(CompletionState::Validating(2));
        tracker.enter(CompletionState::Exhausted);
        assert!(!tracker.state.is_terminal());
        tracker.enter(CompletionState::Fallback);
        assert_eq!(tracker.state, CompletionState::Fallback);
    }

    #[test]
    fn attempts_must_advance_by_one() {
        assert!(CompletionState::Retrying(1).permits(CompletionState::Calling(2)));
        assert!(!CompletionState::Retrying(1).permits(CompletionState::Calling(3)));
        assert!(!CompletionState::Calling(2).permits(CompletionState::Validating(1)));
    }

    #[test]
    fn terminal_states_are_final() {
        for state in [
            CompletionState::Succeeded,
            CompletionState::Fallback,
            CompletionState::Cancelled,
        ] {
            assert!(!state.permits(CompletionState::Calling(1)));
            assert!(!state.permits(CompletionState::Cancelled));
        }
    }

    #[test]
    fn refusal_skips_the_provider() {
        assert!(CompletionState::Screening.permits(CompletionState::Fallback));
        assert!(!CompletionState::Calling(1).permits(CompletionState::Fallback));
    }
}
