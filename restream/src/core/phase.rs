//! Lifecycle phases of a retry link.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which producer a connection was opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// The original producer.
    Upstream,
    /// The one-shot recovery producer.
    Recovery,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream => write!(f, "upstream"),
            Self::Recovery => write!(f, "recovery"),
        }
    }
}

/// The observable state of a retry link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPhase {
    /// No items have been requested yet.
    #[default]
    Unconnected,
    /// Waiting for the original producer to hand over a connection.
    ConnectingUpstream,
    /// Items are flowing from the original producer.
    ActiveUpstream,
    /// Waiting for the recovery producer to hand over a connection.
    ConnectingRecovery,
    /// Items are flowing from the recovery producer.
    ActiveRecovery,
    /// The original producer finished and the consumer was told.
    Completed,
    /// A failure was forwarded to the consumer.
    Failed,
    /// The consumer cancelled the link.
    Cancelled,
}

impl LinkPhase {
    /// Returns true once nothing more will be delivered.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns the connecting phase for a source.
    #[must_use]
    pub const fn connecting(source: Source) -> Self {
        match source {
            Source::Upstream => Self::ConnectingUpstream,
            Source::Recovery => Self::ConnectingRecovery,
        }
    }

    /// Returns the active phase for a source.
    #[must_use]
    pub const fn active(source: Source) -> Self {
        match source {
            Source::Upstream => Self::ActiveUpstream,
            Source::Recovery => Self::ActiveRecovery,
        }
    }

    /// Phases reachable from `self`.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Unconnected => &[Self::ConnectingUpstream, Self::Cancelled],
            Self::ConnectingUpstream => &[
                Self::ActiveUpstream,
                Self::Completed,
                Self::Failed,
                Self::Cancelled,
            ],
            Self::ActiveUpstream => &[
                Self::ConnectingUpstream,
                Self::ConnectingRecovery,
                Self::Completed,
                Self::Failed,
                Self::Cancelled,
            ],
            Self::ConnectingRecovery => &[
                Self::ActiveRecovery,
                Self::ConnectingUpstream,
                Self::Failed,
                Self::Cancelled,
            ],
            Self::ActiveRecovery => &[Self::ConnectingUpstream, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => &[],
        }
    }

    /// Returns true if moving to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconnected => "unconnected",
            Self::ConnectingUpstream => "connecting_upstream",
            Self::ActiveUpstream => "active_upstream",
            Self::ConnectingRecovery => "connecting_recovery",
            Self::ActiveRecovery => "active_recovery",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_phase() {
        assert_eq!(LinkPhase::default(), LinkPhase::Unconnected);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(LinkPhase::Completed.is_terminal());
        assert!(LinkPhase::Failed.is_terminal());
        assert!(LinkPhase::Cancelled.is_terminal());
        assert!(!LinkPhase::ActiveRecovery.is_terminal());
    }

    #[test]
    fn test_terminal_phases_have_no_exits() {
        for phase in [LinkPhase::Completed, LinkPhase::Failed, LinkPhase::Cancelled] {
            assert!(phase.allowed_transitions().is_empty());
        }
    }

    #[test]
    fn test_retry_cycle_is_allowed() {
        use LinkPhase::*;
        let cycle = [
            Unconnected,
            ConnectingUpstream,
            ActiveUpstream,
            ConnectingRecovery,
            ActiveRecovery,
            ConnectingUpstream,
            ActiveUpstream,
            Completed,
        ];
        for pair in cycle.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_recovery_cannot_complete_the_link() {
        assert!(!LinkPhase::ActiveRecovery.can_transition_to(LinkPhase::Completed));
        assert!(!LinkPhase::Unconnected.can_transition_to(LinkPhase::ActiveUpstream));
    }

    #[test]
    fn test_connecting_and_active_for_source() {
        assert_eq!(LinkPhase::connecting(Source::Recovery), LinkPhase::ConnectingRecovery);
        assert_eq!(LinkPhase::active(Source::Upstream), LinkPhase::ActiveUpstream);
    }

    #[test]
    fn test_display() {
        assert_eq!(LinkPhase::ActiveRecovery.to_string(), "active_recovery");
        assert_eq!(Source::Upstream.to_string(), "upstream");
    }
}
