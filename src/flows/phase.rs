//! Submission state machine shared by form screens.

use serde::{Deserialize, Serialize};

/// Where a form submission stands.
///
/// `Idle → Validating ⇄ Ready → Submitting → Succeeded | Failed`. A failed
/// attempt returns to editing or can be resubmitted as-is. `Submitting` is
/// never re-entered from itself, which is what stops double taps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Validating,
    Ready,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionPhase {
    pub fn can_transition_to(&self, target: SubmissionPhase) -> bool {
        use SubmissionPhase::*;
        matches!(
            (self, target),
            (Idle, Validating)
                | (Idle, Ready)
                | (Validating, Ready)
                | (Ready, Validating)
                | (Ready, Submitting)
                | (Submitting, Succeeded)
                | (Submitting, Failed)
                | (Failed, Validating)
                | (Failed, Ready)
                | (Failed, Submitting)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Whether the user may still edit fields and see them re-validated into
    /// a new phase.
    pub fn is_editable(&self) -> bool {
        !matches!(self, Self::Submitting | Self::Succeeded)
    }
}

impl std::fmt::Display for SubmissionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Ready => "ready",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use SubmissionPhase::*;
        let transitions = [
            (Idle, Validating),
            (Validating, Ready),
            (Ready, Submitting),
            (Submitting, Failed),
            (Failed, Submitting),
            (Submitting, Succeeded),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use SubmissionPhase::*;
        // Double submit
        assert!(!Submitting.can_transition_to(Submitting));
        // Submit without passing validation
        assert!(!Idle.can_transition_to(Submitting));
        assert!(!Validating.can_transition_to(Submitting));
        // Terminal
        assert!(!Succeeded.can_transition_to(Ready));
        assert!(!Succeeded.can_transition_to(Submitting));
        // Edits while in flight don't move the phase
        assert!(!Submitting.can_transition_to(Validating));
    }

    #[test]
    fn terminal_and_editable() {
        use SubmissionPhase::*;
        assert!(Succeeded.is_terminal());
        assert!(!Failed.is_terminal());
        assert!(Failed.is_editable());
        assert!(!Submitting.is_editable());
    }

    #[test]
    fn display_matches_serde() {
        use SubmissionPhase::*;
        for phase in [Idle, Validating, Ready, Submitting, Succeeded, Failed] {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(format!("\"{phase}\""), json, "mismatch for {phase:?}");
        }
    }
}
