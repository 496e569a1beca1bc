//! Screen flows — a validated form wired to a request controller.
//!
//! Flows hold no rendering. A host draws from their state (form values,
//! errors, hints, loading) and forwards user actions; settlement side
//! effects run in `next_event`, keyed on the controller's settlements.

pub mod phase;
pub mod prompt;
pub mod register;

pub use phase::SubmissionPhase;
pub use prompt::{PromptEvent, PromptFlow, SimplifyResponse};
pub use register::{RegisterResponse, RegistrationEvent, RegistrationFlow, registration_schema};

use uuid::Uuid;

/// Result of a submit action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Request dispatched; watch `next_event` for the result.
    Submitted { request_id: Uuid },
    /// Form invalid; nothing was sent.
    Invalid,
    /// A request is already in flight; nothing was sent.
    InFlight,
    /// Screen unmounted or already finished.
    Closed,
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }
}

/// User-visible error banner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// The server or network failed; the user can retry.
    #[error("{0}")]
    Request(String),
    /// The server succeeded but the credential couldn't be stored locally.
    #[error("{0}")]
    Persistence(String),
}

impl FlowError {
    pub fn message(&self) -> &str {
        match self {
            Self::Request(m) | Self::Persistence(m) => m,
        }
    }
}
