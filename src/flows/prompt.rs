//! AI prompt intake — the pain complaint step.
//!
//! The user types a free-text complaint, can ask the server to simplify it
//! (`POST /api/simplify`), and continues to the overview once the message is
//! non-empty. A simplify result replaces the message when it settles, unless
//! the user edited the message while the request was in flight.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::navigation::Navigator;
use crate::request::{
    ApiRequest, Dispatch, RequestController, Settlement, SettlementWatcher, Transport,
};
use crate::validation::{FieldSchema, Form, Predicate, Rule, Schema};

use super::SubmitOutcome;

pub const SIMPLIFY_URI: &str = "/api/simplify";
pub const OVERVIEW_ROUTE: &str = "/ask-ai/(tabs)/overview";
pub const MESSAGE_FIELD: &str = "message";

/// Position of this screen in the ask-AI wizard's progress bar.
pub const PROGRESS_STEP: usize = 2;
pub const PROGRESS_STEPS: usize = 3;

pub fn prompt_schema() -> Schema {
    Schema::new().field(
        FieldSchema::new(MESSAGE_FIELD)
            .rule(Rule::new(Predicate::Required).message("Add the pain complaints you feel.")),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedComplaint {
    pub complaint: String,
    #[serde(default)]
    pub simplified_message: String,
}

/// `/api/simplify` body.
#[derive(Debug, Clone, Deserialize)]
pub struct SimplifyResponse {
    #[serde(default)]
    pub message: String,
    pub data: SimplifiedComplaint,
    #[serde(default)]
    pub errors: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    /// The message field now holds the returned complaint.
    Simplified { complaint: String },
    /// The message changed after the request was sent; it was left as is.
    Superseded { complaint: String },
    RequestFailed { message: String },
}

/// Headless prompt screen.
pub struct PromptFlow {
    form: Form,
    controller: RequestController<SimplifyResponse>,
    settlements: SettlementWatcher<SimplifyResponse>,
    /// Message text sent with the in-flight simplify request.
    sent: Option<String>,
    navigator: Arc<dyn Navigator>,
    error: Option<String>,
    mounted: bool,
}

impl PromptFlow {
    pub fn mount(transport: Arc<dyn Transport>, navigator: Arc<dyn Navigator>) -> Self {
        let controller = RequestController::new(transport);
        let settlements = controller.watch();
        Self {
            form: Form::new(Arc::new(prompt_schema())),
            controller,
            settlements,
            sent: None,
            navigator,
            error: None,
            mounted: true,
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.form.set_value(MESSAGE_FIELD, message);
    }

    pub fn message(&self) -> &str {
        self.form.value(MESSAGE_FIELD)
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn can_simplify(&self) -> bool {
        self.mounted && self.form.is_valid() && !self.controller.is_loading()
    }

    pub fn can_continue(&self) -> bool {
        self.mounted && self.form.is_valid()
    }

    /// Ask the server to simplify the current message.
    pub fn simplify(&mut self) -> SubmitOutcome {
        if !self.mounted {
            return SubmitOutcome::Closed;
        }
        if !self.form.is_valid() {
            return SubmitOutcome::Invalid;
        }
        let message = self.message().to_string();
        let request = ApiRequest::post(SIMPLIFY_URI, serde_json::json!({ "message": message }));
        match self.controller.fetch_data(request) {
            Dispatch::Started { request_id, .. } => {
                self.error = None;
                self.sent = Some(message);
                SubmitOutcome::Submitted { request_id }
            }
            Dispatch::Rejected(reason) => {
                debug!(?reason, "Simplify request not started");
                SubmitOutcome::InFlight
            }
        }
    }

    /// Wait for the next simplify settlement and apply it.
    pub async fn next_event(&mut self) -> Option<PromptEvent> {
        if !self.mounted {
            return None;
        }
        match self.settlements.next_settlement().await? {
            Settlement::Success(response) => {
                let complaint = response.data.complaint.clone();
                let sent = self.sent.take();
                if sent.as_deref() != Some(self.message()) {
                    info!("Message edited during simplify, keeping user text");
                    return Some(PromptEvent::Superseded { complaint });
                }
                info!(chars = complaint.chars().count(), "Complaint simplified");
                self.form.set_value(MESSAGE_FIELD, complaint.clone());
                Some(PromptEvent::Simplified { complaint })
            }
            Settlement::Failure(message) => {
                self.sent = None;
                warn!(error = %message, "Simplify failed");
                self.error = Some(message.clone());
                Some(PromptEvent::RequestFailed { message })
            }
        }
    }

    /// Move on to the overview tab. Returns `false` (and does nothing) while
    /// the message is empty.
    pub fn continue_to_overview(&self) -> bool {
        if !self.can_continue() {
            return false;
        }
        self.navigator.replace(OVERVIEW_ROUTE);
        true
    }

    pub fn back(&self) {
        self.navigator.back();
    }

    pub fn unmount(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.controller.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_shape() {
        let resp: SimplifyResponse = serde_json::from_value(serde_json::json!({
            "message": "ok",
            "data": { "complaint": "Headache", "simplified_message": "My head hurts" },
            "errors": null
        }))
        .unwrap();
        assert_eq!(resp.data.complaint, "Headache");
        assert_eq!(resp.data.simplified_message, "My head hurts");
        assert!(resp.errors.is_none());
    }

    #[test]
    fn blank_message_is_invalid() {
        let schema = prompt_schema();
        let mut state = crate::validation::FormState::new();
        assert!(!schema.evaluate(&state).overall_valid);
        state.set(MESSAGE_FIELD, "  ");
        assert!(!schema.evaluate(&state).overall_valid);
        state.set(MESSAGE_FIELD, "my back hurts");
        assert!(schema.evaluate(&state).overall_valid);
    }
}
