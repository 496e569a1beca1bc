//! Account registration.
//!
//! Email + password + confirmation, live password checklist, `POST
//! /auth/register`, then the token is written to secure storage and only
//! then does the flow navigate home.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use tracing::{debug, error, info, warn};

use crate::navigation::Navigator;
use crate::request::{
    ApiRequest, Dispatch, RequestController, RequestSnapshot, Settlement, SettlementWatcher,
    Transport,
};
use crate::storage::{Credential, CredentialVault, Identity};
use crate::validation::{Evaluation, FieldSchema, Form, LiveHint, Predicate, Rule, Schema};

use super::{FlowError, SubmissionPhase, SubmitOutcome};

pub const REGISTER_URI: &str = "/auth/register";
pub const HOME_ROUTE: &str = "/";

/// Shown when the account exists remotely but the session couldn't be saved.
pub const PERSISTENCE_FAILED_MESSAGE: &str =
    "Your account was created, but we couldn't save your session on this device. Please sign in.";

pub mod fields {
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
    pub const PASSWORD_CONFIRMATION: &str = "password_confirmation";
}

fn password_rules(field: &str, with_hints: bool) -> FieldSchema {
    let hint = |rule: Rule, label: &str| if with_hints { rule.hint(label) } else { rule };
    FieldSchema::new(field)
        .rule(hint(
            Rule::new(Predicate::MinLength(8)),
            "At least 8 characters",
        ))
        .rule(hint(
            Rule::new(Predicate::ContainsDigit).message("Password must contain a number"),
            "At least one number",
        ))
        .rule(hint(
            Rule::new(Predicate::ContainsUppercase)
                .message("Password must contain an uppercase letter"),
            "At least one uppercase letter",
        ))
}

/// Schema for the registration form.
pub fn registration_schema() -> Schema {
    Schema::new()
        .field(FieldSchema::new(fields::EMAIL).rule(Rule::new(Predicate::Email)))
        .field(password_rules(fields::PASSWORD, true))
        .field(password_rules(fields::PASSWORD_CONFIRMATION, false))
        .must_match(
            fields::PASSWORD_CONFIRMATION,
            fields::PASSWORD,
            "Passwords don't match",
        )
}

fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Successful `/auth/register` payload.
///
/// The server may send it bare or wrapped in the `{message, data, errors}`
/// envelope the other endpoints use; both decode to the same value.
#[derive(Debug)]
pub struct RegisterResponse {
    pub id: u64,
    pub email: String,
    pub token: SecretString,
}

#[derive(Deserialize)]
struct RegisterPayload {
    id: u64,
    email: String,
    #[serde(deserialize_with = "secret_string")]
    token: SecretString,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegisterBody {
    Enveloped { data: RegisterPayload },
    Bare(RegisterPayload),
}

impl<'de> Deserialize<'de> for RegisterResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let payload = match RegisterBody::deserialize(deserializer)? {
            RegisterBody::Enveloped { data } => data,
            RegisterBody::Bare(payload) => payload,
        };
        Ok(Self {
            id: payload.id,
            email: payload.email,
            token: payload.token,
        })
    }
}

impl RegisterResponse {
    pub fn credential(&self) -> Credential {
        Credential::new(
            SecretString::from(self.token.expose_secret().to_owned()),
            Identity {
                id: self.id,
                email: self.email.clone(),
            },
        )
    }
}

/// What a settlement led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationEvent {
    /// Token stored and navigated home.
    Registered { identity: Identity },
    RequestFailed { message: String },
    /// Account created remotely, session not stored locally.
    PersistenceFailed { message: String },
}

/// Headless registration screen.
pub struct RegistrationFlow {
    form: Form,
    controller: RequestController<RegisterResponse>,
    settlements: SettlementWatcher<RegisterResponse>,
    /// Successful response whose credential hasn't been written yet.
    pending: Option<Arc<RegisterResponse>>,
    vault: Arc<CredentialVault>,
    navigator: Arc<dyn Navigator>,
    phase: SubmissionPhase,
    error: Option<FlowError>,
    mounted: bool,
}

impl RegistrationFlow {
    /// Mount the screen with an empty form.
    pub fn mount(
        transport: Arc<dyn Transport>,
        vault: Arc<CredentialVault>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let controller = RequestController::new(transport);
        let settlements = controller.watch();
        Self {
            form: Form::new(Arc::new(registration_schema())),
            controller,
            settlements,
            pending: None,
            vault,
            navigator,
            phase: SubmissionPhase::Idle,
            error: None,
            mounted: true,
        }
    }

    /// Update a field and re-validate.
    pub fn set_field(&mut self, field: &str, value: impl Into<String>) -> &Evaluation {
        self.form.set_value(field, value);
        self.sync_phase();
        self.form.evaluation()
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    /// Password checklist, live while typing.
    pub fn password_hints(&self) -> Vec<LiveHint> {
        self.form.hints(fields::PASSWORD)
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.mounted
            && self.form.is_valid()
            && !self.controller.is_loading()
            && self.phase.can_transition_to(SubmissionPhase::Submitting)
    }

    /// Error banner contents, if any.
    pub fn error(&self) -> Option<&FlowError> {
        self.error.as_ref()
    }

    pub fn request_state(&self) -> RequestSnapshot<RegisterResponse> {
        self.controller.snapshot()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Submit the form. A no-op unless the form is valid and nothing is in
    /// flight; the outcome arrives through [`next_event`](Self::next_event).
    pub fn submit(&mut self) -> SubmitOutcome {
        if !self.mounted || self.phase.is_terminal() {
            return SubmitOutcome::Closed;
        }
        if self.phase == SubmissionPhase::Submitting || self.controller.is_loading() {
            debug!("Registration submit ignored, request in flight");
            return SubmitOutcome::InFlight;
        }
        if !self.form.is_valid() {
            let names: Vec<String> = self
                .form
                .schema()
                .field_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            for name in &names {
                self.form.touch(name);
            }
            self.sync_phase();
            debug!(invalid = ?self.form.evaluation().invalid_fields(), "Registration submit blocked by validation");
            return SubmitOutcome::Invalid;
        }

        let request = ApiRequest::post(REGISTER_URI, self.form.state().to_json());
        match self.controller.fetch_data(request) {
            Dispatch::Started { request_id, .. } => {
                self.error = None;
                self.transition(SubmissionPhase::Submitting);
                SubmitOutcome::Submitted { request_id }
            }
            Dispatch::Rejected(reason) => {
                warn!(?reason, "Registration request rejected by controller");
                SubmitOutcome::InFlight
            }
        }
    }

    /// Wait for the next settlement and run its side effects: on success the
    /// credential is persisted and only then does the flow navigate home.
    ///
    /// Cancel safe. If the future is dropped while the credential is being
    /// written, the next call retries the write instead of waiting for a new
    /// settlement.
    ///
    /// Returns `None` once the screen is unmounted.
    pub async fn next_event(&mut self) -> Option<RegistrationEvent> {
        if !self.mounted {
            return None;
        }
        let response = match self.pending.clone() {
            Some(response) => {
                debug!("Resuming interrupted credential write");
                response
            }
            None => match self.settlements.next_settlement().await? {
                Settlement::Success(response) => {
                    self.pending = Some(Arc::clone(&response));
                    response
                }
                Settlement::Failure(message) => {
                    warn!(error = %message, "Registration failed");
                    self.error = Some(FlowError::Request(message.clone()));
                    self.transition(SubmissionPhase::Failed);
                    return Some(RegistrationEvent::RequestFailed { message });
                }
            },
        };

        let credential = response.credential();
        let persisted = self.vault.persist(&credential).await;
        self.pending = None;
        match persisted {
            Ok(()) => {
                self.transition(SubmissionPhase::Succeeded);
                self.navigator.push(HOME_ROUTE);
                info!(user_id = credential.identity.id, "Registration complete");
                Some(RegistrationEvent::Registered {
                    identity: credential.identity,
                })
            }
            Err(e) => {
                error!(user_id = credential.identity.id, error = %e, "Registered but session not stored");
                self.error = Some(FlowError::Persistence(PERSISTENCE_FAILED_MESSAGE.into()));
                self.transition(SubmissionPhase::Failed);
                Some(RegistrationEvent::PersistenceFailed {
                    message: PERSISTENCE_FAILED_MESSAGE.into(),
                })
            }
        }
    }

    pub fn back(&self) {
        self.navigator.back();
    }

    /// Tear the screen down. Any in-flight request is abandoned and no side
    /// effect will run for it.
    pub fn unmount(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.pending = None;
            self.controller.abandon();
            debug!("Registration screen unmounted");
        }
    }

    fn sync_phase(&mut self) {
        if !self.phase.is_editable() {
            return;
        }
        let target = if self.form.is_valid() {
            SubmissionPhase::Ready
        } else if self.form.state().any_touched() {
            SubmissionPhase::Validating
        } else {
            SubmissionPhase::Idle
        };
        self.transition(target);
    }

    fn transition(&mut self, target: SubmissionPhase) {
        if self.phase == target {
            return;
        }
        if self.phase.can_transition_to(target) {
            debug!(from = %self.phase, to = %target, "Registration phase change");
            self.phase = target;
        } else {
            warn!(from = %self.phase, to = %target, "Ignoring invalid registration phase change");
        }
    }
}
