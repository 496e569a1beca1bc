//! Form state and the live-validated form wrapper.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::trace;

use super::schema::{Evaluation, LiveHint, Schema};

/// Current values of a form, keyed by field name.
///
/// Fields that were never entered read as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    values: BTreeMap<String, String>,
    touched: BTreeSet<String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field, or `""` if it was never set.
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// Whether the field has been set at least once.
    pub fn is_set(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    pub fn any_touched(&self) -> bool {
        !self.touched.is_empty()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        self.touched.insert(field.clone());
        self.values.insert(field, value.into());
    }

    pub fn touch(&mut self, field: impl Into<String>) {
        self.touched.insert(field.into());
    }

    /// JSON object of every set field, for request bodies.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// A form bound to a schema. Every value change re-evaluates the schema
/// synchronously, so [`Form::evaluation`] is never stale.
#[derive(Debug, Clone)]
pub struct Form {
    schema: Arc<Schema>,
    state: FormState,
    evaluation: Evaluation,
}

impl Form {
    /// Mount a form with every field empty.
    pub fn new(schema: Arc<Schema>) -> Self {
        let state = FormState::new();
        let evaluation = schema.evaluate(&state);
        Self {
            schema,
            state,
            evaluation,
        }
    }

    /// The controlled update path: set a field and re-validate.
    pub fn set_value(&mut self, field: &str, value: impl Into<String>) -> &Evaluation {
        self.state.set(field, value);
        self.evaluation = self.schema.evaluate(&self.state);
        trace!(
            field = field,
            overall_valid = self.evaluation.overall_valid,
            "Form re-validated"
        );
        &self.evaluation
    }

    /// Mark a field as touched (e.g. on blur) without changing its value.
    pub fn touch(&mut self, field: &str) {
        self.state.touch(field);
    }

    pub fn value(&self, field: &str) -> &str {
        self.state.get(field)
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    pub fn is_valid(&self) -> bool {
        self.evaluation.overall_valid
    }

    /// Error to display under a field. Untouched fields show nothing even
    /// when invalid.
    pub fn visible_error(&self, field: &str) -> Option<&str> {
        if !self.state.is_touched(field) {
            return None;
        }
        self.evaluation.message(field)
    }

    /// Live checklist for a field, shown regardless of touched state.
    pub fn hints(&self, field: &str) -> Vec<LiveHint> {
        self.schema.hints(field, &self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{FieldSchema, Predicate, Rule};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new().field(
                FieldSchema::new("email").rule(Rule::new(Predicate::Email).hint("Valid email")),
            ),
        )
    }

    #[test]
    fn mounts_empty_and_invalid() {
        let form = Form::new(schema());
        assert_eq!(form.value("email"), "");
        assert!(!form.state().is_set("email"));
        assert!(!form.is_valid());
        assert_eq!(form.visible_error("email"), None);
    }

    #[test]
    fn set_value_revalidates() {
        let mut form = Form::new(schema());
        let eval = form.set_value("email", "a@b");
        assert!(!eval.overall_valid);
        assert_eq!(form.visible_error("email"), Some("Invalid email"));

        form.set_value("email", "a@b.com");
        assert!(form.is_valid());
        assert_eq!(form.visible_error("email"), None);
    }

    #[test]
    fn touch_reveals_error_without_value() {
        let mut form = Form::new(schema());
        form.touch("email");
        assert_eq!(form.visible_error("email"), Some("Invalid email"));
    }

    #[test]
    fn hints_shown_before_touch() {
        let form = Form::new(schema());
        let hints = form.hints("email");
        assert_eq!(hints.len(), 1);
        assert!(!hints[0].satisfied);
    }

    #[test]
    fn to_json_includes_only_set_fields() {
        let mut state = FormState::new();
        state.set("email", "a@b.com");
        assert_eq!(state.to_json(), serde_json::json!({ "email": "a@b.com" }));
    }
}
