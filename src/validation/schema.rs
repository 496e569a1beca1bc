//! Field schemas and their evaluation.

use std::collections::BTreeMap;

use serde::Serialize;

use super::form::FormState;
use super::predicates::{Predicate, values_equal};

/// One constraint on a single field.
#[derive(Debug, Clone)]
pub struct Rule {
    pub predicate: Predicate,
    pub message: String,
    /// Label shown in the live checklist, if this rule is part of it.
    pub hint: Option<String>,
}

impl Rule {
    pub fn new(predicate: Predicate) -> Self {
        let message = predicate.default_message();
        Self {
            predicate,
            message,
            hint: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn hint(mut self, label: impl Into<String>) -> Self {
        self.hint = Some(label.into());
        self
    }
}

/// Ordered constraints for one named field.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Equality between two fields. Failures are reported on `field`, never on
/// `other`.
#[derive(Debug, Clone)]
pub struct CrossFieldRule {
    pub field: String,
    pub other: String,
    pub message: String,
    pub hint: Option<String>,
}

impl CrossFieldRule {
    fn passes(&self, values: &FormState) -> bool {
        values_equal(values.get(&self.field), values.get(&self.other))
    }
}

/// Outcome for a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldResult {
    pub valid: bool,
    /// Every failing constraint's message, in declaration order.
    pub messages: Vec<String>,
}

impl FieldResult {
    /// First failing message, which is what a form normally displays.
    pub fn message(&self) -> Option<&str> {
        self.messages.first().map(String::as_str)
    }
}

/// Result of evaluating a schema against a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub fields: BTreeMap<String, FieldResult>,
    pub overall_valid: bool,
}

impl Evaluation {
    pub fn field(&self, name: &str) -> Option<&FieldResult> {
        self.fields.get(name)
    }

    /// Fields with no constraints are trivially valid.
    pub fn is_field_valid(&self, name: &str) -> bool {
        self.fields.get(name).is_none_or(|r| r.valid)
    }

    pub fn message(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldResult::message)
    }

    /// Names of all fields that currently fail.
    pub fn invalid_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, r)| !r.valid)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// A live checklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveHint {
    pub label: String,
    pub satisfied: bool,
}

/// Declarative set of field and cross-field constraints.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSchema>,
    cross_field: Vec<CrossFieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Require `field` to equal `other`, reporting `message` on `field`.
    pub fn must_match(
        mut self,
        field: impl Into<String>,
        other: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.cross_field.push(CrossFieldRule {
            field: field.into(),
            other: other.into(),
            message: message.into(),
            hint: None,
        });
        self
    }

    pub(crate) fn cross_rule(mut self, rule: CrossFieldRule) -> Self {
        self.cross_field.push(rule);
        self
    }

    /// Names of every field the schema constrains, in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
        for rule in &self.cross_field {
            if !names.contains(&rule.field.as_str()) {
                names.push(rule.field.as_str());
            }
        }
        names
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
            || self.cross_field.iter().any(|r| r.field == name)
    }

    /// Check one field, including cross-field rules that report on it.
    pub fn validate_field(&self, name: &str, values: &FormState) -> FieldResult {
        let value = values.get(name);
        let mut messages: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.name == name)
            .flat_map(|f| f.rules.iter())
            .filter(|rule| !rule.predicate.test(value))
            .map(|rule| rule.message.clone())
            .collect();

        messages.extend(
            self.cross_field
                .iter()
                .filter(|rule| rule.field == name && !rule.passes(values))
                .map(|rule| rule.message.clone()),
        );

        FieldResult {
            valid: messages.is_empty(),
            messages,
        }
    }

    /// Evaluate every field. Overall validity requires every rule to pass.
    pub fn evaluate(&self, values: &FormState) -> Evaluation {
        let fields: BTreeMap<String, FieldResult> = self
            .field_names()
            .into_iter()
            .map(|name| (name.to_string(), self.validate_field(name, values)))
            .collect();
        let overall_valid = fields.values().all(|r| r.valid);
        Evaluation {
            fields,
            overall_valid,
        }
    }

    /// Live checklist for a field, computed from the same predicates the
    /// schema gates submission on. Only rules with a hint label appear.
    pub fn hints(&self, name: &str, values: &FormState) -> Vec<LiveHint> {
        let value = values.get(name);
        let field_hints = self
            .fields
            .iter()
            .filter(|f| f.name == name)
            .flat_map(|f| f.rules.iter())
            .filter_map(|rule| {
                rule.hint.as_ref().map(|label| LiveHint {
                    label: label.clone(),
                    satisfied: rule.predicate.test(value),
                })
            });

        let cross_hints = self
            .cross_field
            .iter()
            .filter(|rule| rule.field == name)
            .filter_map(|rule| {
                rule.hint.as_ref().map(|label| LiveHint {
                    label: label.clone(),
                    satisfied: rule.passes(values),
                })
            });

        field_hints.chain(cross_hints).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password_schema() -> Schema {
        Schema::new()
            .field(
                FieldSchema::new("password")
                    .rule(Rule::new(Predicate::MinLength(8)).hint("At least 8 characters"))
                    .rule(
                        Rule::new(Predicate::ContainsDigit)
                            .message("Password must contain a number")
                            .hint("At least one number"),
                    ),
            )
            .field(FieldSchema::new("confirm").rule(Rule::new(Predicate::MinLength(8))))
            .must_match("confirm", "password", "Passwords don't match")
    }

    fn form(pairs: &[(&str, &str)]) -> FormState {
        let mut state = FormState::new();
        for (k, v) in pairs {
            state.set(*k, *v);
        }
        state
    }

    #[test]
    fn reports_every_failing_rule() {
        let eval = password_schema().evaluate(&form(&[("password", "abc")]));
        let pw = eval.field("password").unwrap();
        assert!(!pw.valid);
        assert_eq!(
            pw.messages,
            vec![
                "Must contain at least 8 character(s)".to_string(),
                "Password must contain a number".to_string(),
            ]
        );
        assert_eq!(eval.message("password"), Some("Must contain at least 8 character(s)"));
        assert!(!eval.overall_valid);
    }

    #[test]
    fn mismatch_reported_on_dependent_field_only() {
        let eval = password_schema().evaluate(&form(&[
            ("password", "abcdefg1"),
            ("confirm", "abcdefg2"),
        ]));
        assert!(eval.is_field_valid("password"));
        assert_eq!(
            eval.field("confirm").unwrap().messages,
            vec!["Passwords don't match".to_string()]
        );
        assert_eq!(eval.invalid_fields(), vec!["confirm"]);
    }

    #[test]
    fn all_pass_is_overall_valid() {
        let eval = password_schema().evaluate(&form(&[
            ("password", "abcdefg1"),
            ("confirm", "abcdefg1"),
        ]));
        assert!(eval.overall_valid);
        assert!(eval.invalid_fields().is_empty());
    }

    #[test]
    fn missing_values_are_invalid_not_errors() {
        let eval = password_schema().evaluate(&FormState::new());
        assert!(!eval.overall_valid);
        assert!(!eval.is_field_valid("password"));
        // Both empty, so they match; only the length rule fails on confirm.
        assert_eq!(eval.field("confirm").unwrap().messages.len(), 1);
    }

    #[test]
    fn hints_follow_rule_predicates() {
        let schema = password_schema();
        let hints = schema.hints("password", &form(&[("password", "abcdefgh")]));
        assert_eq!(
            hints,
            vec![
                LiveHint {
                    label: "At least 8 characters".into(),
                    satisfied: true
                },
                LiveHint {
                    label: "At least one number".into(),
                    satisfied: false
                },
            ]
        );
        assert!(schema.hints("confirm", &FormState::new()).is_empty());
    }

    #[test]
    fn unconstrained_field_is_valid() {
        let eval = password_schema().evaluate(&FormState::new());
        assert!(eval.is_field_valid("nickname"));
        assert!(eval.field("nickname").is_none());
    }

    #[test]
    fn empty_schema_is_valid() {
        assert!(Schema::new().evaluate(&FormState::new()).overall_valid);
    }
}
