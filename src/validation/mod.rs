//! Schema-driven form validation.
//!
//! A [`Schema`] lists per-field [`Rule`]s and cross-field equality rules.
//! Evaluating it against a [`FormState`] is pure and synchronous; a [`Form`]
//! re-runs it on every value change. Live checklist hints are derived from
//! the same [`Predicate`]s that gate submission.

pub mod form;
pub mod predicates;
pub mod schema;
pub mod spec;

pub use form::{Form, FormState};
pub use predicates::Predicate;
pub use schema::{CrossFieldRule, Evaluation, FieldResult, FieldSchema, LiveHint, Rule, Schema};
pub use spec::{CheckSpec, CrossFieldSpec, FieldSpec, RuleSpec, SchemaSpec};
