//! Declarative schema descriptions.
//!
//! A `SchemaSpec` is plain data (JSON-friendly) that compiles into a
//! [`Schema`]. Patterns are compiled once at this point; a bad pattern or a
//! cross-field rule pointing at an undeclared field is rejected here rather
//! than at evaluation time.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

use super::predicates::Predicate;
use super::schema::{CrossFieldRule, FieldSchema, Rule, Schema};

/// Which predicate a rule runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum CheckSpec {
    Required,
    Email,
    MinLength { min: usize },
    MaxLength { max: usize },
    ContainsDigit,
    ContainsUppercase,
    ContainsLowercase,
    Pattern { pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(flatten)]
    pub check: CheckSpec,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossFieldSpec {
    /// Field the error is reported on.
    pub field: String,
    /// Field it must equal.
    pub equals: String,
    pub message: String,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub cross_field: Vec<CrossFieldSpec>,
}

impl SchemaSpec {
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Compile into an evaluable schema.
    pub fn compile(&self) -> Result<Schema, SchemaError> {
        let mut schema = Schema::new();

        for field in &self.fields {
            let mut compiled = FieldSchema::new(&field.name);
            for rule in &field.rules {
                let predicate = compile_check(&field.name, &rule.check)?;
                let mut r = Rule::new(predicate);
                if let Some(message) = &rule.message {
                    r = r.message(message);
                }
                if let Some(hint) = &rule.hint {
                    r = r.hint(hint);
                }
                compiled = compiled.rule(r);
            }
            schema = schema.field(compiled);
        }

        for cross in &self.cross_field {
            for name in [&cross.field, &cross.equals] {
                if !self.fields.iter().any(|f| &f.name == name) {
                    return Err(SchemaError::UnknownField {
                        field: cross.field.clone(),
                        other: name.clone(),
                    });
                }
            }
            schema = schema.cross_rule(CrossFieldRule {
                field: cross.field.clone(),
                other: cross.equals.clone(),
                message: cross.message.clone(),
                hint: cross.hint.clone(),
            });
        }

        Ok(schema)
    }
}

fn compile_check(field: &str, check: &CheckSpec) -> Result<Predicate, SchemaError> {
    Ok(match check {
        CheckSpec::Required => Predicate::Required,
        CheckSpec::Email => Predicate::Email,
        CheckSpec::MinLength { min } => Predicate::MinLength(*min),
        CheckSpec::MaxLength { max } => Predicate::MaxLength(*max),
        CheckSpec::ContainsDigit => Predicate::ContainsDigit,
        CheckSpec::ContainsUppercase => Predicate::ContainsUppercase,
        CheckSpec::ContainsLowercase => Predicate::ContainsLowercase,
        CheckSpec::Pattern { pattern } => {
            let re = Regex::new(pattern).map_err(|e| SchemaError::InvalidPattern {
                field: field.to_string(),
                reason: e.to_string(),
            })?;
            Predicate::Pattern(re)
        }
    })
}
