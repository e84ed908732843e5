//! Payload validation on top of `validator`.
//!
//! Request types derive `Validate`. Rules on `Option` fields run only when the
//! field is present, so partial updates are never forced to re-send unrelated
//! fields. Every rule runs; the caller gets all violations at once.

use serde::Serialize;
use validator::ValidationErrors;

pub mod rules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Flatten `validator`'s error tree into wire-named violations, ordered by field.
pub fn violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut violations: Vec<FieldViolation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = camel_case(&field.to_string());
            errs.iter().map(move |err| FieldViolation {
                field: field.clone(),
                message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field)),
            })
        })
        .collect();
    violations.sort_by(|a, b| a.field.cmp(&b.field));
    violations
}

/// `github_url` -> `githubUrl`; already camel-cased names pass through.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
