use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationErrors;

/// Error body the backend returns for every rejected request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub message: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time_stamp: Option<NaiveDateTime>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            description: None,
            time_stamp: None,
        }
    }
}

/// A customer draft that does not satisfy the required-field contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid customer fields: {}", fields.join(", "))]
pub struct DraftError {
    /// Offending fields, by their wire name, sorted.
    pub fields: Vec<String>,
}

impl From<ValidationErrors> for DraftError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| wire_name(field))
            .collect();
        fields.sort();
        fields.dedup();
        Self { fields }
    }
}

fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
