use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::error::DraftError;

/// Rows per page when no explicit page size is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Backend-assigned identifier of a customer record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The backend hands out `null` for columns that were never filled in.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Editable fields of a customer record, without its identifier.
///
/// Used as the body of a create request and, wrapped in [`Customer`], as
/// the full replacement record of an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1))]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1))]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub street: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1), email)]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
}

impl CustomerDraft {
    /// Checks the required-field contract: first name, last name and a
    /// well-formed email address.
    pub fn check(&self) -> Result<(), DraftError> {
        self.validate().map_err(DraftError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub uuid: CustomerId,
    #[serde(flatten)]
    pub details: CustomerDraft,
}

impl Customer {
    pub fn new(uuid: CustomerId, details: CustomerDraft) -> Self {
        Self { uuid, details }
    }
}

/// Column a search term is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchField {
    #[serde(rename = "firstName")]
    FirstName,
    #[serde(rename = "city")]
    City,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "phone")]
    Phone,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [Self::FirstName, Self::City, Self::Email, Self::Phone];

    /// Name the backend expects in the `sortBy` query parameter.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::City => "city",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown search field '{0}', expected one of firstName, city, email, phone")]
pub struct UnknownSearchField(pub String);

impl FromStr for SearchField {
    type Err = UnknownSearchField;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|field| field.as_wire().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownSearchField(raw.to_string()))
    }
}

/// Active filter of the customer list.
///
/// An empty `term` means "no filter" regardless of `field`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub field: Option<SearchField>,
    pub term: String,
}

impl Query {
    pub fn new(field: Option<SearchField>, term: impl Into<String>) -> Self {
        Self {
            field,
            term: term.into(),
        }
    }

    /// The `(sortBy, value)` pair to send, or `None` for an unfiltered listing.
    pub fn filter(&self) -> Option<(SearchField, &str)> {
        let term = self.term.trim();
        match self.field {
            Some(field) if !term.is_empty() => Some((field, term)),
            _ => None,
        }
    }
}
