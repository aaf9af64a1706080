use serde::{Deserialize, Serialize};

use crate::domain::{Customer, Query};

/// One page of the customer listing, as returned by `GET /customers`.
///
/// The backend sends a full paging envelope; only the fields the client
/// uses are decoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPage {
    #[serde(default)]
    pub content: Vec<Customer>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
}

/// Query string of `GET /customers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCustomersParams {
    pub page: u32,
    pub size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ListCustomersParams {
    pub fn new(query: &Query, page: u32, size: u32) -> Self {
        let (sort_by, value) = match query.filter() {
            Some((field, term)) => (Some(field.as_wire().to_string()), Some(term.to_string())),
            None => (None, None),
        };
        Self {
            page,
            size,
            sort_by,
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}
