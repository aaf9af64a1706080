//! Client side of the customer manager: the HTTP API boundary, the
//! session context, and the controller that keeps one page of customers
//! consistent with the backend.

pub mod api;
pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod session;

pub use api::{CustomerApi, HttpCustomerApi};
pub use auth::Authenticator;
pub use config::{load_settings, ClientSettings};
pub use controller::{ControllerEvent, CustomerListController, PageSnapshot};
pub use error::{ClientError, ErrorKind};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionRecord, SessionStore};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
