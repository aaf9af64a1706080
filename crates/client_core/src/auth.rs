use std::sync::Arc;

use shared::protocol::RegisterRequest;
use tracing::{info, warn};

use crate::{api::CustomerApi, error::ClientError, session::Session};

/// Role the backend assigns to accounts created from the client.
pub const DEFAULT_ROLE: &str = "ROLE_ADMIN";

/// Login, logout and registration against the backend's auth endpoints.
pub struct Authenticator {
    api: Arc<dyn CustomerApi>,
    session: Arc<Session>,
}

impl Authenticator {
    pub fn new(api: Arc<dyn CustomerApi>, session: Arc<Session>) -> Self {
        Self { api, session }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        match self.api.login(email, password).await {
            Ok(token) => {
                self.session.establish(token)?;
                info!(email, "auth: logged in");
                Ok(())
            }
            Err(err) => {
                warn!(email, "auth: login failed: {err}");
                Err(err)
            }
        }
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.session.destroy()?;
        Ok(())
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<String, ClientError> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            role: role.unwrap_or(DEFAULT_ROLE).to_string(),
        };
        let message = self.api.register(&request).await?;
        info!(email, "auth: registered");
        Ok(message)
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }
}
