use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header::AUTHORIZATION, Client, Response};
use shared::{
    domain::{Customer, CustomerDraft, CustomerId},
    protocol::{CustomerPage, ListCustomersParams, RegisterRequest, SyncRequest},
};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

/// Remote customer backend.
///
/// Every authenticated call takes the bearer token explicitly; the caller
/// owns the session.
#[async_trait]
pub trait CustomerApi: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, email: &str, password: &str) -> Result<String, ClientError>;
    async fn register(&self, request: &RegisterRequest) -> Result<String, ClientError>;
    async fn list_customers(
        &self,
        token: &str,
        params: &ListCustomersParams,
    ) -> Result<CustomerPage, ClientError>;
    async fn get_customer(&self, token: &str, id: &CustomerId) -> Result<Customer, ClientError>;
    async fn create_customer(
        &self,
        token: &str,
        draft: &CustomerDraft,
    ) -> Result<Customer, ClientError>;
    /// Replaces the whole record identified by `customer.uuid`.
    async fn update_customer(
        &self,
        token: &str,
        customer: &Customer,
    ) -> Result<Customer, ClientError>;
    async fn delete_customer(&self, token: &str, id: &CustomerId) -> Result<(), ClientError>;
    /// Pulls customers from the upstream provider; returns the backend's message.
    async fn sync(&self, token: &str, password: &str) -> Result<String, ClientError>;
}

pub struct HttpCustomerApi {
    http: Client,
    base_url: Url,
}

impl HttpCustomerApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::BaseUrl {
                url: base_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            });
        }
        Ok(Self {
            http,
            base_url: parsed,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::from_response(status, &body))
}

/// The login endpoint hands the JWT back in the `Authorization` header,
/// sometimes with its scheme prefix.
fn token_from_header(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let token = match raw.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        None if raw.eq_ignore_ascii_case("bearer") => "",
        _ => raw,
    };
    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl CustomerApi for HttpCustomerApi {
    async fn login(&self, email: &str, password: &str) -> Result<String, ClientError> {
        let credentials = STANDARD.encode(format!("{email}:{password}"));
        let response = self
            .http
            .get(self.endpoint(&["auth", "login"]))
            .header(AUTHORIZATION, format!("Basic {credentials}"))
            .send()
            .await?;
        let status = response.status();
        let response = ensure_success(response).await?;

        response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(token_from_header)
            .ok_or_else(|| ClientError::Unauthorized {
                status: status.as_u16(),
                message: "login response carried no token".to_string(),
            })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["auth", "register"]))
            .json(request)
            .send()
            .await?;
        Ok(ensure_success(response).await?.text().await?)
    }

    async fn list_customers(
        &self,
        token: &str,
        params: &ListCustomersParams,
    ) -> Result<CustomerPage, ClientError> {
        debug!(
            page = params.page,
            size = params.size,
            sort_by = params.sort_by.as_deref().unwrap_or(""),
            "api: list customers"
        );
        let response = self
            .http
            .get(self.endpoint(&["customers"]))
            .query(params)
            .bearer_auth(token)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn get_customer(&self, token: &str, id: &CustomerId) -> Result<Customer, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["customers", id.as_str()]))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn create_customer(
        &self,
        token: &str,
        draft: &CustomerDraft,
    ) -> Result<Customer, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["customers"]))
            .bearer_auth(token)
            .json(draft)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn update_customer(
        &self,
        token: &str,
        customer: &Customer,
    ) -> Result<Customer, ClientError> {
        let response = self
            .http
            .put(self.endpoint(&["customers", customer.uuid.as_str()]))
            .bearer_auth(token)
            .json(customer)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn delete_customer(&self, token: &str, id: &CustomerId) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.endpoint(&["customers", id.as_str()]))
            .bearer_auth(token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn sync(&self, token: &str, password: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&["customers", "sync"]))
            .bearer_auth(token)
            .json(&SyncRequest {
                password: password.to_string(),
            })
            .send()
            .await?;
        Ok(ensure_success(response).await?.text().await?)
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
