//! In-process backends for tests: an axum server that speaks the real
//! HTTP contract, and an in-memory [`CustomerApi`] whose list calls can be
//! held open to exercise response ordering.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::{Customer, CustomerDraft, CustomerId},
    error::ErrorDetails,
    protocol::{CustomerPage, ListCustomersParams, RegisterRequest, SyncRequest},
};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot, Mutex},
};

use crate::{api::CustomerApi, error::ClientError};

pub(crate) const TEST_EMAIL: &str = "ada@example.com";
pub(crate) const TEST_PASSWORD: &str = "secret";
pub(crate) const TEST_TOKEN: &str = "jwt-test-token";
pub(crate) const SYNC_PASSWORD: &str = "upstream-pass";

pub(crate) fn draft(first: &str, city: &str, email: &str) -> CustomerDraft {
    CustomerDraft {
        first_name: first.to_string(),
        last_name: "Tester".to_string(),
        city: city.to_string(),
        email: email.to_string(),
        ..CustomerDraft::default()
    }
}

pub(crate) fn customer(id: &str, first: &str, city: &str) -> Customer {
    Customer::new(
        CustomerId::new(id),
        draft(first, city, &format!("{}@example.com", first.to_ascii_lowercase())),
    )
}

fn matches_filter(customer: &Customer, params: &ListCustomersParams) -> bool {
    let (Some(sort_by), Some(value)) = (params.sort_by.as_deref(), params.value.as_deref()) else {
        return true;
    };
    let details = &customer.details;
    match sort_by.to_ascii_lowercase().as_str() {
        "firstname" => details.first_name == value,
        "city" => details.city == value,
        "email" => details.email == value,
        "phone" => details.phone == value,
        _ => true,
    }
}

/// Filters and pages `rows` the way the backend does: exact match on the
/// selected column, ordered by id.
pub(crate) fn page_of(rows: &[Customer], params: &ListCustomersParams) -> CustomerPage {
    let mut matching: Vec<Customer> = rows
        .iter()
        .filter(|c| matches_filter(c, params))
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.uuid.as_str().cmp(b.uuid.as_str()));

    let size = params.size.max(1) as usize;
    let total_elements = matching.len();
    let total_pages = total_elements.div_ceil(size) as u32;
    let content = matching
        .into_iter()
        .skip(params.page as usize * size)
        .take(size)
        .collect();

    CustomerPage {
        content,
        total_pages,
        total_elements: total_elements as u64,
        number: params.page,
        size: params.size,
    }
}

#[derive(Clone, Default)]
pub(crate) struct BackendState {
    pub customers: Arc<Mutex<Vec<Customer>>>,
    pub list_calls: Arc<Mutex<Vec<ListCustomersParams>>>,
    pub created_bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    pub updated_bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    pub authorization_seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
    pub registrations: Arc<Mutex<Vec<RegisterRequest>>>,
    pub login_header_prefix: Arc<Mutex<Option<String>>>,
    pub login_token: Arc<Mutex<Option<String>>>,
}

impl BackendState {
    async fn record_auth(&self, route: &str, headers: &HeaderMap) -> bool {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let expected = format!("Bearer {TEST_TOKEN}");
        let authorized = value.as_deref() == Some(expected.as_str());
        self.authorization_seen
            .lock()
            .await
            .push((route.to_string(), value));
        authorized
    }
}

type ApiResult<T> = std::result::Result<T, (StatusCode, Json<ErrorDetails>)>;

fn unauthorized() -> (StatusCode, Json<ErrorDetails>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorDetails::new("Full authentication is required")),
    )
}

fn not_found(id: &str) -> (StatusCode, Json<ErrorDetails>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorDetails::new(format!("Customer not found with ID: {id}"))),
    )
}

async fn handle_login(State(state): State<BackendState>, headers: HeaderMap) -> impl IntoResponse {
    let expected = format!(
        "Basic {}",
        STANDARD.encode(format!("{TEST_EMAIL}:{TEST_PASSWORD}"))
    );
    let given = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if given != Some(expected.as_str()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let prefix = state.login_header_prefix.lock().await.clone().unwrap_or_default();
    let token = state
        .login_token
        .lock()
        .await
        .clone()
        .unwrap_or_else(|| TEST_TOKEN.to_string());
    (
        StatusCode::ACCEPTED,
        [(header::AUTHORIZATION, format!("{prefix}{token}"))],
        Json(serde_json::json!({ "name": TEST_EMAIL, "authenticated": true })),
    )
        .into_response()
}

async fn handle_register(
    State(state): State<BackendState>,
    Json(request): Json<RegisterRequest>,
) -> impl IntoResponse {
    let message = format!("Successfully registered: {}", request.email);
    state.registrations.lock().await.push(request);
    (StatusCode::CREATED, message)
}

async fn handle_list(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Query(params): Query<ListCustomersParams>,
) -> ApiResult<Json<CustomerPage>> {
    if !state.record_auth("list", &headers).await {
        return Err(unauthorized());
    }
    state.list_calls.lock().await.push(params.clone());
    let rows = state.customers.lock().await;
    Ok(Json(page_of(&rows, &params)))
}

async fn handle_get(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    if !state.record_auth("get", &headers).await {
        return Err(unauthorized());
    }
    let rows = state.customers.lock().await;
    rows.iter()
        .find(|c| c.uuid.as_str() == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

async fn handle_create(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    if !state.record_auth("create", &headers).await {
        return Err(unauthorized());
    }
    state.created_bodies.lock().await.push(body.clone());
    let details: CustomerDraft = serde_json::from_value(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorDetails::new(e.to_string())),
        )
    })?;
    let created = Customer::new(
        CustomerId::new(format!("test{}", uuid::Uuid::new_v4().simple())),
        details,
    );
    state.customers.lock().await.push(created.clone());
    Ok((StatusCode::CREATED, Json(created)))
}

async fn handle_update(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<Customer>> {
    if !state.record_auth("update", &headers).await {
        return Err(unauthorized());
    }
    state.updated_bodies.lock().await.push(body.clone());
    let mut incoming: Customer = serde_json::from_value(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorDetails::new(e.to_string())),
        )
    })?;
    incoming.uuid = CustomerId::new(id.clone());

    let mut rows = state.customers.lock().await;
    let slot = rows
        .iter_mut()
        .find(|c| c.uuid.as_str() == id)
        .ok_or_else(|| not_found(&id))?;
    *slot = incoming.clone();
    Ok(Json(incoming))
}

async fn handle_delete(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.record_auth("delete", &headers).await {
        return Err(unauthorized());
    }
    let mut rows = state.customers.lock().await;
    let before = rows.len();
    rows.retain(|c| c.uuid.as_str() != id);
    if rows.len() == before {
        return Err(not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_sync(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(request): Json<SyncRequest>,
) -> ApiResult<String> {
    if !state.record_auth("sync", &headers).await {
        return Err(unauthorized());
    }
    if request.password != SYNC_PASSWORD {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorDetails::new(
                "HTTP error occurred while retrieving the token: 401 Unauthorized",
            )),
        ));
    }
    let mut rows = state.customers.lock().await;
    for n in 0..3 {
        rows.push(customer(&format!("remote{n}"), &format!("Remote{n}"), "Lyon"));
    }
    Ok("3 customers added successfully".to_string())
}

/// Starts the mock backend and returns its `/api` base url.
pub(crate) async fn spawn_backend(state: BackendState) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/auth/login", get(handle_login))
        .route("/api/auth/register", post(handle_register))
        .route("/api/customers", get(handle_list).post(handle_create))
        .route("/api/customers/sync", post(handle_sync))
        .route(
            "/api/customers/:id",
            get(handle_get).put(handle_update).delete(handle_delete),
        )
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

/// In-memory [`CustomerApi`].
///
/// List calls are reported on `list_calls` as they start. A call whose page
/// has a gate registered waits for the gate to be released before answering.
pub(crate) struct FakeCustomerApi {
    pub rows: Mutex<Vec<Customer>>,
    pub fail_list: Mutex<bool>,
    pub fail_mutations: Mutex<bool>,
    pub mutation_calls: AtomicUsize,
    gates: Mutex<HashMap<u32, oneshot::Receiver<std::result::Result<CustomerPage, ClientError>>>>,
    list_tx: mpsc::UnboundedSender<ListCustomersParams>,
}

impl FakeCustomerApi {
    pub fn new(rows: Vec<Customer>) -> (Arc<Self>, mpsc::UnboundedReceiver<ListCustomersParams>) {
        let (list_tx, list_rx) = mpsc::unbounded_channel();
        let api = Arc::new(Self {
            rows: Mutex::new(rows),
            fail_list: Mutex::new(false),
            fail_mutations: Mutex::new(false),
            mutation_calls: AtomicUsize::new(0),
            gates: Mutex::new(HashMap::new()),
            list_tx,
        });
        (api, list_rx)
    }

    /// Holds the next list call for `page` until the returned sender fires.
    pub async fn gate_page(
        &self,
        page: u32,
    ) -> oneshot::Sender<std::result::Result<CustomerPage, ClientError>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().await.insert(page, rx);
        tx
    }

    async fn mutation_guard(&self) -> std::result::Result<(), ClientError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_mutations.lock().await {
            return Err(ClientError::Api {
                status: 400,
                message: "rejected".to_string(),
            });
        }
        Ok(())
    }
}

fn check_token(token: &str) -> std::result::Result<(), ClientError> {
    if token == TEST_TOKEN {
        Ok(())
    } else {
        Err(ClientError::Unauthorized {
            status: 401,
            message: "bad token".to_string(),
        })
    }
}

#[async_trait]
impl CustomerApi for FakeCustomerApi {
    async fn login(&self, email: &str, password: &str) -> std::result::Result<String, ClientError> {
        if email == TEST_EMAIL && password == TEST_PASSWORD {
            Ok(TEST_TOKEN.to_string())
        } else {
            Err(ClientError::Unauthorized {
                status: 401,
                message: "Bad credentials".to_string(),
            })
        }
    }

    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> std::result::Result<String, ClientError> {
        Ok(format!("Successfully registered: {}", request.email))
    }

    async fn list_customers(
        &self,
        token: &str,
        params: &ListCustomersParams,
    ) -> std::result::Result<CustomerPage, ClientError> {
        check_token(token)?;
        let _ = self.list_tx.send(params.clone());

        let gate = self.gates.lock().await.remove(&params.page);
        if let Some(gate) = gate {
            return gate.await.unwrap_or_else(|_| {
                Err(ClientError::Decode("gate dropped".to_string()))
            });
        }

        if *self.fail_list.lock().await {
            return Err(ClientError::Api {
                status: 500,
                message: "list unavailable".to_string(),
            });
        }
        let rows = self.rows.lock().await;
        Ok(page_of(&rows, params))
    }

    async fn get_customer(
        &self,
        token: &str,
        id: &CustomerId,
    ) -> std::result::Result<Customer, ClientError> {
        check_token(token)?;
        self.rows
            .lock()
            .await
            .iter()
            .find(|c| &c.uuid == id)
            .cloned()
            .ok_or_else(|| ClientError::Api {
                status: 400,
                message: format!("Customer not found with ID: {id}"),
            })
    }

    async fn create_customer(
        &self,
        token: &str,
        draft: &CustomerDraft,
    ) -> std::result::Result<Customer, ClientError> {
        check_token(token)?;
        self.mutation_guard().await?;
        let created = Customer::new(
            CustomerId::new(format!("test{}", uuid::Uuid::new_v4().simple())),
            draft.clone(),
        );
        self.rows.lock().await.push(created.clone());
        Ok(created)
    }

    async fn update_customer(
        &self,
        token: &str,
        customer: &Customer,
    ) -> std::result::Result<Customer, ClientError> {
        check_token(token)?;
        self.mutation_guard().await?;
        let mut rows = self.rows.lock().await;
        let slot = rows
            .iter_mut()
            .find(|c| c.uuid == customer.uuid)
            .ok_or_else(|| ClientError::Api {
                status: 400,
                message: format!("Customer not found with ID: {}", customer.uuid),
            })?;
        *slot = customer.clone();
        Ok(customer.clone())
    }

    async fn delete_customer(
        &self,
        token: &str,
        id: &CustomerId,
    ) -> std::result::Result<(), ClientError> {
        check_token(token)?;
        self.mutation_guard().await?;
        self.rows.lock().await.retain(|c| &c.uuid != id);
        Ok(())
    }

    async fn sync(&self, token: &str, password: &str) -> std::result::Result<String, ClientError> {
        check_token(token)?;
        self.mutation_guard().await?;
        if password != SYNC_PASSWORD {
            return Err(ClientError::Api {
                status: 400,
                message: "Failed to retrieve token".to_string(),
            });
        }
        Ok("0 customers added successfully".to_string())
    }
}
