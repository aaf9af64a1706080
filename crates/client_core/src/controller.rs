//! The customer list: query, cursor, and the rows of the current page.
//!
//! Every list fetch takes a request id from a monotonically increasing
//! counter while holding the state lock. When the response arrives the id
//! is compared against the latest one issued under the same lock, and a
//! response that lost the race is dropped instead of overwriting newer
//! rows. Mutations never touch rows directly; they finish with a refresh
//! of the unchanged query and cursor.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::{
    domain::{Customer, CustomerDraft, CustomerId, Query, SearchField},
    protocol::ListCustomersParams,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    api::CustomerApi,
    error::{ClientError, ErrorKind},
    session::Session,
};

/// What a display layer needs to render the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub query: Query,
    pub page_index: u32,
    pub page_size: u32,
    pub rows: Vec<Customer>,
    pub total_pages: u32,
    pub total_elements: u64,
}

impl PageSnapshot {
    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    pub fn has_next(&self) -> bool {
        self.page_index < self.total_pages.saturating_sub(1)
    }
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    PageLoaded(PageSnapshot),
    FetchFailed { kind: ErrorKind, message: String },
    CustomerCreated(Customer),
    CustomerUpdated(Customer),
    CustomerDeleted(CustomerId),
    Synced { message: String },
}

struct ListState {
    query: Query,
    page_index: u32,
    rows: Vec<Customer>,
    total_pages: u32,
    total_elements: u64,
}

pub struct CustomerListController {
    api: Arc<dyn CustomerApi>,
    session: Arc<Session>,
    page_size: u32,
    inner: Mutex<ListState>,
    latest_request: AtomicU64,
    events: broadcast::Sender<ControllerEvent>,
}

impl CustomerListController {
    pub fn new(api: Arc<dyn CustomerApi>, session: Arc<Session>, page_size: u32) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            api,
            session,
            page_size: page_size.max(1),
            inner: Mutex::new(ListState {
                query: Query::default(),
                page_index: 0,
                rows: Vec::new(),
                total_pages: 0,
                total_elements: 0,
            }),
            latest_request: AtomicU64::new(0),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> PageSnapshot {
        let guard = self.inner.lock().await;
        self.snapshot_of(&guard)
    }

    fn snapshot_of(&self, state: &ListState) -> PageSnapshot {
        PageSnapshot {
            query: state.query.clone(),
            page_index: state.page_index,
            page_size: self.page_size,
            rows: state.rows.clone(),
            total_pages: state.total_pages,
            total_elements: state.total_elements,
        }
    }

    /// Re-reads the current page for the current query.
    ///
    /// On failure the previous rows stay in place and observers receive
    /// [`ControllerEvent::FetchFailed`]. A response that arrives after a
    /// newer fetch was issued is discarded and reported as
    /// [`ClientError::Superseded`].
    pub async fn fetch_page(&self) -> Result<PageSnapshot, ClientError> {
        let (request_id, params) = {
            let guard = self.inner.lock().await;
            let request_id = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
            (
                request_id,
                ListCustomersParams::new(&guard.query, guard.page_index, self.page_size),
            )
        };

        let result = match self.session.bearer() {
            Ok(token) => self.api.list_customers(&token, &params).await,
            Err(err) => Err(err),
        };

        let mut guard = self.inner.lock().await;
        if request_id != self.latest_request.load(Ordering::SeqCst) {
            debug!(
                request_id,
                page = params.page,
                "customers: dropping response of superseded fetch"
            );
            return Err(ClientError::Superseded { request_id });
        }

        match result {
            Ok(page) => {
                guard.rows = page.content;
                guard.total_pages = page.total_pages;
                guard.total_elements = page.total_elements;
                let snapshot = self.snapshot_of(&guard);
                drop(guard);
                debug!(
                    request_id,
                    page = snapshot.page_index,
                    rows = snapshot.rows.len(),
                    total_pages = snapshot.total_pages,
                    "customers: page loaded"
                );
                let _ = self
                    .events
                    .send(ControllerEvent::PageLoaded(snapshot.clone()));
                Ok(snapshot)
            }
            Err(err) => {
                drop(guard);
                warn!(request_id, page = params.page, "customers: fetch failed: {err}");
                let _ = self.events.send(ControllerEvent::FetchFailed {
                    kind: err.kind(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Applies a new filter. Pagination always restarts from the first page.
    pub async fn set_query(
        &self,
        field: Option<SearchField>,
        term: impl Into<String>,
    ) -> Result<PageSnapshot, ClientError> {
        {
            let mut guard = self.inner.lock().await;
            guard.query = Query::new(field, term);
            guard.page_index = 0;
        }
        self.fetch_page().await
    }

    /// Moves the cursor. The caller keeps `index` below `total_pages`.
    pub async fn set_page(&self, index: u32) -> Result<PageSnapshot, ClientError> {
        {
            let mut guard = self.inner.lock().await;
            guard.page_index = index;
        }
        self.fetch_page().await
    }

    /// Loads a single record, e.g. to prefill an edit form. List state is untouched.
    pub async fn get_customer(&self, id: &CustomerId) -> Result<Customer, ClientError> {
        let token = self.session.bearer()?;
        self.api.get_customer(&token, id).await
    }

    pub async fn create_customer(&self, draft: &CustomerDraft) -> Result<Customer, ClientError> {
        draft.check()?;
        let token = self.session.bearer()?;
        let created = self.api.create_customer(&token, draft).await?;
        info!(id = %created.uuid, "customers: created");
        let _ = self
            .events
            .send(ControllerEvent::CustomerCreated(created.clone()));
        self.refresh_after("create").await;
        Ok(created)
    }

    /// Replaces the whole record; there is no field-level patch.
    pub async fn update_customer(
        &self,
        id: &CustomerId,
        draft: &CustomerDraft,
    ) -> Result<Customer, ClientError> {
        draft.check()?;
        let token = self.session.bearer()?;
        let record = Customer::new(id.clone(), draft.clone());
        let updated = self.api.update_customer(&token, &record).await?;
        info!(id = %updated.uuid, "customers: updated");
        let _ = self
            .events
            .send(ControllerEvent::CustomerUpdated(updated.clone()));
        self.refresh_after("update").await;
        Ok(updated)
    }

    /// Deleting the last row of a later page leaves the cursor where it is;
    /// the refreshed page may come back short or empty.
    pub async fn delete_customer(&self, id: &CustomerId) -> Result<(), ClientError> {
        let token = self.session.bearer()?;
        self.api.delete_customer(&token, id).await?;
        info!(%id, "customers: deleted");
        let _ = self.events.send(ControllerEvent::CustomerDeleted(id.clone()));
        self.refresh_after("delete").await;
        Ok(())
    }

    /// Runs the backend's upstream import and returns its message as-is.
    pub async fn sync_all(&self, password: &str) -> Result<String, ClientError> {
        let token = self.session.bearer()?;
        let message = self.api.sync(&token, password).await?;
        info!("customers: sync finished: {message}");
        let _ = self.events.send(ControllerEvent::Synced {
            message: message.clone(),
        });
        self.refresh_after("sync").await;
        Ok(message)
    }

    async fn refresh_after(&self, operation: &str) {
        match self.fetch_page().await {
            Ok(_) => {}
            Err(ClientError::Superseded { .. }) => {
                debug!(operation, "customers: refresh superseded by a newer fetch");
            }
            Err(err) => {
                warn!(operation, "customers: refresh after mutation failed: {err}");
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
