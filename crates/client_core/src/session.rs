//! Explicit session context shared by every authenticated request.
//!
//! A [`Session`] is created once and handed to the controller and the
//! authenticator. It caches the current record in memory and writes
//! through to a [`SessionStore`] so a later process can pick it up.

use std::{
    fs, io,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ClientError;

/// The two persisted session keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    #[serde(rename = "isLoggedIn", default)]
    pub is_logged_in: bool,
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to access session file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode session: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to decode session file '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<SessionRecord>, SessionStoreError>;
    fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError>;
    fn clear(&self) -> Result<(), SessionStoreError>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, SessionStoreError> {
        Ok(self
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Keeps the session as a small TOML file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionRecord>, SessionStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        let record = toml::from_str::<SessionRecord>(&raw).map_err(|source| {
            SessionStoreError::Decode {
                path: self.path.clone(),
                source,
            }
        })?;
        Ok(Some(record))
    }

    fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let raw = toml::to_string(record)?;
        fs::write(&self.path, raw).map_err(|err| self.io_error(err))
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

pub struct Session {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<SessionRecord>>,
}

impl Session {
    /// A session with nothing persisted yet.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    /// Picks up whatever the store already holds.
    pub fn restore(store: Arc<dyn SessionStore>) -> Result<Self, SessionStoreError> {
        let record = store.load()?;
        debug!(restored = record.is_some(), "session: loaded from store");
        Ok(Self {
            store,
            current: RwLock::new(record),
        })
    }

    pub fn establish(&self, token: impl Into<String>) -> Result<(), SessionStoreError> {
        let record = SessionRecord {
            token: token.into(),
            is_logged_in: true,
        };
        self.store.save(&record)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(record);
        info!("session: established");
        Ok(())
    }

    pub fn destroy(&self) -> Result<(), SessionStoreError> {
        self.store.clear()?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("session: destroyed");
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|record| record.is_logged_in && !record.token.is_empty())
    }

    /// Token for the `Authorization: Bearer` header.
    pub fn bearer(&self) -> Result<String, ClientError> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|record| record.is_logged_in && !record.token.is_empty())
            .map(|record| record.token.clone())
            .ok_or(ClientError::NotLoggedIn)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
