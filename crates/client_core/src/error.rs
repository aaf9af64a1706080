use reqwest::StatusCode;
use shared::error::{DraftError, ErrorDetails};
use thiserror::Error;

use crate::session::SessionStoreError;

/// Coarse classification a presentation layer can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend could not be reached or the connection broke.
    Transport,
    /// Missing session or a token/credential the backend rejected.
    Auth,
    /// The backend answered with a non-success status.
    Api,
    /// The request was rejected locally before being sent.
    Validation,
    /// The backend answered with a body the client could not read.
    Decode,
    /// The session could not be read from or written to its store.
    Storage,
    /// A newer list fetch was issued before this one completed.
    Superseded,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not logged in")]
    NotLoggedIn,
    #[error("authentication rejected ({status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Invalid(#[from] DraftError),
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("malformed backend response: {0}")]
    Decode(String),
    #[error("invalid api base url '{url}': {reason}")]
    BaseUrl { url: String, reason: String },
    #[error(transparent)]
    Session(#[from] SessionStoreError),
    #[error("list fetch #{request_id} superseded by a newer request")]
    Superseded { request_id: u64 },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotLoggedIn | Self::Unauthorized { .. } => ErrorKind::Auth,
            Self::Api { .. } => ErrorKind::Api,
            Self::Invalid(_) | Self::BaseUrl { .. } => ErrorKind::Validation,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Session(_) => ErrorKind::Storage,
            Self::Superseded { .. } => ErrorKind::Superseded,
        }
    }

    /// Builds the error for a non-success response from its status and raw body.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorDetails>(body)
            .map(|details| details.message)
            .ok()
            .filter(|message| !message.trim().is_empty())
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Unauthorized {
                status: status.as_u16(),
                message,
            }
        } else {
            Self::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}
