use thiserror::Error;

use crate::error::FailureClass;

/// Persistence failures from a [`TokenStore`](super::TokenStore) write.
///
/// Reads never surface errors — a store that cannot be read behaves as an
/// empty store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<toml::ser::Error> for StorageError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Outcomes of a failed token refresh, classified for session decisions.
///
/// Cloneable because concurrent refresh callers share one outcome through
/// the single-flight handle.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error("No refresh token stored")]
    MissingToken,
    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16 },
    #[error("Refresh endpoint unavailable (status {status})")]
    Unavailable { status: u16 },
    #[error("Refresh response missing token pair")]
    MalformedResponse,
    #[error("Network error during refresh: {0}")]
    Network(String),
    #[error("Refresh timeout after {0}ms")]
    Timeout(u64),
    #[error("Token persistence failed: {0}")]
    Storage(String),
}

impl RefreshError {
    /// Session classification. Any non-5xx rejection counts as `Auth`, the
    /// same as the missing-token case; 5xx, transport, timeout, and parse
    /// failures are `Network` and leave the session intact.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::MissingToken | Self::Rejected { .. } => FailureClass::Auth,
            Self::Unavailable { .. }
            | Self::MalformedResponse
            | Self::Network(_)
            | Self::Timeout(_) => FailureClass::Network,
            Self::Storage(_) => FailureClass::Unknown,
        }
    }
}

/// Login/registration failures surfaced by the account service.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Request failed: {0}")]
    Transport(#[from] crate::error::ApiError),
    #[error("Rejected with status {status}")]
    Rejected { status: u16, message: Option<String> },
    #[error("Response missing token pair")]
    MalformedResponse,
    #[error("Token persistence failed: {0}")]
    Storage(#[from] StorageError),
}
