//! Error types for Vitrine.

use thiserror::Error;

/// Transport-level error for gateway requests.
///
/// Anything the server actually answered — any status code, including
/// 4xx/5xx — is returned as a response, not an error. `ApiError` only covers
/// the cases where no usable response exists.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// Classify this error for session decisions.
    pub fn class(&self) -> FailureClass {
        FailureClass::Network
    }

    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), FailureClass::Network)
    }
}

/// Three-way failure classification driving session decisions.
///
/// `Network` failures are transient: tokens and the cached identity are left
/// intact so the UI can offer a retry. `Auth` failures mean the credential is
/// invalid beyond recovery: persisted tokens and the cache are cleared and
/// the user is routed to login. `Unknown` is treated like `Auth` for
/// token-clearing purposes (failing closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Network,
    Auth,
    Unknown,
}

impl FailureClass {
    /// Whether this class of failure destroys the persisted session.
    pub fn clears_session(&self) -> bool {
        matches!(self, Self::Auth | Self::Unknown)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ApiError>;
