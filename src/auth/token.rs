use serde::{Deserialize, Serialize};

/// Access/refresh token pair persisted by a [`TokenStore`](super::TokenStore).
///
/// The pair is written and cleared as a unit: after a successful save both
/// sides are present, and after a clear both are gone. A half-empty pair only
/// ever comes from an empty or unreadable store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access_token: Some(access.into()),
            refresh_token: Some(refresh.into()),
        }
    }

    /// The empty pair returned by a store with nothing persisted.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}
