use serde::{Deserialize, Serialize};

/// Identity payload returned by the profile-check endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub phone_verified: Option<bool>,
    #[serde(default)]
    pub is_seller: Option<bool>,
}

impl UserProfile {
    /// Unwrap a profile from the backend's `{ "data": ... }` envelope.
    ///
    /// Some deployments double-wrap the payload as `data.data`; the inner
    /// level wins when it holds the identity. A payload without an `id` is
    /// not a recognizable identity and yields `None`.
    pub fn from_envelope(payload: &serde_json::Value) -> Option<Self> {
        let data = payload.get("data")?;
        let candidate = match data.get("data") {
            Some(inner) if inner.get("id").is_some() => inner,
            _ => data,
        };
        serde_json::from_value(candidate.clone()).ok()
    }
}
