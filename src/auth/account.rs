use std::sync::Arc;

use super::error::AccountError;
use super::gateway::{ApiRequest, AuthGateway};
use super::session::SessionResolver;
use super::store::TokenStore;

/// Path of the login endpoint.
pub const LOGIN_PATH: &str = "/auth/login";
/// Path of the registration endpoint.
pub const REGISTER_PATH: &str = "/auth/register";
/// Path of the logout endpoint.
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Login or registration credentials. Either `email` or `phone` identifies
/// the account, depending on how the user signed up.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

impl Credentials {
    pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            phone: None,
            password: password.into(),
        }
    }

    pub fn phone(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: None,
            phone: Some(phone.into()),
            password: password.into(),
        }
    }

    fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        if let Some(email) = &self.email {
            body.insert("email".to_string(), serde_json::Value::from(email.clone()));
        }
        if let Some(phone) = &self.phone {
            body.insert("phone".to_string(), serde_json::Value::from(phone.clone()));
        }
        body.insert(
            "password".to_string(),
            serde_json::Value::from(self.password.clone()),
        );
        serde_json::Value::Object(body)
    }
}

/// Account lifecycle facade: login, registration, logout.
///
/// Pure service in front of the gateway — typed results only, no UX
/// decisions. Success persists the token pair and drops any stale cached
/// identity so the next session check observes the new account.
pub struct AccountService {
    gateway: Arc<AuthGateway>,
    store: Arc<dyn TokenStore>,
    session: Arc<SessionResolver>,
}

impl AccountService {
    pub fn new(
        gateway: Arc<AuthGateway>,
        store: Arc<dyn TokenStore>,
        session: Arc<SessionResolver>,
    ) -> Self {
        Self {
            gateway,
            store,
            session,
        }
    }

    /// Exchange credentials for a session at `/auth/login`.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), AccountError> {
        self.establish_session(LOGIN_PATH, credentials).await
    }

    /// Create an account at `/auth/register`; the backend returns a session
    /// pair on success, same contract as login.
    pub async fn register(&self, credentials: &Credentials) -> Result<(), AccountError> {
        self.establish_session(REGISTER_PATH, credentials).await
    }

    /// End the session. The server call is best-effort (failures logged);
    /// local state is cleared unconditionally. Idempotent.
    pub async fn logout(&self) {
        let request = ApiRequest::post(LOGOUT_PATH)
            .max_retries(0)
            .keep_tokens_on_refresh_failure();
        match self.gateway.send(request).await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(status = %response.status(), "logout rejected by server");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "logout request failed"),
        }
        self.store.clear().await;
        self.session.clear_cache();
    }

    async fn establish_session(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<(), AccountError> {
        let request = ApiRequest::post(path).public().body(credentials.to_body());
        let response = self.gateway.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|payload| envelope_message(&payload));
            return Err(AccountError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|_| AccountError::MalformedResponse)?;
        let (access, refresh) =
            extract_token_pair(&payload).ok_or(AccountError::MalformedResponse)?;

        self.store.save(&access, &refresh).await?;
        self.session.clear_cache();
        tracing::debug!(path, "session established");
        Ok(())
    }
}

fn extract_token_pair(payload: &serde_json::Value) -> Option<(String, String)> {
    let data = payload.get("data")?;
    let access = data.get("access_token")?.as_str()?;
    let refresh = data.get("refresh_token")?.as_str()?;
    Some((access.to_string(), refresh.to_string()))
}

fn envelope_message(payload: &serde_json::Value) -> Option<String> {
    payload
        .get("message")
        .or_else(|| payload.get("error"))
        .and_then(|v| v.as_str())
        .map(String::from)
}
