use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::config::ApiConfig;

use super::error::RefreshError;
use super::store::TokenStore;

/// Path of the token refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "/auth/refresh";

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

/// Process-wide single-flight token refresh.
///
/// The first caller that needs a refresh starts the HTTP exchange and parks
/// it in a shared handle; every concurrent caller awaits that same exchange
/// instead of issuing its own. The handle is dropped when the exchange
/// settles, success or failure, so a failed refresh never blocks the next
/// attempt.
///
/// On success the new pair is persisted atomically and the fresh access
/// token returned. The coordinator never clears tokens — whether a failure
/// destroys the session is the caller's policy, keyed off
/// [`RefreshError::class`].
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    client: reqwest::Client,
    refresh_url: String,
    timeout: Duration,
    store: Arc<dyn TokenStore>,
    in_flight: tokio::sync::Mutex<Option<SharedRefresh>>,
}

impl RefreshCoordinator {
    pub fn new(client: reqwest::Client, config: &ApiConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                refresh_url: config.url_for(REFRESH_PATH),
                timeout: config.timeout,
                store,
                in_flight: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Exchange the stored refresh token for a new pair, joining an
    /// in-flight exchange if one exists. Returns the new access token.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        let shared = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(existing) => {
                    tracing::debug!("joining in-flight token refresh");
                    existing.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let fut = async move {
                        let result = inner.execute().await;
                        *inner.in_flight.lock().await = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        shared.await
    }
}

impl Inner {
    async fn execute(&self) -> Result<String, RefreshError> {
        let pair = self.store.get().await;
        let refresh_token = pair.refresh_token.ok_or(RefreshError::MissingToken)?;

        let send = self
            .client
            .post(&self.refresh_url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send();
        let response = match tokio::time::timeout(self.timeout, send).await {
            Err(_) => return Err(RefreshError::Timeout(self.timeout.as_millis() as u64)),
            Ok(Err(err)) => return Err(RefreshError::Network(err.to_string())),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if status.is_server_error() {
            return Err(RefreshError::Unavailable {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|_| RefreshError::MalformedResponse)?;
        let data = payload.get("data").ok_or(RefreshError::MalformedResponse)?;
        let access = data
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or(RefreshError::MalformedResponse)?;
        let refresh = data
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .ok_or(RefreshError::MalformedResponse)?;

        self.store
            .save(access, refresh)
            .await
            .map_err(|err| RefreshError::Storage(err.to_string()))?;
        tracing::debug!("token refresh succeeded");
        Ok(access.to_string())
    }
}
