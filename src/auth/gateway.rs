use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};

use crate::config::ApiConfig;
use crate::error::ApiError;

use super::refresh::RefreshCoordinator;
use super::store::TokenStore;

/// One outbound API request, built caller-side and handed to
/// [`AuthGateway::send`].
///
/// # Example
/// ```
/// use serde_json::json;
/// use vitrine::auth::ApiRequest;
///
/// let request = ApiRequest::post("/orders")
///     .body(json!({ "product_id": 42, "quantity": 1 }))
///     .max_retries(1);
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) body: Option<serde_json::Value>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) require_auth: bool,
    pub(crate) max_retries: u32,
    pub(crate) clear_tokens_on_error: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            require_auth: true,
            max_retries: 1,
            clear_tokens_on_error: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set or override a header. Caller-set `Content-Type`/`Accept` win over
    /// the JSON defaults.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send without a bearer token and without the 401 refresh cycle.
    pub fn public(mut self) -> Self {
        self.require_auth = false;
        self
    }

    /// Bound the number of refresh-then-replay cycles (default 1).
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Keep stored tokens even when the refresh triggered by this request
    /// fails (default is to wipe them).
    pub fn keep_tokens_on_refresh_failure(mut self) -> Self {
        self.clear_tokens_on_error = false;
        self
    }
}

/// Auth-aware HTTP gateway.
///
/// Injects the bearer token, enforces the configured deadline per attempt,
/// and on a 401 runs one refresh-then-replay cycle through the shared
/// [`RefreshCoordinator`]. Every response the server actually produced —
/// whatever its status — is returned to the caller unmodified; this layer
/// does not interpret business errors, and it never turns an unresolvable
/// 401 into an error.
pub struct AuthGateway {
    client: reqwest::Client,
    config: ApiConfig,
    store: Arc<dyn TokenStore>,
    refresher: Arc<RefreshCoordinator>,
}

impl AuthGateway {
    pub fn new(
        client: reqwest::Client,
        config: ApiConfig,
        store: Arc<dyn TokenStore>,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            client,
            config,
            store,
            refresher,
        }
    }

    /// Issue the request, transparently refreshing and replaying once on 401.
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let mut token = if request.require_auth {
            let pair = self.store.get().await;
            if pair.access_token.is_none() {
                tracing::warn!(
                    path = %request.path,
                    "no access token stored, sending request unauthenticated"
                );
            }
            pair.access_token
        } else {
            None
        };

        let mut retries_left = request.max_retries;
        loop {
            let response = self.dispatch(&request, token.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED
                || !request.require_auth
                || retries_left == 0
            {
                return Ok(response);
            }
            retries_left -= 1;

            match self.refresher.refresh().await {
                Ok(new_access) => {
                    tracing::debug!(path = %request.path, "replaying request with refreshed token");
                    token = Some(new_access);
                }
                Err(err) => {
                    if request.clear_tokens_on_error {
                        self.store.clear().await;
                    }
                    tracing::warn!(
                        path = %request.path,
                        error = %err,
                        "token refresh failed, returning original 401"
                    );
                    return Ok(response);
                }
            }
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = self.config.url_for(&request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(build_headers(&request.headers, token));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        match tokio::time::timeout(self.config.timeout, builder.send()).await {
            Err(_) => Err(ApiError::Timeout(self.config.timeout.as_millis() as u64)),
            Ok(result) => Ok(result?),
        }
    }
}

fn build_headers(overrides: &[(String, String)], token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = token {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(AUTHORIZATION, value);
        }
    }
    for (name, value) in overrides {
        let parsed = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        );
        match parsed {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "dropping invalid request header"),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_require_auth_with_one_retry() {
        let request = ApiRequest::get("/orders");
        assert!(request.require_auth);
        assert_eq!(request.max_retries, 1);
        assert!(request.clear_tokens_on_error);
    }

    #[test]
    fn caller_headers_override_json_defaults() {
        let headers = build_headers(
            &[("Content-Type".to_string(), "text/plain".to_string())],
            Some("tok"),
        );
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn no_token_means_no_authorization_header() {
        let headers = build_headers(&[], None);
        assert!(headers.get(AUTHORIZATION).is_none());
    }
}
