//! Shared test helpers: mock-backed auth stacks and a recording navigator.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use vitrine::auth::{AuthStack, MemoryTokenStore, TokenStore};
use vitrine::config::ApiConfig;
use vitrine::workflow::Navigator;

/// Config pointed at a mock server, with a deadline short enough that
/// delay-based timeout tests stay fast.
pub fn test_config(base_url: &str) -> ApiConfig {
    ApiConfig::new(base_url).with_timeout(Duration::from_millis(500))
}

/// A stack over an in-memory store with nothing persisted.
pub fn empty_stack(base_url: &str) -> (AuthStack, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    let stack = AuthStack::new(test_config(base_url), store.clone());
    (stack, store)
}

/// A stack whose store already holds a token pair.
pub async fn stack_with_tokens(
    base_url: &str,
    access: &str,
    refresh: &str,
) -> (AuthStack, Arc<MemoryTokenStore>) {
    let (stack, store) = empty_stack(base_url);
    store.save(access, refresh).await.expect("seed tokens");
    (stack, store)
}

/// Hand-wired resolver with a custom cache TTL, for tests that need the
/// cache to expire immediately.
pub fn resolver_with_ttl(
    base_url: &str,
    ttl: Duration,
) -> (
    Arc<vitrine::auth::SessionResolver>,
    Arc<MemoryTokenStore>,
) {
    use vitrine::auth::{AuthGateway, RefreshCoordinator, SessionResolver};

    let store = Arc::new(MemoryTokenStore::new());
    let config = test_config(base_url);
    let client = reqwest::Client::new();
    let refresher = Arc::new(RefreshCoordinator::new(
        client.clone(),
        &config,
        store.clone(),
    ));
    let gateway = Arc::new(AuthGateway::new(
        client,
        config,
        store.clone(),
        refresher.clone(),
    ));
    let session = Arc::new(SessionResolver::new(gateway, store.clone(), refresher).with_ttl(ttl));
    (session, store)
}

/// Navigator that records every host-navigation call.
#[derive(Default)]
pub struct RecordingNavigator {
    calls: Mutex<Vec<String>>,
    has_history: bool,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            has_history: true,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn can_go_back(&self) -> bool {
        self.has_history
    }

    fn back(&self) {
        self.calls.lock().unwrap().push("back".to_string());
    }

    fn replace(&self, target: &str) {
        self.calls.lock().unwrap().push(format!("replace:{target}"));
    }
}

/// A standard profile payload the mock backend hands back.
pub fn profile_body(id: i64) -> serde_json::Value {
    serde_json::json!({
        "data": {
            "id": id,
            "email": "shopper@example.shop",
            "phone_verified": true,
            "is_seller": false
        }
    })
}

/// A standard refresh/login response envelope.
pub fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    serde_json::json!({
        "data": { "access_token": access, "refresh_token": refresh }
    })
}
