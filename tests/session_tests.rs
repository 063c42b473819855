//! Session resolver integration tests: cache TTL, failure classification,
//! and the survival of a valid session across transient outages.

mod common;

use std::time::Duration;

use serde_json::json;
use vitrine::auth::{AuthCheck, TokenPair, TokenStore};
use vitrine::error::FailureClass;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{empty_stack, profile_body, resolver_with_ttl, stack_with_tokens, token_body};

#[tokio::test]
async fn second_check_within_ttl_makes_no_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(7)))
        .expect(1)
        .mount(&server)
        .await;

    let (stack, _store) = stack_with_tokens(&server.uri(), "A1", "R1").await;
    assert!(stack.session.check_auth().await.is_authenticated());
    assert!(stack.session.check_auth().await.is_authenticated());
}

#[tokio::test]
async fn missing_access_token_requires_login() {
    let server = MockServer::start().await;
    let (stack, _store) = empty_stack(&server.uri());

    match stack.session.check_auth().await {
        AuthCheck::LoginRequired { class, .. } => assert_eq!(class, FailureClass::Auth),
        other => panic!("expected LoginRequired, got {other:?}"),
    }
}

#[tokio::test]
async fn network_outage_keeps_session_and_serves_stale_cache() {
    let server = MockServer::start().await;
    // One good profile answer, then nothing but a response slower than the
    // configured deadline — a network-class failure.
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(7)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let (session, store) = resolver_with_ttl(&server.uri(), Duration::ZERO);
    store.save("A1", "R1").await.unwrap();

    let first = session.check_auth().await;
    assert!(first.is_authenticated());

    let second = session.check_auth().await;
    assert!(matches!(second, AuthCheck::Unavailable { .. }));

    // Tokens untouched, stale identity still served.
    assert_eq!(store.get().await, TokenPair::new("A1", "R1"));
    let profile = session.user_profile().await.expect("stale cache");
    assert_eq!(profile.id, 7);
}

#[tokio::test]
async fn rejected_refresh_evicts_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (stack, store) = stack_with_tokens(&server.uri(), "A1", "R1").await;
    match stack.session.check_auth().await {
        AuthCheck::LoginRequired { class, .. } => assert_eq!(class, FailureClass::Auth),
        other => panic!("expected LoginRequired, got {other:?}"),
    }
    assert_eq!(store.get().await, TokenPair::empty());
    assert!(stack.session.user_profile().await.is_none());
}

#[tokio::test]
async fn refresh_5xx_is_transient_and_keeps_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (stack, store) = stack_with_tokens(&server.uri(), "A1", "R1").await;
    assert!(matches!(
        stack.session.check_auth().await,
        AuthCheck::Unavailable { .. }
    ));
    assert_eq!(store.get().await, TokenPair::new("A1", "R1"));
}

#[tokio::test]
async fn expired_access_token_is_refreshed_then_profile_rechecked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A2", "R2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(7)))
        .expect(1)
        .mount(&server)
        .await;

    let (stack, store) = stack_with_tokens(&server.uri(), "A1", "R1").await;
    let check = stack.session.check_auth().await;
    match check {
        AuthCheck::Authenticated(profile) => assert_eq!(profile.id, 7),
        other => panic!("expected Authenticated, got {other:?}"),
    }
    assert_eq!(store.get().await, TokenPair::new("A2", "R2"));
}

/// Store stuck with an access token but no refresh token — the shape a
/// corrupt or partially-migrated persistence layer could surface.
#[derive(Default)]
struct AccessOnlyStore;

#[async_trait::async_trait]
impl vitrine::auth::TokenStore for AccessOnlyStore {
    async fn save(&self, _access: &str, _refresh: &str) -> Result<(), vitrine::auth::StorageError> {
        Ok(())
    }

    async fn get(&self) -> TokenPair {
        TokenPair {
            access_token: Some("A1".to_string()),
            refresh_token: None,
        }
    }

    async fn clear(&self) {}
}

#[tokio::test]
async fn missing_refresh_token_requires_login_without_refresh_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let stack = vitrine::auth::AuthStack::new(
        common::test_config(&server.uri()),
        std::sync::Arc::new(AccessOnlyStore),
    );
    match stack.session.check_auth().await {
        AuthCheck::LoginRequired { class, .. } => assert_eq!(class, FailureClass::Auth),
        other => panic!("expected LoginRequired, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_profile_payload_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "email": "x" } })))
        .mount(&server)
        .await;

    let (stack, store) = stack_with_tokens(&server.uri(), "A1", "R1").await;
    assert!(matches!(
        stack.session.check_auth().await,
        AuthCheck::Unavailable { .. }
    ));
    assert_eq!(store.get().await, TokenPair::new("A1", "R1"));
}

#[tokio::test]
async fn force_reload_bypasses_a_fresh_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(7)))
        .expect(2)
        .mount(&server)
        .await;

    let (stack, _store) = stack_with_tokens(&server.uri(), "A1", "R1").await;
    assert!(stack.session.check_auth().await.is_authenticated());
    // Within the TTL a plain check stays on the cache; a forced reload does
    // a full round-trip.
    assert!(stack.session.force_reload().await.is_authenticated());
}
