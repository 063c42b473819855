use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::FailureClass;

use super::gateway::{ApiRequest, AuthGateway};
use super::identity::UserProfile;
use super::refresh::RefreshCoordinator;
use super::store::TokenStore;

/// Path of the profile-check endpoint (POST, per the backend's convention).
pub const PROFILE_PATH: &str = "/auth/profile";

/// How long a fetched identity is trusted without a network round-trip.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Outcome of a session check. The resolver never fails with an error value:
/// every path resolves to one of these, so screens branch without `try`.
#[derive(Debug, Clone)]
pub enum AuthCheck {
    /// Valid session; the identity is fresh (cache or network).
    Authenticated(UserProfile),
    /// The credential is gone or invalid beyond recovery; persisted tokens
    /// and the cached identity have been cleared.
    LoginRequired {
        class: FailureClass,
        detail: String,
    },
    /// Transient failure (network, timeout, backend 5xx). Tokens and cache
    /// are left untouched; retrying later may succeed.
    Unavailable { detail: String },
}

impl AuthCheck {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn needs_login(&self) -> bool {
        matches!(self, Self::LoginRequired { .. })
    }
}

#[derive(Debug, Clone)]
struct CachedIdentity {
    profile: UserProfile,
    fetched_at: Instant,
}

/// Session cache sitting above the gateway.
///
/// Answers "is the user authenticated, and who are they" from a 5-minute
/// in-memory cache when possible, and otherwise walks the
/// profile-check → refresh → re-check ladder, classifying every failure as
/// transient or terminal. The key property: a network outage never evicts a
/// valid session — only auth-class failures clear tokens and cache.
pub struct SessionResolver {
    gateway: Arc<AuthGateway>,
    store: Arc<dyn TokenStore>,
    refresher: Arc<RefreshCoordinator>,
    cache: Mutex<Option<CachedIdentity>>,
    ttl: Duration,
}

impl SessionResolver {
    pub fn new(
        gateway: Arc<AuthGateway>,
        store: Arc<dyn TokenStore>,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            gateway,
            store,
            refresher,
            cache: Mutex::new(None),
            ttl: CACHE_TTL,
        }
    }

    /// Override the cache TTL (tests).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Check the session, preferring the cache inside the TTL window.
    pub async fn check_auth(&self) -> AuthCheck {
        if let Some(profile) = self.fresh_cached() {
            tracing::debug!("session check served from cache");
            return AuthCheck::Authenticated(profile);
        }

        let pair = self.store.get().await;
        if pair.access_token.is_none() {
            return self
                .login_required(FailureClass::Auth, "no access token stored")
                .await;
        }

        // Profile check with the current access token. max_retries(0): the
        // resolver owns refresh classification, not the gateway.
        match self.fetch_profile().await {
            ProfileFetch::Ok(profile) => {
                self.store_cache(profile.clone());
                return AuthCheck::Authenticated(profile);
            }
            ProfileFetch::Transient(detail) => {
                return AuthCheck::Unavailable { detail };
            }
            ProfileFetch::Rejected(_) => {
                // Access token expired; fall through to refresh.
            }
        }

        if pair.refresh_token.is_none() {
            return self
                .login_required(FailureClass::Auth, "no refresh token stored")
                .await;
        }

        match self.refresher.refresh().await {
            Ok(_) => match self.fetch_profile().await {
                ProfileFetch::Ok(profile) => {
                    self.store_cache(profile.clone());
                    AuthCheck::Authenticated(profile)
                }
                ProfileFetch::Transient(detail) => AuthCheck::Unavailable { detail },
                ProfileFetch::Rejected(status) => {
                    // A just-minted token was rejected; fail closed.
                    self.login_required(
                        FailureClass::Unknown,
                        format!("fresh token rejected with status {status}"),
                    )
                    .await
                }
            },
            Err(err) => match err.class() {
                FailureClass::Network => {
                    tracing::debug!(error = %err, "refresh failed transiently, session kept");
                    AuthCheck::Unavailable {
                        detail: err.to_string(),
                    }
                }
                class => self.login_required(class, err.to_string()).await,
            },
        }
    }

    /// The current identity, tolerating staleness: a fresh cache or network
    /// fetch when possible, the stale cache across transient failures, and
    /// `None` only when there is nothing to serve or login is required.
    pub async fn user_profile(&self) -> Option<UserProfile> {
        if let Some(profile) = self.fresh_cached() {
            return Some(profile);
        }
        match self.check_auth().await {
            AuthCheck::Authenticated(profile) => Some(profile),
            AuthCheck::Unavailable { .. } => self.any_cached(),
            AuthCheck::LoginRequired { .. } => None,
        }
    }

    /// Drop the cache and re-check — for actions known to change the
    /// identity (binding an email, accepting seller terms).
    pub async fn force_reload(&self) -> AuthCheck {
        self.clear_cache();
        self.check_auth().await
    }

    /// Drop the cached identity. The resolver stays fully usable; invoked on
    /// logout alongside clearing the token store.
    pub fn clear_cache(&self) {
        if let Ok(mut guard) = self.cache.lock() {
            *guard = None;
        }
    }

    async fn login_required(&self, class: FailureClass, detail: impl Into<String>) -> AuthCheck {
        self.store.clear().await;
        self.clear_cache();
        AuthCheck::LoginRequired {
            class,
            detail: detail.into(),
        }
    }

    async fn fetch_profile(&self) -> ProfileFetch {
        let request = ApiRequest::post(PROFILE_PATH)
            .max_retries(0)
            .keep_tokens_on_refresh_failure();
        let response = match self.gateway.send(request).await {
            Ok(response) => response,
            Err(err) => return ProfileFetch::Transient(err.to_string()),
        };
        let status = response.status();
        if !status.is_success() {
            return ProfileFetch::Rejected(status.as_u16());
        }
        let payload: serde_json::Value = match response.json().await {
            Ok(payload) => payload,
            Err(err) => return ProfileFetch::Transient(err.to_string()),
        };
        match UserProfile::from_envelope(&payload) {
            Some(profile) => ProfileFetch::Ok(profile),
            None => ProfileFetch::Transient("profile payload not recognized".to_string()),
        }
    }

    fn fresh_cached(&self) -> Option<UserProfile> {
        let guard = self.cache.lock().ok()?;
        let cached = guard.as_ref()?;
        if cached.fetched_at.elapsed() < self.ttl {
            Some(cached.profile.clone())
        } else {
            None
        }
    }

    fn any_cached(&self) -> Option<UserProfile> {
        let guard = self.cache.lock().ok()?;
        guard.as_ref().map(|cached| cached.profile.clone())
    }

    fn store_cache(&self, profile: UserProfile) {
        if let Ok(mut guard) = self.cache.lock() {
            *guard = Some(CachedIdentity {
                profile,
                fetched_at: Instant::now(),
            });
        }
    }
}

enum ProfileFetch {
    Ok(UserProfile),
    /// Network-class: transport failure, timeout, or an unreadable 200.
    Transient(String),
    /// The server answered with a non-2xx status.
    Rejected(u16),
}
