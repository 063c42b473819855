//! Session lifecycle: token persistence, refresh, gateway, resolver.

pub mod account;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod refresh;
pub mod session;
pub mod store;
pub mod token;

pub use account::{AccountService, Credentials};
pub use error::{AccountError, RefreshError, StorageError};
pub use gateway::{ApiRequest, AuthGateway};
pub use identity::UserProfile;
pub use refresh::RefreshCoordinator;
pub use session::{AuthCheck, SessionResolver};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreConfig};
pub use token::TokenPair;

use std::sync::Arc;

use crate::config::ApiConfig;

/// Composition root for the auth subsystem.
///
/// One shared HTTP client, one refresh coordinator, and the three services
/// wired around an injected store. The refresh handle and identity cache
/// are process-wide singletons *within* a stack — build one stack per
/// process, or one per test case for isolation.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use vitrine::auth::{AuthStack, FileTokenStore};
/// use vitrine::config::ApiConfig;
///
/// let config = ApiConfig::new("https://api.example.shop");
/// let stack = AuthStack::new(config, Arc::new(FileTokenStore::new_default()));
/// ```
pub struct AuthStack {
    pub gateway: Arc<AuthGateway>,
    pub session: Arc<SessionResolver>,
    pub accounts: AccountService,
}

impl AuthStack {
    pub fn new(config: ApiConfig, store: Arc<dyn TokenStore>) -> Self {
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
        let session = Arc::new(SessionResolver::new(
            gateway.clone(),
            store.clone(),
            refresher,
        ));
        let accounts = AccountService::new(gateway.clone(), store, session.clone());
        Self {
            gateway,
            session,
            accounts,
        }
    }
}
