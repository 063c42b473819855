use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StorageError;
use super::token::TokenPair;

/// Durable storage for the session token pair.
///
/// Reads are infallible by contract: absence and read failures both come
/// back as an empty pair, so callers never need a failure path just to ask
/// "am I logged in". Writes replace the whole pair; `clear` is idempotent.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist both tokens as a unit.
    async fn save(&self, access: &str, refresh: &str) -> Result<(), StorageError>;

    /// Read the stored pair; `{None, None}` on absence or any read failure.
    async fn get(&self) -> TokenPair;

    /// Remove the stored pair. Succeeds even when nothing was stored.
    async fn clear(&self);

    /// Whether an access token is currently stored.
    async fn has(&self) -> bool {
        self.get().await.access_token.is_some()
    }
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub base_dir: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_vitrine_dir()
    }
}

/// File-backed token store using a single TOML file.
///
/// The whole pair lives in one file, so a save or clear is atomic with
/// respect to the pair: readers never observe one token without the other.
///
/// # Example
/// ```no_run
/// use vitrine::auth::{FileTokenStore, TokenStore, TokenStoreConfig};
///
/// # async fn example() {
/// let store = FileTokenStore::new_default();
/// store.save("access", "refresh").await.unwrap();
/// assert!(store.has().await);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_vitrine_dir(),
        }
    }

    fn session_path(&self) -> PathBuf {
        self.base_dir.join("session.toml")
    }

    async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, access: &str, refresh: &str) -> Result<(), StorageError> {
        let path = self.session_path();
        Self::ensure_parent(&path).await?;
        let file = SessionFile {
            version: 1,
            tokens: TokenPair::new(access, refresh),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        tokio::fs::write(&path, serialized).await?;
        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, Permissions::from_mode(0o600)).await?;
        }
        Ok(())
    }

    async fn get(&self) -> TokenPair {
        let raw = match tokio::fs::read_to_string(self.session_path()).await {
            Ok(data) => data,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(error = %err, "token store read failed, treating as empty");
                }
                return TokenPair::empty();
            }
        };
        match toml::from_str::<SessionFile>(&raw) {
            Ok(file) => file.tokens,
            Err(err) => {
                tracing::warn!(error = %err, "token store file malformed, treating as empty");
                TokenPair::empty()
            }
        }
    }

    async fn clear(&self) {
        match tokio::fs::remove_file(self.session_path()).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(error = %err, "token store clear failed"),
        }
    }
}

/// In-memory token store for tests and composition roots that do not want
/// disk persistence.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<TokenPair>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, access: &str, refresh: &str) -> Result<(), StorageError> {
        if let Ok(mut guard) = self.tokens.lock() {
            *guard = TokenPair::new(access, refresh);
        }
        Ok(())
    }

    async fn get(&self) -> TokenPair {
        self.tokens
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    async fn clear(&self) {
        if let Ok(mut guard) = self.tokens.lock() {
            *guard = TokenPair::empty();
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    tokens: TokenPair,
    saved_at: DateTime<Utc>,
}

fn default_vitrine_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".vitrine"))
        .unwrap_or_else(|| PathBuf::from(".vitrine"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileTokenStore) {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(TokenStoreConfig::new(dir.path().to_path_buf()));
        (dir, store)
    }

    #[tokio::test]
    async fn save_then_get_returns_both_tokens() {
        let (_dir, store) = temp_store();
        store.save("access", "refresh").await.unwrap();
        let pair = store.get().await;
        assert_eq!(pair.access_token.as_deref(), Some("access"));
        assert_eq!(pair.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn get_on_empty_store_returns_empty_pair() {
        let (_dir, store) = temp_store();
        assert_eq!(store.get().await, TokenPair::empty());
        assert!(!store.has().await);
    }

    #[tokio::test]
    async fn clear_removes_pair_and_is_idempotent() {
        let (_dir, store) = temp_store();
        store.save("access", "refresh").await.unwrap();
        store.clear().await;
        assert_eq!(store.get().await, TokenPair::empty());
        store.clear().await;
    }

    #[tokio::test]
    async fn save_overwrites_previous_pair() {
        let (_dir, store) = temp_store();
        store.save("a1", "r1").await.unwrap();
        store.save("a2", "r2").await.unwrap();
        let pair = store.get().await;
        assert_eq!(pair.access_token.as_deref(), Some("a2"));
        assert_eq!(pair.refresh_token.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn malformed_file_reads_as_empty() {
        let (dir, store) = temp_store();
        tokio::fs::write(dir.path().join("session.toml"), "not really toml {{")
            .await
            .unwrap();
        assert_eq!(store.get().await, TokenPair::empty());
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        store.save("access", "refresh").await.unwrap();
        assert!(store.has().await);
        store.clear().await;
        assert!(!store.has().await);
    }
}
