//! Credential storage.
//!
//! [`CredentialStore`] is the only way the request guard touches tokens.
//! Two implementations are provided: an in-memory store for a single process
//! and a JSON file store that survives restarts (used by the CLI).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::Credentials;

/// Access to the session's access and refresh tokens.
///
/// Implementations are shared between concurrent requests, so every method
/// takes `&self`.
pub trait CredentialStore: Send + Sync {
    /// Current access token, if logged in.
    fn access_token(&self) -> Option<String>;

    /// Current refresh token, if one was issued.
    fn refresh_token(&self) -> Option<String>;

    /// Replace the access token, keeping the refresh token.
    fn set_access_token(&self, token: String);

    /// Store a full set of credentials (after login).
    fn set_credentials(&self, credentials: Credentials);

    /// Forget all credentials.
    fn clear(&self);
}

/// In-process credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Option<Credentials>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding credentials.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        read(&self.inner)
            .as_ref()
            .map(|c| c.access.clone())
            .filter(|t| !t.is_empty())
    }

    fn refresh_token(&self) -> Option<String> {
        read(&self.inner)
            .as_ref()
            .and_then(|c| c.refresh.clone())
            .filter(|t| !t.is_empty())
    }

    fn set_access_token(&self, token: String) {
        replace_access(&mut write(&self.inner), token);
    }

    fn set_credentials(&self, credentials: Credentials) {
        *write(&self.inner) = Some(credentials);
    }

    fn clear(&self) {
        *write(&self.inner) = None;
    }
}

/// Credential store persisted as JSON on disk.
///
/// The file is rewritten on every change. A missing or unreadable file is
/// treated as "logged out"; write failures are logged, and the in-memory
/// copy stays authoritative for the rest of the process.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cache: MemoryCredentialStore,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading any credentials already saved there.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let cache = match load(&path) {
            Some(creds) => MemoryCredentialStore::with_credentials(creds),
            None => MemoryCredentialStore::new(),
        };
        Self { path, cache }
    }

    /// Location of the credentials file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` and write the result to disk under the same lock, so
    /// the file always matches the last in-memory change.
    fn update(&self, change: impl FnOnce(&mut Option<Credentials>)) {
        let mut guard = write(&self.cache.inner);
        change(&mut guard);
        let result = match guard.as_ref() {
            Some(creds) => save(&self.path, creds),
            None => remove(&self.path),
        };
        if let Err(e) = result {
            warn!("Failed to persist credentials to {}: {}", self.path.display(), e);
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.cache.access_token()
    }

    fn refresh_token(&self) -> Option<String> {
        self.cache.refresh_token()
    }

    fn set_access_token(&self, token: String) {
        self.update(|creds| replace_access(creds, token));
    }

    fn set_credentials(&self, credentials: Credentials) {
        self.update(|creds| *creds = Some(credentials));
    }

    fn clear(&self) {
        self.update(|creds| *creds = None);
    }
}

fn replace_access(creds: &mut Option<Credentials>, token: String) {
    match creds.as_mut() {
        Some(creds) => creds.access = token,
        None => *creds = Some(Credentials::new(token, None)),
    }
}

fn load(path: &Path) -> Option<Credentials> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            debug!("No credentials at {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(creds) => Some(creds),
        Err(e) => {
            warn!("Ignoring corrupt credentials file {}: {}", path.display(), e);
            None
        }
    }
}

fn save(path: &Path, creds: &Credentials) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(creds)?)?;
    Ok(())
}

fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

// A panic while holding the lock cannot leave a half-written token behind.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn creds() -> Credentials {
        Credentials::new("access-1", Some("refresh-1".to_string()))
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.access_token(), None);

        store.set_credentials(creds());
        assert_eq!(store.access_token().as_deref(), Some("access-1"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));

        store.set_access_token("access-2".to_string());
        assert_eq!(store.access_token().as_deref(), Some("access-2"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));

        store.clear();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn test_empty_tokens_read_as_absent() {
        let store = MemoryCredentialStore::with_credentials(Credentials::new(
            "",
            Some(String::new()),
        ));
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::open(&path);
        assert_eq!(store.access_token(), None);
        store.set_credentials(creds());
        store.set_access_token("access-2".to_string());
        assert!(path.exists());

        let reopened = FileCredentialStore::open(&path);
        assert_eq!(reopened.access_token().as_deref(), Some("access-2"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("refresh-1"));

        reopened.clear();
        assert!(!path.exists());
        assert_eq!(FileCredentialStore::open(&path).access_token(), None);
    }

    #[test]
    fn test_file_store_matches_memory_under_contention() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = Arc::new(FileCredentialStore::open(&path));
        store.set_credentials(creds());

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for round in 0..50 {
                        if (worker + round) % 2 == 0 {
                            store.set_access_token(format!("access-{worker}-{round}"));
                        } else {
                            store.clear();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = FileCredentialStore::open(&path);
        assert_eq!(reopened.access_token(), store.access_token());
        assert_eq!(reopened.refresh_token(), store.refresh_token());
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::open(&path);
        assert_eq!(store.access_token(), None);
    }
}
