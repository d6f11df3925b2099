//! Durable key-value storage for the ledger and the current session.
//!
//! Two slots are used: [`SESSION_KEY`] and [`LEDGER_KEY`]. Backends are
//! synchronous; values are opaque bytes (JSON in practice).

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Slot holding the current session projection.
pub const SESSION_KEY: &str = "current-session";

/// Slot holding the registered-account ledger.
pub const LEDGER_KEY: &str = "registered-accounts";

/// Synchronous key-value storage scoped to one user profile.
pub trait KeyValueStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

// ── In-memory backend ───────────────────────────────────────────

/// Process-lifetime storage; nothing touches disk.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

// ── File backend ────────────────────────────────────────────────

/// One `<key>.json` file per slot inside a data directory.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a crash never leaves a half-written slot behind.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (or create) the storage directory.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data dir: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!("Invalid storage key '{key}'");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temp file in {}", self.dir.display()))?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get(SESSION_KEY).unwrap().is_none());

        store.set(SESSION_KEY, b"{}").unwrap();
        assert_eq!(store.get(SESSION_KEY).unwrap().as_deref(), Some(&b"{}"[..]));

        store.remove(SESSION_KEY).unwrap();
        assert!(store.get(SESSION_KEY).unwrap().is_none());
        store.remove(SESSION_KEY).unwrap();
    }

    #[test]
    fn file_store_persists_across_instances() {
        let tmp = TempDir::new().unwrap();
        let first = FileStore::new(tmp.path()).unwrap();
        first.set(LEDGER_KEY, b"[]").unwrap();

        let second = FileStore::new(tmp.path()).unwrap();
        assert_eq!(second.get(LEDGER_KEY).unwrap().as_deref(), Some(&b"[]"[..]));
        assert!(tmp.path().join("registered-accounts.json").exists());
    }

    #[test]
    fn file_store_overwrites_existing_slot() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path()).unwrap();
        store.set(SESSION_KEY, b"old").unwrap();
        store.set(SESSION_KEY, b"new").unwrap();
        assert_eq!(store.get(SESSION_KEY).unwrap().as_deref(), Some(&b"new"[..]));
    }

    #[test]
    fn file_store_remove_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path()).unwrap();
        store.remove(SESSION_KEY).unwrap();
        assert!(store.get(SESSION_KEY).unwrap().is_none());
    }

    #[test]
    fn file_store_creates_nested_dir() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        let store = FileStore::new(&nested).unwrap();
        store.set(SESSION_KEY, b"x").unwrap();
        assert!(nested.join("current-session.json").exists());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path()).unwrap();
        let err = store.set("../escape", b"x").unwrap_err();
        assert!(err.to_string().contains("Invalid storage key"));
        assert!(store.get("").is_err());
    }
}
