//! Persistent last-known-good tier storage.
//!
//! Backends may fail at any time (private browsing, quota, read-only disks).
//! [`GuardedTierStore`] absorbs those failures, panics included, and keeps the
//! session running on an in-memory copy.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use site_guard_core::PerformanceTier;
use thiserror::Error;

/// Current on-disk record version.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Tier persistence backend.
pub trait TierStore: Send + Sync {
    /// Reads the stored tier, `None` when nothing was saved.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend cannot be read.
    fn load(&self) -> Result<Option<PerformanceTier>, StoreError>;

    /// Persists `tier`.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend cannot be written.
    fn save(&self, tier: PerformanceTier) -> Result<(), StoreError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryTierStore {
    tier: Mutex<Option<PerformanceTier>>,
}

impl MemoryTierStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TierStore for MemoryTierStore {
    fn load(&self) -> Result<Option<PerformanceTier>, StoreError> {
        let tier = self
            .tier
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(*tier)
    }

    fn save(&self, tier: PerformanceTier) -> Result<(), StoreError> {
        let mut stored = self
            .tier
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        *stored = Some(tier);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTier {
    version: u32,
    tier: PerformanceTier,
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileTierStore {
    path: PathBuf,
}

impl FileTierStore {
    /// Store backed by the file at `path`; parent directories are created on save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TierStore for FileTierStore {
    fn load(&self) -> Result<Option<PerformanceTier>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&self.path)?;
        let record: StoredTier = serde_json::from_slice(&raw)?;
        if record.version != STORE_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion(record.version));
        }
        Ok(Some(record.tier))
    }

    fn save(&self, tier: PerformanceTier) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let encoded = serde_json::to_vec(&StoredTier {
            version: STORE_FORMAT_VERSION,
            tier,
        })?;
        fs::write(&self.path, encoded)?;
        Ok(())
    }
}

/// Failure-absorbing wrapper around a [`TierStore`].
///
/// After the first backend error or panic the wrapper stops touching the
/// backend and serves the in-memory copy for the rest of the session.
pub struct GuardedTierStore {
    backend: Box<dyn TierStore>,
    memory: MemoryTierStore,
    degraded: AtomicBool,
}

impl GuardedTierStore {
    /// Wraps `backend`.
    pub fn new(backend: impl TierStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            memory: MemoryTierStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Memory-only store.
    pub fn in_memory() -> Self {
        Self::new(MemoryTierStore::new())
    }

    /// Returns `true` once the backend has been abandoned.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Reads the stored tier; backend failures yield the in-memory copy.
    pub fn load(&self) -> Option<PerformanceTier> {
        if !self.is_degraded() {
            match panic::catch_unwind(AssertUnwindSafe(|| self.backend.load())) {
                Ok(Ok(tier)) => return tier.or_else(|| self.memory_tier()),
                Ok(Err(error)) => self.degrade(&error.to_string()),
                Err(_) => self.degrade("backend panicked on load"),
            }
        }
        self.memory_tier()
    }

    /// Persists `tier` on a best-effort basis.
    ///
    /// Returns `true` when the backend accepted the write.
    pub fn save(&self, tier: PerformanceTier) -> bool {
        // The memory copy never fails unless its lock is poisoned.
        let _ = self.memory.save(tier);
        if self.is_degraded() {
            return false;
        }
        match panic::catch_unwind(AssertUnwindSafe(|| self.backend.save(tier))) {
            Ok(Ok(())) => true,
            Ok(Err(error)) => {
                self.degrade(&error.to_string());
                false
            }
            Err(_) => {
                self.degrade("backend panicked on save");
                false
            }
        }
    }

    fn memory_tier(&self) -> Option<PerformanceTier> {
        self.memory.load().ok().flatten()
    }

    fn degrade(&self, reason: &str) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            tracing::warn!(reason, "tier store unavailable; continuing in memory");
        }
    }
}

impl Default for GuardedTierStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for GuardedTierStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedTierStore")
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}

/// Tier store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("tier store io failure: {0}")]
    Io(#[from] std::io::Error),
    /// Stored record is not valid JSON.
    #[error("tier store record is corrupt: {0}")]
    Codec(#[from] serde_json::Error),
    /// Record written by an unknown format version.
    #[error("unsupported tier store version {0}")]
    UnsupportedVersion(u32),
    /// Backend refused access.
    #[error("tier store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingStore;

    impl TierStore for PanickingStore {
        fn load(&self) -> Result<Option<PerformanceTier>, StoreError> {
            panic!("storage access denied");
        }

        fn save(&self, _tier: PerformanceTier) -> Result<(), StoreError> {
            panic!("storage access denied");
        }
    }

    #[test]
    fn guarded_store_survives_backend_panics() {
        let store = GuardedTierStore::new(PanickingStore);
        assert_eq!(store.load(), None);
        assert!(store.is_degraded());
        assert!(!store.save(PerformanceTier::Low));
        assert_eq!(store.load(), Some(PerformanceTier::Low));
    }

    #[test]
    fn memory_store_round_trips_latest_tier() {
        let store = MemoryTierStore::new();
        assert_eq!(store.load().expect("load"), None);
        store.save(PerformanceTier::Medium).expect("save");
        store.save(PerformanceTier::Low).expect("save");
        assert_eq!(store.load().expect("load"), Some(PerformanceTier::Low));
    }
}
