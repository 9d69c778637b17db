//! File-backed processed entity cache.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │          PersistentEntityCache             │
//! │  rows: RwLock<HashMap<ResourceId, Row>>    │
//! ├────────────────────────────────────────────┤
//! │  CacheLog (append-only, CRC32 records)     │
//! │      ↓ compacted past max_log_size         │
//! │  FileLock (<dir>/.lock)                    │
//! └────────────────────────────────────────────┘
//! ```

mod codec;
mod file_lock;
mod log;
mod store;

pub use file_lock::FileLock;
pub use log::{CacheLog, LogEntry, LogOp};
pub use store::PersistentEntityCache;

use std::path::Path;

use crate::error::{DerefResult, ValidationError};

/// Configuration for the file-backed cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentCacheConfig {
    /// Log size (bytes) past which the log is compacted.
    pub max_log_size: u64,
    /// Whether to fsync after every write.
    pub sync_on_write: bool,
}

impl Default for PersistentCacheConfig {
    fn default() -> Self {
        Self {
            max_log_size: 64 * 1024 * 1024,
            sync_on_write: true,
        }
    }
}

impl PersistentCacheConfig {
    const MIN_LOG_SIZE: u64 = 4 * 1024;

    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// `ValidationError::SettingTooSmall` if `max_log_size` is under 4 KiB.
    pub fn new(max_log_size: u64, sync_on_write: bool) -> Result<Self, ValidationError> {
        Self {
            max_log_size,
            sync_on_write,
        }
        .validate()
    }

    /// Checks every bound.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.max_log_size < Self::MIN_LOG_SIZE {
            return Err(ValidationError::SettingTooSmall {
                field: "max_log_size".to_string(),
                min: Self::MIN_LOG_SIZE,
                actual: self.max_log_size,
            });
        }
        Ok(self)
    }
}

/// Opens or creates a processed entity cache in `path`.
///
/// # Errors
///
/// Fails on an invalid configuration, if the directory cannot be created or
/// is locked by another owner, or if the log is corrupt.
///
/// # Example
/// ```rust,ignore
/// use dereferencer::storage::persistent::open_cache;
///
/// let cache = Arc::new(open_cache("./entity-cache", None)?);
/// let resolver = EntityResolver::new(vocabularies, cache, retriever, TransformerRegistry::new());
/// ```
pub fn open_cache(
    path: impl AsRef<Path>,
    config: Option<PersistentCacheConfig>,
) -> DerefResult<PersistentEntityCache> {
    let config = config.unwrap_or_default().validate()?;
    Ok(PersistentEntityCache::open(path.as_ref(), config)?)
}
