//! File-backed processed entity cache.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use crate::cache::CachedEntity;
use crate::resource::ResourceId;
use crate::storage::traits::{EntityCacheStore, StorageError};

use super::file_lock::FileLock;
use super::log::{CacheLog, LogEntry, LogOp};
use super::PersistentCacheConfig;

const LOG_FILE: &str = "cache.log";

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn io_err(context: &str, e: &std::io::Error) -> StorageError {
    StorageError::BackendError(format!("{context}: {e}"))
}

/// Processed entity cache persisted as an append-only log.
///
/// Rows live in memory; every write is appended to the log before it becomes
/// visible. The log is replayed on open and compacted once it grows past
/// `max_log_size`. The directory is locked for the lifetime of the cache.
#[derive(Debug)]
pub struct PersistentEntityCache {
    dir: PathBuf,
    _lock: FileLock,
    config: PersistentCacheConfig,
    rows: RwLock<HashMap<ResourceId, CachedEntity>>,
    log: Mutex<CacheLog>,
}

impl PersistentEntityCache {
    /// Opens or creates the cache in `dir`.
    ///
    /// # Errors
    ///
    /// `BackendError` if the directory cannot be created or locked, or if
    /// the log is corrupt.
    pub fn open(dir: &Path, config: PersistentCacheConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|e| io_err("failed to create cache directory", &e))?;
        let lock = FileLock::acquire(dir).map_err(|e| io_err("failed to lock cache directory", &e))?;
        let (log, entries) = CacheLog::open(&dir.join(LOG_FILE), config.sync_on_write)
            .map_err(|e| io_err("failed to open cache log", &e))?;

        let replayed = entries.len();
        let rows = replay(entries);
        if replayed > 0 {
            tracing::info!(dir = %dir.display(), replayed, rows = rows.len(), "replayed cache log");
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock: lock,
            config,
            rows: RwLock::new(rows),
            log: Mutex::new(log),
        })
    }

    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current log size in bytes.
    ///
    /// # Errors
    ///
    /// `BackendError` if the log file cannot be inspected.
    pub fn log_size(&self) -> Result<u64, StorageError> {
        let log = self.log.lock().map_err(|_| lock_err("cache.log_size"))?;
        log.size_bytes().map_err(|e| io_err("failed to stat cache log", &e))
    }

    /// Rewrites the log to hold only the live rows.
    ///
    /// # Errors
    ///
    /// `BackendError` on I/O failure; the previous log stays in place.
    pub fn compact(&self) -> Result<(), StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("cache.compact"))?;
        let mut log = self.log.lock().map_err(|_| lock_err("cache.compact"))?;
        Self::compact_locked(&rows, &mut log)
    }

    fn compact_locked(
        rows: &HashMap<ResourceId, CachedEntity>,
        log: &mut CacheLog,
    ) -> Result<(), StorageError> {
        let before = log.size_bytes().unwrap_or(0);
        log.rewrite(rows.values())
            .map_err(|e| io_err("failed to compact cache log", &e))?;
        tracing::debug!(before, after = log.size_bytes().unwrap_or(0), rows = rows.len(), "compacted cache log");
        Ok(())
    }

    /// Appends `op` while the caller holds the row lock.
    fn append(&self, rows: &HashMap<ResourceId, CachedEntity>, op: LogOp) -> Result<(), StorageError> {
        let mut log = self.log.lock().map_err(|_| lock_err("cache.append"))?;
        log.append(op).map_err(|e| io_err("failed to append to cache log", &e))?;

        // The entry is in the log from here on; nothing below may fail the write.
        match log.size_bytes() {
            Ok(size) if size > self.config.max_log_size => {
                if let Err(e) = Self::compact_locked(rows, &mut log) {
                    tracing::warn!(error = %e, "cache log compaction failed");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to stat cache log; skipping compaction check"),
        }
        Ok(())
    }

    fn write_row(&self, entity: CachedEntity, reject_existing: bool) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("cache.write"))?;
        if reject_existing && rows.contains_key(&entity.resource_id) {
            return Err(StorageError::DuplicateKey(entity.resource_id.to_string()));
        }
        let previous = rows.insert(entity.resource_id.clone(), entity.clone());
        if let Err(e) = self.append(&rows, LogOp::Upsert(entity.clone())) {
            match previous {
                Some(previous) => rows.insert(entity.resource_id, previous),
                None => rows.remove(&entity.resource_id),
            };
            return Err(e);
        }
        Ok(())
    }
}

fn replay(entries: Vec<LogEntry>) -> HashMap<ResourceId, CachedEntity> {
    let mut rows = HashMap::new();
    for entry in entries {
        match entry.op {
            LogOp::Upsert(row) => {
                rows.insert(row.resource_id.clone(), row);
            }
            LogOp::Purge => rows.clear(),
        }
    }
    rows
}

impl EntityCacheStore for PersistentEntityCache {
    fn get(&self, resource_id: &ResourceId) -> Result<Option<CachedEntity>, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("cache.get"))?;
        Ok(rows.get(resource_id).cloned())
    }

    fn insert(&self, entity: CachedEntity) -> Result<(), StorageError> {
        self.write_row(entity, true)
    }

    fn upsert(&self, entity: CachedEntity) -> Result<(), StorageError> {
        self.write_row(entity, false)
    }

    fn purge_all(&self) -> Result<usize, StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("cache.purge_all"))?;
        let removed = rows.len();
        let empty = HashMap::new();
        self.append(&empty, LogOp::Purge)?;
        rows.clear();
        Ok(removed)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("cache.len"))?;
        Ok(rows.len())
    }
}
