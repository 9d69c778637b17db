//! Dereferencing configuration.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Tuning for [`DereferenceService`](crate::service::DereferenceService).
///
/// Immutable and always valid: every constructor, deserialization included,
/// goes through [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDereferenceConfig")]
pub struct DereferenceConfig {
    expansion_workers: usize,
    max_expansion_depth: u32,
    batch_size: usize,
    cache_unmatched: bool,
}

/// Unchecked wire form; missing fields take defaults.
#[derive(Deserialize)]
#[serde(default)]
struct RawDereferenceConfig {
    expansion_workers: usize,
    max_expansion_depth: u32,
    batch_size: usize,
    cache_unmatched: bool,
}

impl Default for RawDereferenceConfig {
    fn default() -> Self {
        let DereferenceConfig {
            expansion_workers,
            max_expansion_depth,
            batch_size,
            cache_unmatched,
        } = DereferenceConfig::default();
        Self {
            expansion_workers,
            max_expansion_depth,
            batch_size,
            cache_unmatched,
        }
    }
}

impl TryFrom<RawDereferenceConfig> for DereferenceConfig {
    type Error = ValidationError;

    fn try_from(raw: RawDereferenceConfig) -> Result<Self, Self::Error> {
        Self {
            expansion_workers: raw.expansion_workers,
            max_expansion_depth: raw.max_expansion_depth,
            batch_size: raw.batch_size,
            cache_unmatched: raw.cache_unmatched,
        }
        .validate()
    }
}

impl Default for DereferenceConfig {
    fn default() -> Self {
        Self {
            expansion_workers: 1,
            max_expansion_depth: 10,
            batch_size: 100,
            cache_unmatched: false,
        }
    }
}

impl DereferenceConfig {
    const MIN_WORKERS: usize = 1;
    const MIN_BATCH_SIZE: usize = 1;

    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// `ValidationError::SettingTooSmall` if `expansion_workers` or
    /// `batch_size` is zero.
    pub fn new(
        expansion_workers: usize,
        max_expansion_depth: u32,
        batch_size: usize,
    ) -> Result<Self, ValidationError> {
        Self {
            expansion_workers,
            max_expansion_depth,
            batch_size,
            ..Self::default()
        }
        .validate()
    }

    /// Parses and validates a JSON configuration. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// `ValidationError::InvalidConfig` on malformed JSON, otherwise as
    /// [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let raw: RawDereferenceConfig =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
                reason: e.to_string(),
            })?;
        Self::try_from(raw)
    }

    /// Enables or disables negative caching.
    #[must_use]
    pub const fn with_unmatched_caching(mut self, enabled: bool) -> Self {
        self.cache_unmatched = enabled;
        self
    }

    /// Threads resolving one expansion level. 1 resolves on the caller's thread.
    #[must_use]
    pub const fn expansion_workers(&self) -> usize {
        self.expansion_workers
    }

    /// Hard cap applied on top of each vocabulary's iteration depth.
    #[must_use]
    pub const fn max_expansion_depth(&self) -> u32 {
        self.max_expansion_depth
    }

    /// Ids handled per chunk by `dereference_many`.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whether ids no transformation accepted are remembered.
    #[must_use]
    pub const fn cache_unmatched(&self) -> bool {
        self.cache_unmatched
    }

    /// Checks every bound.
    ///
    /// # Errors
    ///
    /// `ValidationError::SettingTooSmall` naming the first offending field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        check_min("expansion_workers", self.expansion_workers, Self::MIN_WORKERS)?;
        check_min("batch_size", self.batch_size, Self::MIN_BATCH_SIZE)?;
        Ok(self)
    }

    /// The effective expansion depth for a vocabulary's iteration count.
    #[must_use]
    pub fn effective_depth(&self, iterations: u32) -> usize {
        iterations.min(self.max_expansion_depth) as usize
    }
}

fn check_min(field: &str, actual: usize, min: usize) -> Result<(), ValidationError> {
    if actual < min {
        return Err(ValidationError::SettingTooSmall {
            field: field.to_string(),
            min: min as u64,
            actual: actual as u64,
        });
    }
    Ok(())
}
