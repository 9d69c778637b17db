//! Abstract storage traits for the dereferencer.
//!
//! These traits define the contract that storage backends must implement.
//! By using traits, we enable:
//! - In-memory backends for testing and embedded use
//! - The file-backed processed entity cache (`persistent` feature)
//! - Document-store adapters living outside this crate

use thiserror::Error;

use crate::cache::CachedEntity;
use crate::entity::EntityKind;
use crate::hierarchy::HierarchyTerm;
use crate::resource::ResourceId;
use crate::vocabulary::{VocabularyDefinition, VocabularyId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Vocabulary not found.
    #[error("Vocabulary not found: {0}")]
    VocabularyNotFound(VocabularyId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Connection failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Storage trait for vocabulary definitions.
pub trait VocabularyStore: Send + Sync {
    /// Insert a vocabulary. Returns error if the ID already exists.
    fn insert(&self, vocabulary: VocabularyDefinition) -> Result<(), StorageError>;

    /// Get a vocabulary by ID.
    fn get_by_id(&self, id: &VocabularyId) -> Result<Option<VocabularyDefinition>, StorageError>;

    /// Find vocabularies that may claim `uri`, in declaration order.
    ///
    /// Backends may over-approximate; callers filter with each vocabulary's
    /// own rule.
    fn find_by_uri_match(&self, uri: &str) -> Result<Vec<VocabularyDefinition>, StorageError>;

    /// All vocabularies, in declaration order.
    fn list(&self) -> Result<Vec<VocabularyDefinition>, StorageError>;
}

/// Storage trait for the processed entity cache.
///
/// # Safety Considerations
/// - At most one row per resource id
/// - `insert` must fail with `DuplicateKey` when a row already exists, so that
///   concurrent first writers converge on one stored value
pub trait EntityCacheStore: Send + Sync {
    /// Get the cached row for a resource id.
    fn get(&self, resource_id: &ResourceId) -> Result<Option<CachedEntity>, StorageError>;

    /// Insert a new row. Returns `DuplicateKey` if one exists.
    fn insert(&self, entity: CachedEntity) -> Result<(), StorageError>;

    /// Insert or replace the row for the entity's resource id.
    fn upsert(&self, entity: CachedEntity) -> Result<(), StorageError>;

    /// Remove every row, returning how many were removed.
    fn purge_all(&self) -> Result<usize, StorageError>;

    /// Number of cached rows.
    fn len(&self) -> Result<usize, StorageError>;

    /// Returns true if the cache holds no rows.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// Storage trait for hierarchy terms used by label matching.
pub trait TermStore: Send + Sync {
    /// Insert or replace a term keyed by its code URI.
    fn upsert(&self, term: HierarchyTerm) -> Result<(), StorageError>;

    /// Get a term by code URI.
    fn get_by_code_uri(&self, code_uri: &str) -> Result<Option<HierarchyTerm>, StorageError>;

    /// Get all terms whose code URI is in `code_uris`.
    fn find_by_code_uris(&self, code_uris: &[ResourceId]) -> Result<Vec<HierarchyTerm>, StorageError>;

    /// Find terms with a label equal (case-insensitively) to `label`.
    ///
    /// With `language`, only labels in that language are considered.
    fn find_by_label(
        &self,
        label: &str,
        language: Option<&str>,
        kind: EntityKind,
    ) -> Result<Vec<HierarchyTerm>, StorageError>;

    /// Find terms that declare `uri` as `owl:sameAs`.
    fn find_by_same_as(&self, uri: &str) -> Result<Vec<HierarchyTerm>, StorageError>;
}
