//! Processed entity cache records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::ResolvedEntity;
use crate::resource::ResourceId;
use crate::vocabulary::VocabularyId;

/// One row of the processed entity cache.
///
/// At most one row exists per resource id; writes are upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntity {
    /// Unique key of the row.
    pub resource_id: ResourceId,

    /// Normalized payload. `None` records that the entity was retrieved but
    /// no vocabulary transformation accepted it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,

    /// Vocabulary whose transformation produced the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary_id: Option<VocabularyId>,

    /// When the row was written.
    pub cached_at: DateTime<Utc>,
}

impl CachedEntity {
    /// Creates a cache row for a successfully transformed entity.
    #[must_use]
    pub fn resolved(
        resource_id: ResourceId,
        payload: impl Into<String>,
        vocabulary_id: VocabularyId,
    ) -> Self {
        Self {
            resource_id,
            payload: Some(payload.into()),
            vocabulary_id: Some(vocabulary_id),
            cached_at: Utc::now(),
        }
    }

    /// Creates a negative cache row: retrieved, but no transformation matched.
    #[must_use]
    pub fn unmatched(resource_id: ResourceId) -> Self {
        Self {
            resource_id,
            payload: None,
            vocabulary_id: None,
            cached_at: Utc::now(),
        }
    }

    /// The payload, if it is non-blank.
    #[must_use]
    pub fn usable_payload(&self) -> Option<&str> {
        self.payload.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Returns true if this row records a failed transformation.
    #[must_use]
    pub fn is_unmatched(&self) -> bool {
        self.payload.is_none() && self.vocabulary_id.is_none()
    }
}

/// Outcome of resolving a single resource id.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The entity was resolved, from cache or freshly.
    Resolved(ResolvedEntity),
    /// No vocabulary claims the id, or no retrieval produced a representation.
    NotFound,
    /// A raw representation was retrieved but no candidate transformation
    /// produced a normalized payload.
    NoMatchingTransformation,
}

impl Resolution {
    /// Returns the entity if resolved.
    #[must_use]
    pub fn into_entity(self) -> Option<ResolvedEntity> {
        match self {
            Self::Resolved(entity) => Some(entity),
            Self::NotFound | Self::NoMatchingTransformation => None,
        }
    }

    /// Returns true if the entity was resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}
