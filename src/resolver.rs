//! Cache-aside entity resolution.
//!
//! `EntityResolver` turns a resource id into a parsed entity:
//!
//! ```text
//! cache hit with payload + known vocabulary ──────────────────────────┐
//!        │ miss / stale                                               │
//!        ↓                                                            ↓
//! candidates ─→ retrieve (suffix by suffix) ─→ transform (candidate by candidate) ─→ cache write ─→ parse
//! ```
//!
//! Retrieval and transformation failures only move on to the next suffix or
//! candidate. The only fatal failures are storage reads and payload parsing.
//! No locking happens here: concurrent misses on the same id both do the
//! work, and the cache's unique key decides which write is kept.

use std::sync::Arc;

use crate::cache::{CachedEntity, Resolution};
use crate::entity::ResolvedEntity;
use crate::error::{DerefResult, ResolutionError};
use crate::parser::{EntityPayloadParser, JsonPayloadParser};
use crate::resource::ResourceId;
use crate::retrieval::{retrieval_url, RawEntityRetriever};
use crate::storage::{EntityCacheStore, StorageError, VocabularyStore};
use crate::transform::TransformerRegistry;
use crate::vocabulary::{VocabularyCandidates, VocabularyDefinition};

/// Resolves resource ids through the processed entity cache.
pub struct EntityResolver {
    vocabularies: Arc<dyn VocabularyStore>,
    cache: Arc<dyn EntityCacheStore>,
    retriever: Arc<dyn RawEntityRetriever>,
    transformers: TransformerRegistry,
    parser: Arc<dyn EntityPayloadParser>,
    cache_unmatched: bool,
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("transformers", &self.transformers)
            .field("cache_unmatched", &self.cache_unmatched)
            .finish_non_exhaustive()
    }
}

impl EntityResolver {
    /// Creates a resolver parsing the JSON normalized form.
    #[must_use]
    pub fn new(
        vocabularies: Arc<dyn VocabularyStore>,
        cache: Arc<dyn EntityCacheStore>,
        retriever: Arc<dyn RawEntityRetriever>,
        transformers: TransformerRegistry,
    ) -> Self {
        Self {
            vocabularies,
            cache,
            retriever,
            transformers,
            parser: Arc::new(JsonPayloadParser),
            cache_unmatched: false,
        }
    }

    /// Replaces the payload parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn EntityPayloadParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Whether to remember ids whose retrieval succeeded but that no
    /// transformation accepted. Off by default.
    #[must_use]
    pub fn with_unmatched_caching(mut self, enabled: bool) -> Self {
        self.cache_unmatched = enabled;
        self
    }

    /// The vocabulary store backing this resolver.
    #[must_use]
    pub fn vocabularies(&self) -> &Arc<dyn VocabularyStore> {
        &self.vocabularies
    }

    /// Resolves `resource_id`, returning `None` when it cannot be resolved.
    ///
    /// # Errors
    ///
    /// Fails on a storage read failure or an unparsable payload. A blank id
    /// is simply not found.
    pub fn resolve(&self, resource_id: &ResourceId) -> DerefResult<Option<ResolvedEntity>> {
        Ok(self.resolve_outcome(resource_id)?.into_entity())
    }

    /// Resolves `resource_id`, distinguishing why it did not resolve.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn resolve_outcome(&self, resource_id: &ResourceId) -> DerefResult<Resolution> {
        if resource_id.is_blank() {
            return Ok(Resolution::NotFound);
        }

        let cached = self.cache.get(resource_id)?;
        if let Some(row) = &cached {
            if let Some(resolved) = self.from_cache(row)? {
                return Ok(resolved);
            }
        }

        let candidates = VocabularyCandidates::find_for_uri(resource_id.as_str(), |uri| {
            self.vocabularies.find_by_uri_match(uri)
        })?;
        if candidates.is_empty() {
            tracing::debug!(resource_id = %resource_id, "no vocabulary claims resource");
            return Ok(Resolution::NotFound);
        }

        let Some(original) = self.retrieve_original(resource_id, &candidates) else {
            tracing::info!(resource_id = %resource_id, "no entity representation for uri");
            return Ok(Resolution::NotFound);
        };

        let Some((payload, vocabulary)) = self.transform(resource_id, &original, &candidates) else {
            tracing::info!(
                resource_id = %resource_id,
                candidates = candidates.len(),
                "no vocabulary transformation produced an entity"
            );
            if self.cache_unmatched {
                self.store(cached.is_some(), CachedEntity::unmatched(resource_id.clone()));
            }
            return Ok(Resolution::NoMatchingTransformation);
        };

        self.store(
            cached.is_some(),
            CachedEntity::resolved(resource_id.clone(), payload.clone(), vocabulary.id.clone()),
        );
        self.parse(resource_id, &payload, vocabulary).map(Resolution::Resolved)
    }

    /// Removes every cached row, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Propagates the cache backend's error.
    pub fn purge_all(&self) -> DerefResult<usize> {
        let removed = self.cache.purge_all()?;
        tracing::info!(removed, "purged processed entity cache");
        Ok(removed)
    }

    /// Serves a cache row if it is usable.
    ///
    /// A row is usable when it has a payload and its vocabulary still exists,
    /// or when it is a negative row and negative caching is on.
    fn from_cache(&self, row: &CachedEntity) -> DerefResult<Option<Resolution>> {
        if row.is_unmatched() {
            return Ok(self
                .cache_unmatched
                .then_some(Resolution::NoMatchingTransformation));
        }
        let (Some(payload), Some(vocabulary_id)) = (row.usable_payload(), row.vocabulary_id.as_ref())
        else {
            return Ok(None);
        };
        match self.vocabularies.get_by_id(vocabulary_id)? {
            Some(vocabulary) => self
                .parse(&row.resource_id, payload, vocabulary)
                .map(|entity| Some(Resolution::Resolved(entity))),
            None => {
                tracing::debug!(
                    resource_id = %row.resource_id,
                    vocabulary_id = %vocabulary_id,
                    "cached vocabulary no longer exists, resolving again"
                );
                Ok(None)
            }
        }
    }

    fn retrieve_original(
        &self,
        resource_id: &ResourceId,
        candidates: &VocabularyCandidates,
    ) -> Option<String> {
        candidates.suffixes().into_iter().find_map(|suffix| {
            match self.retriever.retrieve(resource_id, suffix) {
                Ok(Some(raw)) if !raw.trim().is_empty() => Some(raw),
                Ok(_) => {
                    tracing::debug!(url = %retrieval_url(resource_id, suffix), "empty representation");
                    None
                }
                Err(e) => {
                    tracing::warn!(resource_id = %resource_id, suffix, error = %e, "failed to retrieve");
                    None
                }
            }
        })
    }

    fn transform(
        &self,
        resource_id: &ResourceId,
        original: &str,
        candidates: &VocabularyCandidates,
    ) -> Option<(String, VocabularyDefinition)> {
        candidates.candidates().iter().find_map(|vocabulary| {
            match self.transformers.transform(vocabulary, original, resource_id) {
                Ok(Some(payload)) => Some((payload, vocabulary.clone())),
                Ok(None) => {
                    tracing::info!(
                        resource_id = %resource_id,
                        vocabulary = %vocabulary.id,
                        "transformation produced an empty entity"
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!(
                        resource_id = %resource_id,
                        vocabulary = %vocabulary.id,
                        error = %e,
                        "error transforming entity"
                    );
                    None
                }
            }
        })
    }

    /// Writes a cache row. Never fails the caller.
    fn store(&self, replace: bool, row: CachedEntity) {
        let resource_id = row.resource_id.clone();
        let result = if replace {
            self.cache.upsert(row)
        } else {
            self.cache.insert(row)
        };
        match result {
            Ok(()) => {}
            Err(StorageError::DuplicateKey(_)) => {
                tracing::info!(
                    resource_id = %resource_id,
                    "attempted to save duplicate record, race condition expected"
                );
            }
            Err(e) => {
                tracing::warn!(resource_id = %resource_id, error = %e, "failed to cache entity");
            }
        }
    }

    fn parse(
        &self,
        resource_id: &ResourceId,
        payload: &str,
        vocabulary: VocabularyDefinition,
    ) -> DerefResult<ResolvedEntity> {
        let entity = self
            .parser
            .parse(payload)
            .map_err(|source| ResolutionError::Parse {
                resource_id: resource_id.clone(),
                source,
            })?;
        Ok(ResolvedEntity::new(entity, vocabulary))
    }
}
