//! The dereference service: resolution, bounded expansion and ancestor walks
//! behind one validated configuration.

use std::sync::Arc;

use crate::cache::Resolution;
use crate::config::DereferenceConfig;
use crate::enrichment::TermEnricher;
use crate::entity::ResolvedEntity;
use crate::error::{DerefError, DerefResult};
use crate::expansion::{ExpansionResult, GraphExpander};
use crate::hierarchy::HierarchyTerm;
use crate::resolver::EntityResolver;
use crate::resource::ResourceId;
use crate::retrieval::RawEntityRetriever;
use crate::storage::{EntityCacheStore, TermStore, VocabularyStore};
use crate::transform::TransformerRegistry;

/// Entry point for dereferencing resource ids.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use dereferencer::{
///     DereferenceConfig, DereferenceService, InMemoryEntityCache, InMemoryVocabularyStore,
///     MatchRule, RetrievalError, ResourceId, TransformerRegistry, VocabularyDefinition,
/// };
///
/// let vocabularies = InMemoryVocabularyStore::with_vocabularies(vec![
///     VocabularyDefinition::new("ex", MatchRule::prefix("http://ex.org/"), "passthrough")?,
/// ])?;
/// let retriever = |id: &ResourceId, _suffix: &str| -> Result<Option<String>, RetrievalError> {
///     Ok(Some(format!(r#"{{"type":"Concept","about":"{id}"}}"#)))
/// };
/// let service = DereferenceService::new(
///     Arc::new(vocabularies),
///     Arc::new(InMemoryEntityCache::new()),
///     Arc::new(retriever),
///     TransformerRegistry::new(),
///     DereferenceConfig::default(),
/// );
///
/// let entities = service.dereference(&ResourceId::new("http://ex.org/1"))?;
/// assert_eq!(entities.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct DereferenceService {
    resolver: EntityResolver,
    expander: GraphExpander,
    enricher: Option<TermEnricher>,
    config: DereferenceConfig,
}

impl DereferenceService {
    /// Creates a service over the given collaborators.
    #[must_use]
    pub fn new(
        vocabularies: Arc<dyn VocabularyStore>,
        cache: Arc<dyn EntityCacheStore>,
        retriever: Arc<dyn RawEntityRetriever>,
        transformers: TransformerRegistry,
        config: DereferenceConfig,
    ) -> Self {
        let resolver = EntityResolver::new(vocabularies, cache, retriever, transformers)
            .with_unmatched_caching(config.cache_unmatched());
        Self::from_resolver(resolver, config)
    }

    /// Wraps an already built resolver.
    #[must_use]
    pub fn from_resolver(resolver: EntityResolver, config: DereferenceConfig) -> Self {
        Self {
            resolver,
            expander: GraphExpander::from_config(&config),
            enricher: None,
            config,
        }
    }

    /// Attaches the hierarchy term store used by ancestor walks and enrichment.
    #[must_use]
    pub fn with_term_store(mut self, terms: Arc<dyn TermStore>) -> Self {
        self.enricher = Some(TermEnricher::new(terms));
        self
    }

    /// The configuration the service was built with.
    #[must_use]
    pub fn config(&self) -> &DereferenceConfig {
        &self.config
    }

    /// The single-id resolver behind the service.
    #[must_use]
    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// The term enricher, if a term store is attached.
    #[must_use]
    pub fn enricher(&self) -> Option<&TermEnricher> {
        self.enricher.as_ref()
    }

    /// Resolves a single id without expansion.
    ///
    /// # Errors
    ///
    /// See [`EntityResolver::resolve`].
    pub fn resolve(&self, resource_id: &ResourceId) -> DerefResult<Option<ResolvedEntity>> {
        self.resolver.resolve(resource_id)
    }

    /// Resolves a single id, reporting why it did not resolve.
    ///
    /// # Errors
    ///
    /// See [`EntityResolver::resolve_outcome`].
    pub fn resolve_outcome(&self, resource_id: &ResourceId) -> DerefResult<Resolution> {
        self.resolver.resolve_outcome(resource_id)
    }

    /// Resolves `resource_id` and expands it by its vocabulary's iteration
    /// depth, capped by `max_expansion_depth`.
    ///
    /// Returns the root first, then its broader entities level by level. An
    /// unresolvable root yields an empty list.
    ///
    /// # Errors
    ///
    /// Fails only if resolving the root fails.
    pub fn dereference(&self, resource_id: &ResourceId) -> DerefResult<Vec<ResolvedEntity>> {
        let Some(root) = self.resolver.resolve(resource_id)? else {
            return Ok(Vec::new());
        };
        let depth = self.config.effective_depth(root.vocabulary.iterations);
        Ok(self
            .expander
            .expand(resource_id.clone(), root, depth, &self.resolver)
            .into_entities())
    }

    /// Resolves `resource_id` and expands it up to `max_depth` hops.
    ///
    /// # Errors
    ///
    /// Fails only if resolving the root fails.
    pub fn expand(&self, resource_id: &ResourceId, max_depth: usize) -> DerefResult<ExpansionResult> {
        match self.resolver.resolve(resource_id)? {
            Some(root) => Ok(self
                .expander
                .expand(resource_id.clone(), root, max_depth, &self.resolver)),
            None => Ok(ExpansionResult::default()),
        }
    }

    /// Dereferences each id, `batch_size` ids at a time.
    ///
    /// Results are in input order; one id failing does not affect the others.
    #[must_use]
    pub fn dereference_many(
        &self,
        resource_ids: &[ResourceId],
    ) -> Vec<(ResourceId, DerefResult<Vec<ResolvedEntity>>)> {
        let mut out = Vec::with_capacity(resource_ids.len());
        for (batch, ids) in resource_ids.chunks(self.config.batch_size()).enumerate() {
            tracing::debug!(batch, size = ids.len(), "dereferencing batch");
            for id in ids {
                let result = self.dereference(id);
                if let Err(e) = &result {
                    tracing::warn!(resource_id = %id, error = %e, "dereference failed");
                }
                out.push((id.clone(), result));
            }
        }
        out
    }

    /// Ancestor ids of `term` from the attached term store, nearest first.
    ///
    /// # Errors
    ///
    /// Returns an internal error if no term store is attached.
    pub fn walk_ancestors(
        &self,
        term: &HierarchyTerm,
        keep: Option<&dyn Fn(&ResourceId) -> bool>,
    ) -> DerefResult<Vec<ResourceId>> {
        let enricher = self
            .enricher
            .as_ref()
            .ok_or_else(|| DerefError::internal("no term store attached"))?;
        Ok(enricher.ancestors(term, keep))
    }

    /// Empties the processed entity cache.
    ///
    /// # Errors
    ///
    /// Propagates the cache backend's error.
    pub fn purge_all(&self) -> DerefResult<usize> {
        self.resolver.purge_all()
    }
}
