//! Bounded expansion of a resolved entity along its broader relations.

use std::collections::HashMap;

use crate::config::DereferenceConfig;
use crate::entity::{RelatedResources, ResolvedEntity};
use crate::error::{DerefResult, ValidationError};
use crate::graph::{self, TraversalLimits};
use crate::resolver::EntityResolver;
use crate::resource::ResourceId;

/// Entities reached by an expansion, keyed by resource id.
///
/// Iteration follows discovery order: the root first, then level by level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpansionResult {
    order: Vec<ResourceId>,
    entities: HashMap<ResourceId, ResolvedEntity>,
}

impl ExpansionResult {
    fn push(&mut self, id: ResourceId, entity: ResolvedEntity) {
        if self.entities.insert(id.clone(), entity).is_none() {
            self.order.push(id);
        }
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResolvedEntity> {
        self.entities.get(id)
    }

    /// Returns true if `id` was reached.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Ids in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.order.iter()
    }

    /// Entities in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &ResolvedEntity)> {
        self.order
            .iter()
            .filter_map(|id| self.entities.get_key_value(id))
    }

    /// Consumes the result, returning entities in discovery order.
    #[must_use]
    pub fn into_entities(mut self) -> Vec<ResolvedEntity> {
        self.order
            .iter()
            .filter_map(|id| self.entities.remove(id))
            .collect()
    }

    /// Consumes the result, returning the id map.
    #[must_use]
    pub fn into_map(self) -> HashMap<ResourceId, ResolvedEntity> {
        self.entities
    }
}

/// Expands a root entity breadth-first along [`RelatedResources::broader_ids`].
#[derive(Debug, Clone, Copy)]
pub struct GraphExpander {
    workers: usize,
}

impl Default for GraphExpander {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

impl GraphExpander {
    /// Creates an expander resolving each level on up to `workers` threads.
    ///
    /// # Errors
    ///
    /// `ValidationError::SettingTooSmall` if `workers` is zero.
    pub fn new(workers: usize) -> Result<Self, ValidationError> {
        if workers == 0 {
            return Err(ValidationError::SettingTooSmall {
                field: "expansion_workers".to_string(),
                min: 1,
                actual: 0,
            });
        }
        Ok(Self { workers })
    }

    /// Creates an expander with the configured worker count.
    #[must_use]
    pub const fn from_config(config: &DereferenceConfig) -> Self {
        Self {
            workers: config.expansion_workers(),
        }
    }

    /// Expands `root` using `resolver` for every neighbor.
    ///
    /// Nodes more than `max_depth` hops from the root are never resolved;
    /// `max_depth == 0` returns only the root. A neighbor that fails to
    /// resolve, including with an error, is logged and contributes nothing.
    #[must_use]
    pub fn expand(
        &self,
        root_id: ResourceId,
        root: ResolvedEntity,
        max_depth: usize,
        resolver: &EntityResolver,
    ) -> ExpansionResult {
        self.expand_with(root_id, root, max_depth, &|id: &ResourceId| resolver.resolve(id))
    }

    /// Like [`expand`](Self::expand) with an arbitrary resolve function.
    #[must_use]
    pub fn expand_with<F>(
        &self,
        root_id: ResourceId,
        root: ResolvedEntity,
        max_depth: usize,
        resolve: &F,
    ) -> ExpansionResult
    where
        F: Fn(&ResourceId) -> DerefResult<Option<ResolvedEntity>> + Sync,
    {
        let resolve_neighbor = |id: &ResourceId| match resolve(id) {
            Ok(Some(entity)) => Some(entity),
            Ok(None) => {
                tracing::warn!(resource_id = %id, "could not resolve broader entity");
                None
            }
            Err(e) => {
                tracing::warn!(resource_id = %id, error = %e, "failed to resolve broader entity");
                None
            }
        };

        let visits = graph::traverse_parallel(
            root_id,
            root,
            TraversalLimits::breadth_first(max_depth),
            self.workers,
            &resolve_neighbor,
            |entity: &ResolvedEntity| entity.broader_ids(),
        );

        let mut result = ExpansionResult::default();
        for visit in visits {
            result.push(visit.id, visit.value);
        }
        result
    }
}
