//! Hierarchy terms and the single-parent ancestor walk.
//!
//! Terms used for label matching carry at most one parent pointer. Following
//! those pointers yields a term's ancestors, nearest first. The data may
//! contain cycles; the walk stops at the first id it has already seen.

use serde::{Deserialize, Serialize};

use crate::entity::{
    Agent, Concept, EnrichmentEntity, EntityHeader, EntityKind, LangLiterals, Organization, Place,
    Timespan,
};
use crate::graph::{self, TraversalLimits};
use crate::resource::ResourceId;

/// A term of the enrichment hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyTerm {
    /// The term's identifying URI.
    pub code_uri: ResourceId,

    /// Labels keyed by language tag.
    #[serde(default)]
    pub labels: LangLiterals,

    /// Kind of entity the term describes.
    pub kind: EntityKind,

    /// Code URI of the parent term; may be blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Equivalent URIs in other vocabularies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub same_as: Vec<String>,
}

impl HierarchyTerm {
    /// Creates a term without labels or parent.
    #[must_use]
    pub fn new(code_uri: impl Into<ResourceId>, kind: EntityKind) -> Self {
        Self {
            code_uri: code_uri.into(),
            labels: LangLiterals::new(),
            kind,
            parent: None,
            same_as: Vec::new(),
        }
    }

    /// Adds a label in `language`.
    #[must_use]
    pub fn with_label(mut self, language: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.entry(language.into()).or_default().push(label.into());
        self
    }

    /// Sets the parent code URI.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Adds an `owl:sameAs` URI.
    #[must_use]
    pub fn with_same_as(mut self, uri: impl Into<String>) -> Self {
        self.same_as.push(uri.into());
        self
    }

    /// The parent id, unless absent or blank.
    #[must_use]
    pub fn parent_id(&self) -> Option<ResourceId> {
        ResourceId::from_reference(self.parent.as_deref())
    }

    /// Converts the term into a normalized entity of its kind.
    ///
    /// The parent becomes the kind's "up" relation.
    #[must_use]
    pub fn to_entity(&self) -> EnrichmentEntity {
        let header = EntityHeader {
            about: self.code_uri.to_string(),
            pref_label: self.labels.clone(),
            same_as: self.same_as.clone(),
            ..EntityHeader::default()
        };
        let up: Vec<String> = self.parent_id().map(|p| p.to_string()).into_iter().collect();
        match self.kind {
            EntityKind::Concept => EnrichmentEntity::Concept(Concept {
                header,
                broader: up,
                ..Concept::default()
            }),
            EntityKind::Place => EnrichmentEntity::Place(Place {
                header,
                is_part_of: up,
                ..Place::default()
            }),
            EntityKind::Timespan => EnrichmentEntity::Timespan(Timespan {
                header,
                is_part_of: up,
                ..Timespan::default()
            }),
            EntityKind::Agent => EnrichmentEntity::Agent(Agent {
                header,
                ..Agent::default()
            }),
            EntityKind::Organization => EnrichmentEntity::Organization(Organization {
                header,
                ..Organization::default()
            }),
        }
    }
}

/// Walks parent pointers from a starting term.
#[derive(Debug, Default, Clone, Copy)]
pub struct HierarchyChainWalker;

impl HierarchyChainWalker {
    /// Returns the ancestor ids of `start`, nearest first.
    ///
    /// The walk ends at a blank parent pointer, a parent `resolve_parent`
    /// cannot find, or a parent already visited (including `start` itself).
    /// `keep` decides which ancestors are returned; it never stops the walk.
    pub fn walk<R>(
        start: &HierarchyTerm,
        resolve_parent: R,
        keep: Option<&dyn Fn(&ResourceId) -> bool>,
    ) -> Vec<ResourceId>
    where
        R: FnMut(&ResourceId) -> Option<HierarchyTerm>,
    {
        graph::traverse(
            start.code_uri.clone(),
            start.clone(),
            TraversalLimits::chain(),
            resolve_parent,
            |term: &HierarchyTerm| term.parent_id().into_iter().collect(),
        )
        .into_iter()
        .skip(1)
        .map(|visit| visit.id)
        .filter(|id| keep.map_or(true, |keep| keep(id)))
        .collect()
    }
}
