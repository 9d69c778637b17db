//! # dereferencer - Vocabulary Entity Resolution
//!
//! Resolves opaque entity URIs (places, concepts, timespans, agents,
//! organizations) published by controlled vocabularies into normalized typed
//! entities, caches the normalized form, and expands an entity along its
//! broader relations up to a bounded depth.
//!
//! ## Core Concepts
//!
//! - **Vocabulary**: claims URIs by prefix or pattern and names the retrieval
//!   suffixes and transformation rule for its entities
//! - **Processed entity cache**: at most one normalized payload per resource id
//! - **Expansion**: cycle-safe breadth-first walk over "broader" / "isPartOf"
//! - **Hierarchy walk**: the single-parent special case used for enrichment terms
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dereferencer::{DereferenceConfig, DereferenceService, ResourceId};
//!
//! let service = DereferenceService::new(
//!     vocabularies,
//!     cache,
//!     retriever,
//!     TransformerRegistry::new(),
//!     DereferenceConfig::new(4, 5, 100)?,
//! );
//!
//! // Root first, then its broader entities level by level.
//! let entities = service.dereference(&ResourceId::new("http://sws.geonames.org/2988507/"))?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod cache;
pub mod entity;
pub mod error;
pub mod resource;
pub mod vocabulary;

// Collaborators and storage
pub mod parser;
pub mod retrieval;
pub mod storage;
pub mod transform;

// Resolution, traversal and enrichment
pub mod config;
pub mod enrichment;
pub mod expansion;
pub mod graph;
pub mod hierarchy;
pub mod resolver;
pub mod service;

pub use cache::{CachedEntity, Resolution};
pub use entity::{
    Agent, Concept, EnrichmentEntity, EntityHeader, EntityKind, LangLiterals, Organization, Place,
    RelatedResources, ResolvedEntity, Timespan,
};
pub use error::{DerefError, DerefResult, ResolutionError, ValidationError};
pub use resource::ResourceId;
pub use vocabulary::{MatchRule, VocabularyCandidates, VocabularyDefinition, VocabularyId};

pub use parser::{EntityPayloadParser, JsonPayloadParser, ParseError};
pub use retrieval::{RawEntityRetriever, RetrievalError};
pub use storage::{
    EntityCacheStore, InMemoryEntityCache, InMemoryTermStore, InMemoryVocabularyStore,
    StorageError, TermStore, VocabularyStore,
};
pub use transform::{EntityTransformer, TransformError, TransformerRegistry, PASSTHROUGH_RULE};

pub use config::DereferenceConfig;
pub use enrichment::{InputValue, LabelMatch, TermEnricher};
pub use expansion::{ExpansionResult, GraphExpander};
pub use graph::{TraversalLimits, Visit};
pub use hierarchy::{HierarchyChainWalker, HierarchyTerm};
pub use resolver::EntityResolver;
pub use service::DereferenceService;

#[cfg(feature = "persistent")]
pub use storage::persistent::{open_cache, PersistentCacheConfig, PersistentEntityCache};
