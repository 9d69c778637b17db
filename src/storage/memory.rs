//! In-memory storage backend.
//!
//! This module provides thread-safe in-memory implementations of the storage traits.
//! It is intended for embedded usage, tests, and as a reference implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::cache::CachedEntity;
use crate::entity::EntityKind;
use crate::hierarchy::HierarchyTerm;
use crate::resource::ResourceId;
use crate::storage::traits::{EntityCacheStore, StorageError, TermStore, VocabularyStore};
use crate::vocabulary::{VocabularyDefinition, VocabularyId};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn normalize_label(s: &str) -> String {
    s.trim().to_lowercase()
}

#[derive(Debug, Default)]
struct VocabularyState {
    ordered: Vec<VocabularyDefinition>,
    by_id: HashMap<VocabularyId, usize>,
}

/// Thread-safe in-memory vocabulary store.
///
/// Lookups return vocabularies in insertion (declaration) order.
#[derive(Debug, Default)]
pub struct InMemoryVocabularyStore {
    state: RwLock<VocabularyState>,
}

impl InMemoryVocabularyStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `vocabularies` in the given order.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if two vocabularies share an id.
    pub fn with_vocabularies(
        vocabularies: impl IntoIterator<Item = VocabularyDefinition>,
    ) -> Result<Self, StorageError> {
        let store = Self::new();
        for vocabulary in vocabularies {
            store.insert(vocabulary)?;
        }
        Ok(store)
    }
}

impl VocabularyStore for InMemoryVocabularyStore {
    fn insert(&self, vocabulary: VocabularyDefinition) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("vocabulary.insert"))?;
        if state.by_id.contains_key(&vocabulary.id) {
            return Err(StorageError::DuplicateKey(vocabulary.id.to_string()));
        }
        let idx = state.ordered.len();
        state.by_id.insert(vocabulary.id.clone(), idx);
        state.ordered.push(vocabulary);
        Ok(())
    }

    fn get_by_id(&self, id: &VocabularyId) -> Result<Option<VocabularyDefinition>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("vocabulary.get_by_id"))?;
        Ok(state.by_id.get(id).map(|&idx| state.ordered[idx].clone()))
    }

    fn find_by_uri_match(&self, uri: &str) -> Result<Vec<VocabularyDefinition>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("vocabulary.find_by_uri_match"))?;
        Ok(state
            .ordered
            .iter()
            .filter(|v| v.matches(uri))
            .cloned()
            .collect())
    }

    fn list(&self) -> Result<Vec<VocabularyDefinition>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("vocabulary.list"))?;
        Ok(state.ordered.clone())
    }
}

/// Thread-safe in-memory processed entity cache.
#[derive(Debug, Default)]
pub struct InMemoryEntityCache {
    rows: RwLock<HashMap<ResourceId, CachedEntity>>,
}

impl InMemoryEntityCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityCacheStore for InMemoryEntityCache {
    fn get(&self, resource_id: &ResourceId) -> Result<Option<CachedEntity>, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("cache.get"))?;
        Ok(rows.get(resource_id).cloned())
    }

    fn insert(&self, entity: CachedEntity) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("cache.insert"))?;
        if rows.contains_key(&entity.resource_id) {
            return Err(StorageError::DuplicateKey(entity.resource_id.to_string()));
        }
        rows.insert(entity.resource_id.clone(), entity);
        Ok(())
    }

    fn upsert(&self, entity: CachedEntity) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("cache.upsert"))?;
        rows.insert(entity.resource_id.clone(), entity);
        Ok(())
    }

    fn purge_all(&self) -> Result<usize, StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("cache.purge_all"))?;
        let removed = rows.len();
        rows.clear();
        Ok(removed)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("cache.len"))?;
        Ok(rows.len())
    }
}

/// Thread-safe in-memory term store.
///
/// Results are ordered by code URI.
#[derive(Debug, Default)]
pub struct InMemoryTermStore {
    terms: RwLock<BTreeMap<ResourceId, HierarchyTerm>>,
}

impl InMemoryTermStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TermStore for InMemoryTermStore {
    fn upsert(&self, term: HierarchyTerm) -> Result<(), StorageError> {
        let mut terms = self.terms.write().map_err(|_| lock_err("term.upsert"))?;
        terms.insert(term.code_uri.clone(), term);
        Ok(())
    }

    fn get_by_code_uri(&self, code_uri: &str) -> Result<Option<HierarchyTerm>, StorageError> {
        let terms = self.terms.read().map_err(|_| lock_err("term.get_by_code_uri"))?;
        Ok(terms.get(code_uri).cloned())
    }

    fn find_by_code_uris(&self, code_uris: &[ResourceId]) -> Result<Vec<HierarchyTerm>, StorageError> {
        let terms = self.terms.read().map_err(|_| lock_err("term.find_by_code_uris"))?;
        Ok(code_uris
            .iter()
            .filter_map(|uri| terms.get(uri).cloned())
            .collect())
    }

    fn find_by_label(
        &self,
        label: &str,
        language: Option<&str>,
        kind: EntityKind,
    ) -> Result<Vec<HierarchyTerm>, StorageError> {
        let wanted = normalize_label(label);
        let terms = self.terms.read().map_err(|_| lock_err("term.find_by_label"))?;
        Ok(terms
            .values()
            .filter(|t| t.kind == kind)
            .filter(|t| {
                t.labels
                    .iter()
                    .filter(|(lang, _)| language.map_or(true, |l| l == lang.as_str()))
                    .flat_map(|(_, values)| values)
                    .any(|v| normalize_label(v) == wanted)
            })
            .cloned()
            .collect())
    }

    fn find_by_same_as(&self, uri: &str) -> Result<Vec<HierarchyTerm>, StorageError> {
        let terms = self.terms.read().map_err(|_| lock_err("term.find_by_same_as"))?;
        Ok(terms
            .values()
            .filter(|t| t.same_as.iter().any(|s| s == uri))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::MatchRule;

    fn vocab(id: &str, prefix: &str) -> VocabularyDefinition {
        VocabularyDefinition::new(id, MatchRule::prefix(prefix), "passthrough").unwrap()
    }

    #[test]
    fn vocabulary_store_keeps_declaration_order() {
        let store = InMemoryVocabularyStore::with_vocabularies(vec![
            vocab("b", "http://ex.org/"),
            vocab("a", "http://ex.org/sub/"),
            vocab("c", "http://other.org/"),
        ])
        .unwrap();

        let found = store.find_by_uri_match("http://ex.org/sub/1").unwrap();
        let ids: Vec<_> = found.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        assert!(matches!(
            store.insert(vocab("a", "http://x.org/")),
            Err(StorageError::DuplicateKey(_))
        ));
        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[test]
    fn vocabulary_store_get_by_id() {
        let store = InMemoryVocabularyStore::new();
        store.insert(vocab("geo", "http://sws.geonames.org/")).unwrap();
        let id = VocabularyId::new("geo").unwrap();
        assert!(store.get_by_id(&id).unwrap().is_some());
        let missing = VocabularyId::new("nope").unwrap();
        assert!(store.get_by_id(&missing).unwrap().is_none());
    }

    #[test]
    fn entity_cache_insert_rejects_duplicates_upsert_replaces() {
        let cache = InMemoryEntityCache::new();
        let id = ResourceId::new("http://ex.org/1");
        let vocab_id = VocabularyId::new("ex").unwrap();

        cache
            .insert(CachedEntity::resolved(id.clone(), "first", vocab_id.clone()))
            .unwrap();
        assert!(matches!(
            cache.insert(CachedEntity::resolved(id.clone(), "second", vocab_id.clone())),
            Err(StorageError::DuplicateKey(_))
        ));
        assert_eq!(cache.get(&id).unwrap().unwrap().payload.as_deref(), Some("first"));

        cache
            .upsert(CachedEntity::resolved(id.clone(), "third", vocab_id))
            .unwrap();
        assert_eq!(cache.get(&id).unwrap().unwrap().payload.as_deref(), Some("third"));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn entity_cache_purge_all() {
        let cache = InMemoryEntityCache::new();
        cache.insert(CachedEntity::unmatched(ResourceId::new("http://ex.org/1"))).unwrap();
        cache.insert(CachedEntity::unmatched(ResourceId::new("http://ex.org/2"))).unwrap();
        assert_eq!(cache.purge_all().unwrap(), 2);
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn term_store_label_lookup_respects_language_and_kind() {
        let store = InMemoryTermStore::new();
        store
            .upsert(
                HierarchyTerm::new("http://ex.org/paris", EntityKind::Place)
                    .with_label("en", "Paris")
                    .with_label("fr", "Paris")
                    .with_label("de", "Parigi"),
            )
            .unwrap();
        store
            .upsert(HierarchyTerm::new("http://ex.org/paris-concept", EntityKind::Concept).with_label("en", "Paris"))
            .unwrap();

        assert_eq!(store.find_by_label("paris", None, EntityKind::Place).unwrap().len(), 1);
        assert_eq!(store.find_by_label("PARIS", Some("fr"), EntityKind::Place).unwrap().len(), 1);
        assert!(store.find_by_label("parigi", Some("en"), EntityKind::Place).unwrap().is_empty());
        assert_eq!(store.find_by_label("paris", None, EntityKind::Concept).unwrap().len(), 1);
    }

    #[test]
    fn term_store_same_as_and_code_uris() {
        let store = InMemoryTermStore::new();
        store
            .upsert(
                HierarchyTerm::new("http://ex.org/a", EntityKind::Agent)
                    .with_same_as("http://viaf.org/viaf/1"),
            )
            .unwrap();
        store.upsert(HierarchyTerm::new("http://ex.org/b", EntityKind::Agent)).unwrap();

        assert_eq!(store.find_by_same_as("http://viaf.org/viaf/1").unwrap().len(), 1);
        let found = store
            .find_by_code_uris(&[ResourceId::new("http://ex.org/b"), ResourceId::new("http://ex.org/zz")])
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
