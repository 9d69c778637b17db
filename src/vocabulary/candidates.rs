//! Candidate vocabulary matching.
//!
//! Given a resource id, find the vocabularies that may own it, most specific
//! first. No retrieval happens here.

use std::collections::HashSet;

use crate::storage::StorageError;

use super::VocabularyDefinition;

/// Ordered candidate vocabularies for one resource id.
#[derive(Debug, Clone, Default)]
pub struct VocabularyCandidates {
    candidates: Vec<VocabularyDefinition>,
}

impl VocabularyCandidates {
    /// Finds the vocabularies whose rule matches `resource_id`.
    ///
    /// `lookup` is the store's coarse URI search; its results are filtered
    /// against each vocabulary's own rule, de-duplicated by id and ordered by
    /// descending [`specificity`](super::MatchRule::specificity). Ties keep
    /// the order `lookup` returned them in.
    ///
    /// # Errors
    ///
    /// Propagates the error of `lookup`.
    pub fn find_for_uri<F>(resource_id: &str, lookup: F) -> Result<Self, StorageError>
    where
        F: FnOnce(&str) -> Result<Vec<VocabularyDefinition>, StorageError>,
    {
        let found = lookup(resource_id)?;
        Ok(Self::from_definitions(resource_id, found))
    }

    /// Builds candidates from an already loaded snapshot of vocabularies.
    #[must_use]
    pub fn from_definitions(resource_id: &str, definitions: Vec<VocabularyDefinition>) -> Self {
        let mut seen = HashSet::new();
        let mut candidates: Vec<VocabularyDefinition> = definitions
            .into_iter()
            .filter(|v| v.matches(resource_id))
            .filter(|v| seen.insert(v.id.clone()))
            .collect();
        // Stable: equal specificity keeps declaration order.
        candidates.sort_by_key(|v| std::cmp::Reverse(v.rule.specificity()));
        Self { candidates }
    }

    /// Returns true if no vocabulary claims the resource id.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// The candidates, most specific first.
    #[must_use]
    pub fn candidates(&self) -> &[VocabularyDefinition] {
        &self.candidates
    }

    /// Retrieval suffixes pooled across all candidates, de-duplicated in
    /// first-seen order.
    #[must_use]
    pub fn suffixes(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.candidates
            .iter()
            .flat_map(VocabularyDefinition::retrieval_suffixes)
            .filter(|s| seen.insert(*s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::MatchRule;

    fn vocab(id: &str, prefix: &str) -> VocabularyDefinition {
        VocabularyDefinition::new(id, MatchRule::prefix(prefix), "identity").unwrap()
    }

    #[test]
    fn test_most_specific_prefix_first() {
        let defs = vec![vocab("root", "http://ex.org/"), vocab("sub", "http://ex.org/sub/")];
        let candidates = VocabularyCandidates::from_definitions("http://ex.org/sub/123", defs);
        let ids: Vec<_> = candidates.candidates().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["sub", "root"]);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let defs = vec![
            vocab("first", "http://ex.org/"),
            vocab("second", "http://ex.org/"),
        ];
        let candidates = VocabularyCandidates::from_definitions("http://ex.org/1", defs);
        let ids: Vec<_> = candidates.candidates().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_non_matching_definitions_are_dropped() {
        let defs = vec![vocab("other", "http://other.org/"), vocab("ex", "http://ex.org/")];
        let candidates = VocabularyCandidates::from_definitions("http://ex.org/1", defs);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates.candidates()[0].id.as_str(), "ex");
    }

    #[test]
    fn test_no_candidates_is_not_an_error() {
        let candidates =
            VocabularyCandidates::find_for_uri("http://nowhere.org/1", |_| Ok(Vec::new())).unwrap();
        assert!(candidates.is_empty());
        assert!(candidates.suffixes().is_empty());
    }

    #[test]
    fn test_suffixes_pooled_first_seen() {
        let defs = vec![
            vocab("sub", "http://ex.org/sub/").with_suffix(".rdf").with_suffix(".xml"),
            vocab("root", "http://ex.org/").with_suffix(".xml").with_suffix(".json"),
        ];
        let candidates = VocabularyCandidates::from_definitions("http://ex.org/sub/1", defs);
        assert_eq!(candidates.suffixes(), vec![".rdf", ".xml", ".json"]);
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let defs = vec![vocab("ex", "http://ex.org/"), vocab("ex", "http://ex.org/")];
        let candidates = VocabularyCandidates::from_definitions("http://ex.org/1", defs);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_lookup_error_propagates() {
        let result = VocabularyCandidates::find_for_uri("http://ex.org/1", |_| {
            Err(StorageError::ConnectionError("down".to_string()))
        });
        assert!(matches!(result, Err(StorageError::ConnectionError(_))));
    }
}
