//! Term enrichment: matching free-text values and URIs against hierarchy terms.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entity::{EnrichmentEntity, EntityKind};
use crate::hierarchy::{HierarchyChainWalker, HierarchyTerm};
use crate::resource::ResourceId;
use crate::storage::{StorageError, TermStore};

const ISO_639_1: [&str; 184] = [
    "aa", "ab", "ae", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg", "bh",
    "bi", "bm", "bn", "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv", "cy", "da",
    "de", "dv", "dz", "ee", "el", "en", "eo", "es", "et", "eu", "fa", "ff", "fi", "fj", "fo", "fr",
    "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha", "he", "hi", "ho", "hr", "ht", "hu", "hy", "hz",
    "ia", "id", "ie", "ig", "ii", "ik", "io", "is", "it", "iu", "ja", "jv", "ka", "kg", "ki", "kj",
    "kk", "kl", "km", "kn", "ko", "kr", "ks", "ku", "kv", "kw", "ky", "la", "lb", "lg", "li", "ln",
    "lo", "lt", "lu", "lv", "mg", "mh", "mi", "mk", "ml", "mn", "mr", "ms", "mt", "my", "na", "nb",
    "nd", "ne", "ng", "nl", "nn", "no", "nr", "nv", "ny", "oc", "oj", "om", "or", "os", "pa", "pi",
    "pl", "ps", "pt", "qu", "rm", "rn", "ro", "ru", "rw", "sa", "sc", "sd", "se", "sg", "si", "sk",
    "sl", "sm", "sn", "so", "sq", "sr", "ss", "st", "su", "sv", "sw", "ta", "te", "tg", "th", "ti",
    "tk", "tl", "tn", "to", "tr", "ts", "tt", "tw", "ty", "ug", "uk", "ur", "uz", "ve", "vi", "vo",
    "wa", "wo", "xh", "yi", "yo", "za", "zh", "zu",
];

static LANGUAGES: OnceLock<HashSet<&'static str>> = OnceLock::new();
static VERY_BROAD_TIMESPAN: OnceLock<Option<Regex>> = OnceLock::new();

/// Returns true if `code` is a two-letter ISO 639-1 language code.
#[must_use]
pub fn is_iso_language(code: &str) -> bool {
    LANGUAGES
        .get_or_init(|| ISO_639_1.iter().copied().collect())
        .contains(code)
}

/// Returns true for timespans broad enough to keep as ancestors
/// (whole eras, millennia and the time root).
#[must_use]
pub fn is_very_broad_timespan(code_uri: &str) -> bool {
    VERY_BROAD_TIMESPAN
        .get_or_init(|| {
            Regex::new(r"^http://semium\.org/time/(ChronologicalPeriod|Time|(AD|BC)[1-9]x{3})$")
                .map_err(|e| tracing::warn!(error = %e, "invalid timespan pattern"))
                .ok()
        })
        .as_ref()
        .is_some_and(|re| re.is_match(code_uri))
}

/// A free-text value to enrich.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValue {
    /// Name of the field the value came from; echoed back with each match.
    #[serde(default)]
    pub field_name: Option<String>,
    /// The label to match.
    pub value: String,
    /// Language tag. Ignored unless it is a valid two-letter code.
    #[serde(default)]
    pub language: Option<String>,
    /// Kinds of term the value may match. Empty matches nothing.
    pub entity_kinds: Vec<EntityKind>,
}

impl InputValue {
    /// Creates an input matched against the given kinds.
    #[must_use]
    pub fn new(value: impl Into<String>, entity_kinds: Vec<EntityKind>) -> Self {
        Self {
            field_name: None,
            value: value.into(),
            language: None,
            entity_kinds,
        }
    }

    /// Sets the language tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the originating field name.
    #[must_use]
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    fn effective_language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty() && is_iso_language(l))
    }
}

/// An entity matched for an input value.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMatch {
    /// Field name of the input that matched.
    pub field_name: Option<String>,
    /// The matched term or one of its ancestors.
    pub entity: EnrichmentEntity,
}

/// Looks up enrichment entities in a [`TermStore`].
///
/// Storage failures are logged and yield fewer results; they are never
/// returned to the caller.
#[derive(Clone)]
pub struct TermEnricher {
    terms: Arc<dyn TermStore>,
}

impl std::fmt::Debug for TermEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermEnricher").finish_non_exhaustive()
    }
}

impl TermEnricher {
    /// Creates an enricher over `terms`.
    #[must_use]
    pub fn new(terms: Arc<dyn TermStore>) -> Self {
        Self { terms }
    }

    /// Matches each input by lowercased label, language and kind.
    ///
    /// Every matched term is followed by its ancestors. For timespans only
    /// the very broad ancestors are added. Inputs with a blank value or no
    /// kinds are skipped.
    #[must_use]
    pub fn enrich_by_label(&self, inputs: &[InputValue]) -> Vec<LabelMatch> {
        let mut out = Vec::new();
        for input in inputs {
            let value = input.value.to_lowercase();
            if value.trim().is_empty() || input.entity_kinds.is_empty() {
                continue;
            }
            let language = input.effective_language();
            for &kind in &input.entity_kinds {
                match self.find_with_ancestors(&value, language, kind) {
                    Ok(entities) => out.extend(entities.into_iter().map(|entity| LabelMatch {
                        field_name: input.field_name.clone(),
                        entity,
                    })),
                    Err(e) => {
                        tracing::warn!(value = %value, kind = %kind, error = %e, "unable to retrieve entity from tag");
                    }
                }
            }
        }
        out
    }

    /// The first term whose code URI is `code_uri`.
    #[must_use]
    pub fn enrich_by_code_uri(&self, code_uri: &str) -> Option<EnrichmentEntity> {
        match self.terms.get_by_code_uri(code_uri) {
            Ok(term) => term.map(|t| t.to_entity()),
            Err(e) => {
                tracing::warn!(code_uri, error = %e, "unable to retrieve entity from code uri");
                None
            }
        }
    }

    /// Like [`enrich_by_code_uri`](Self::enrich_by_code_uri), falling back to
    /// the first term listing `uri` as `owl:sameAs`.
    #[must_use]
    pub fn enrich_by_code_uri_or_same_as(&self, uri: &str) -> Option<EnrichmentEntity> {
        self.enrich_by_code_uri(uri).or_else(|| match self.terms.find_by_same_as(uri) {
            Ok(terms) => terms.first().map(HierarchyTerm::to_entity),
            Err(e) => {
                tracing::warn!(uri, error = %e, "unable to retrieve entity from id");
                None
            }
        })
    }

    /// Ancestor ids of `term`, nearest first, optionally filtered.
    #[must_use]
    pub fn ancestors(
        &self,
        term: &HierarchyTerm,
        keep: Option<&dyn Fn(&ResourceId) -> bool>,
    ) -> Vec<ResourceId> {
        HierarchyChainWalker::walk(
            term,
            |parent| match self.terms.get_by_code_uri(parent.as_str()) {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(parent = %parent, error = %e, "failed to look up parent term");
                    None
                }
            },
            keep,
        )
    }

    fn find_with_ancestors(
        &self,
        label: &str,
        language: Option<&str>,
        kind: EntityKind,
    ) -> Result<Vec<EnrichmentEntity>, StorageError> {
        let matched = self.terms.find_by_label(label, language, kind)?;

        let broad_only = |id: &ResourceId| is_very_broad_timespan(id.as_str());
        let keep: Option<&dyn Fn(&ResourceId) -> bool> = if kind == EntityKind::Timespan {
            Some(&broad_only)
        } else {
            None
        };

        let mut parent_ids = Vec::new();
        let mut seen = HashSet::new();
        for term in &matched {
            for id in self.ancestors(term, keep) {
                if seen.insert(id.clone()) {
                    parent_ids.push(id);
                }
            }
        }
        let parents = if parent_ids.is_empty() {
            Vec::new()
        } else {
            self.terms.find_by_code_uris(&parent_ids)?
        };

        Ok(matched
            .iter()
            .chain(parents.iter())
            .map(HierarchyTerm::to_entity)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryTermStore;

    const TIME: &str = "http://semium.org/time/";

    fn time(id: &str) -> String {
        format!("{TIME}{id}")
    }

    fn timespan_store() -> Arc<InMemoryTermStore> {
        let store = Arc::new(InMemoryTermStore::new());
        let terms = [
            HierarchyTerm::new(time("1901"), EntityKind::Timespan)
                .with_label("en", "1901")
                .with_parent(time("19xx_1_third")),
            HierarchyTerm::new(time("19xx_1_third"), EntityKind::Timespan).with_parent(time("19xx")),
            HierarchyTerm::new(time("19xx"), EntityKind::Timespan).with_parent(time("AD2xxx")),
            HierarchyTerm::new(time("AD2xxx"), EntityKind::Timespan).with_parent(time("Time")),
            HierarchyTerm::new(time("Time"), EntityKind::Timespan),
        ];
        for term in terms {
            store.upsert(term).unwrap();
        }
        store
    }

    fn abouts(matches: &[LabelMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.entity.about()).collect()
    }

    #[test]
    fn language_table() {
        assert!(is_iso_language("en"));
        assert!(is_iso_language("zu"));
        assert!(!is_iso_language("eng"));
        assert!(!is_iso_language("EN"));
        assert!(!is_iso_language(""));
    }

    #[test]
    fn very_broad_timespan_pattern() {
        assert!(is_very_broad_timespan(&time("Time")));
        assert!(is_very_broad_timespan(&time("ChronologicalPeriod")));
        assert!(is_very_broad_timespan(&time("AD2xxx")));
        assert!(is_very_broad_timespan(&time("BC1xxx")));
        assert!(!is_very_broad_timespan(&time("AD0xxx")));
        assert!(!is_very_broad_timespan(&time("19xx")));
        assert!(!is_very_broad_timespan(&time("Time/extra")));
    }

    #[test]
    fn timespan_keeps_only_very_broad_ancestors() {
        let enricher = TermEnricher::new(timespan_store());
        let found = enricher.enrich_by_label(&[InputValue::new("1901", vec![EntityKind::Timespan])
            .with_field_name("dc:date")]);
        let expected = [time("1901"), time("AD2xxx"), time("Time")];
        assert_eq!(abouts(&found), expected);
        assert!(found.iter().all(|m| m.field_name.as_deref() == Some("dc:date")));
    }

    #[test]
    fn other_kinds_keep_every_ancestor() {
        let store = Arc::new(InMemoryTermStore::new());
        store
            .upsert(
                HierarchyTerm::new("http://ex.org/paris", EntityKind::Place)
                    .with_label("fr", "Paris")
                    .with_parent("http://ex.org/france"),
            )
            .unwrap();
        store
            .upsert(HierarchyTerm::new("http://ex.org/france", EntityKind::Place).with_parent("http://ex.org/europe"))
            .unwrap();
        store
            .upsert(HierarchyTerm::new("http://ex.org/europe", EntityKind::Place).with_parent("http://ex.org/paris"))
            .unwrap();

        let enricher = TermEnricher::new(store);
        let found = enricher.enrich_by_label(&[InputValue::new("PARIS", vec![EntityKind::Place]).with_language("fr")]);
        // The cycle back to paris ends the walk.
        assert_eq!(
            abouts(&found),
            vec!["http://ex.org/paris", "http://ex.org/france", "http://ex.org/europe"]
        );
    }

    #[test]
    fn invalid_language_is_ignored_not_rejected() {
        let store = Arc::new(InMemoryTermStore::new());
        store
            .upsert(HierarchyTerm::new("http://ex.org/c", EntityKind::Concept).with_label("en", "Music"))
            .unwrap();
        let enricher = TermEnricher::new(store);

        let with_bad_language = InputValue::new("music", vec![EntityKind::Concept]).with_language("english");
        assert_eq!(enricher.enrich_by_label(&[with_bad_language]).len(), 1);

        let with_other_language = InputValue::new("music", vec![EntityKind::Concept]).with_language("de");
        assert!(enricher.enrich_by_label(&[with_other_language]).is_empty());
    }

    #[test]
    fn blank_values_and_missing_kinds_are_skipped() {
        let enricher = TermEnricher::new(timespan_store());
        let found = enricher.enrich_by_label(&[
            InputValue::new("   ", vec![EntityKind::Timespan]),
            InputValue::new("1901", Vec::new()),
        ]);
        assert!(found.is_empty());
    }

    #[test]
    fn code_uri_and_same_as_lookup() {
        let store = Arc::new(InMemoryTermStore::new());
        store
            .upsert(HierarchyTerm::new("http://ex.org/a", EntityKind::Agent).with_same_as("http://viaf.org/viaf/9"))
            .unwrap();
        let enricher = TermEnricher::new(store);

        assert_eq!(enricher.enrich_by_code_uri("http://ex.org/a").unwrap().about(), "http://ex.org/a");
        assert!(enricher.enrich_by_code_uri("http://viaf.org/viaf/9").is_none());
        assert_eq!(
            enricher
                .enrich_by_code_uri_or_same_as("http://viaf.org/viaf/9")
                .unwrap()
                .about(),
            "http://ex.org/a"
        );
        assert!(enricher.enrich_by_code_uri_or_same_as("http://nowhere.org/").is_none());
    }
}
