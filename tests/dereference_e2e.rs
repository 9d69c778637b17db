//! End-to-end dereferencing over in-memory stores.
//!
//! Covers the full path: candidate selection, suffix fallback, transformation,
//! caching and bounded expansion along broader / isPartOf relations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dereferencer::{
    DereferenceConfig, DereferenceService, EntityCacheStore, EntityKind, InMemoryEntityCache,
    InMemoryVocabularyStore, MatchRule, RawEntityRetriever, Resolution, ResourceId, RetrievalError,
    TransformError, TransformerRegistry, VocabularyDefinition,
};

const GEO: &str = "http://geo.example.org/";

/// Serves documents keyed by full URL and counts every request.
#[derive(Default)]
struct Documents {
    by_url: HashMap<String, String>,
    failing: Vec<String>,
    requests: AtomicUsize,
}

impl Documents {
    fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.by_url.insert(url.into(), body.into());
        self
    }

    fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.push(url.into());
        self
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl RawEntityRetriever for Documents {
    fn retrieve(&self, id: &ResourceId, suffix: &str) -> Result<Option<String>, RetrievalError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let url = format!("{id}{suffix}");
        if self.failing.contains(&url) {
            return Err(RetrievalError::Timeout {
                uri: url,
                duration_ms: 5_000,
            });
        }
        Ok(self.by_url.get(&url).cloned())
    }
}

/// Raw representation: `about|label|parent` (parent may be empty).
fn raw_place(about: &str, label: &str, parent: &str) -> String {
    format!("{about}|{label}|{parent}")
}

/// Converts `about|label|parent` into the normalized JSON form.
fn pipe_to_place(raw: &str, id: &ResourceId) -> Result<Option<String>, TransformError> {
    let parts: Vec<&str> = raw.trim().split('|').collect();
    let [about, label, parent] = parts.as_slice() else {
        return Err(TransformError::Failed {
            rule: "pipe-place".to_string(),
            resource_id: id.clone(),
            message: format!("expected 3 fields, got {}", parts.len()),
        });
    };
    let is_part_of = if parent.is_empty() {
        String::new()
    } else {
        format!(r#","isPartOf":["{parent}"]"#)
    };
    Ok(Some(format!(
        r#"{{"type":"Place","about":"{about}","prefLabel":{{"en":["{label}"]}}{is_part_of}}}"#
    )))
}

fn geo(id: &str) -> String {
    format!("{GEO}{id}")
}

fn geonames(iterations: u32) -> VocabularyDefinition {
    VocabularyDefinition::new("geo", MatchRule::prefix(GEO), "pipe-place")
        .unwrap()
        .with_name("Example Geo")
        .with_suffix("/about.rdf")
        .with_iterations(iterations)
}

fn place_chain() -> Documents {
    Documents::default()
        .with(format!("{}/about.rdf", geo("P42")), raw_place(&geo("P42"), "Haarlem", &geo("P7")))
        .with(format!("{}/about.rdf", geo("P7")), raw_place(&geo("P7"), "Noord-Holland", &geo("P1")))
        .with(format!("{}/about.rdf", geo("P1")), raw_place(&geo("P1"), "Netherlands", ""))
}

struct Harness {
    service: DereferenceService,
    cache: Arc<InMemoryEntityCache>,
    documents: Arc<Documents>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn harness(vocabularies: Vec<VocabularyDefinition>, documents: Documents, config: DereferenceConfig) -> Harness {
    init_tracing();
    let cache = Arc::new(InMemoryEntityCache::new());
    let documents = Arc::new(documents);
    let transformers = TransformerRegistry::new().with("pipe-place", pipe_to_place);
    let service = DereferenceService::new(
        Arc::new(InMemoryVocabularyStore::with_vocabularies(vocabularies).unwrap()),
        cache.clone(),
        documents.clone(),
        transformers,
        config,
    );
    Harness {
        service,
        cache,
        documents,
    }
}

fn sorted(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut ids: Vec<_> = ids.collect();
    ids.sort();
    ids
}

#[test]
fn expansion_depth_two_reaches_country() {
    let h = harness(vec![geonames(2)], place_chain(), DereferenceConfig::default());
    let result = h.service.expand(&ResourceId::new(geo("P42")), 2).unwrap();
    assert_eq!(
        sorted(result.ids().map(ToString::to_string)),
        sorted([geo("P1"), geo("P42"), geo("P7")].into_iter())
    );
    assert_eq!(result.get(&geo("P1")).unwrap().entity.kind(), EntityKind::Place);
}

#[test]
fn expansion_depth_one_stops_at_province() {
    let h = harness(vec![geonames(2)], place_chain(), DereferenceConfig::default());
    let result = h.service.expand(&ResourceId::new(geo("P42")), 1).unwrap();
    assert_eq!(result.len(), 2);
    assert!(result.contains(&geo("P7")));
    assert!(!result.contains(&geo("P1")));
}

#[test]
fn dereference_follows_vocabulary_iterations_in_order() {
    let h = harness(vec![geonames(2)], place_chain(), DereferenceConfig::new(2, 10, 10).unwrap());
    let entities = h.service.dereference(&ResourceId::new(geo("P42"))).unwrap();
    let abouts: Vec<_> = entities.iter().map(|e| e.entity.about().to_string()).collect();
    assert_eq!(abouts, vec![geo("P42"), geo("P7"), geo("P1")]);
    assert!(entities.iter().all(|e| e.vocabulary.name == "Example Geo"));
}

#[test]
fn broader_cycle_terminates() {
    let documents = Documents::default()
        .with(format!("{}/about.rdf", geo("A")), raw_place(&geo("A"), "A", &geo("B")))
        .with(format!("{}/about.rdf", geo("B")), raw_place(&geo("B"), "B", &geo("A")));
    let h = harness(vec![geonames(5)], documents, DereferenceConfig::default());
    let result = h.service.expand(&ResourceId::new(geo("A")), 5).unwrap();
    assert_eq!(result.len(), 2);
}

#[test]
fn resolve_is_idempotent_and_cached() {
    let h = harness(vec![geonames(0)], place_chain(), DereferenceConfig::default());
    let id = ResourceId::new(geo("P7"));
    let first = h.service.resolve(&id).unwrap().unwrap();
    let requests = h.documents.requests();
    let second = h.service.resolve(&id).unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(h.documents.requests(), requests);
    assert_eq!(h.cache.len().unwrap(), 1);
}

#[test]
fn suffix_fallback_after_failure() {
    let vocabulary = VocabularyDefinition::new("geo", MatchRule::prefix(GEO), "pipe-place")
        .unwrap()
        .with_suffix("/s1")
        .with_suffix("/s2");
    let documents = Documents::default()
        .failing(format!("{}/s1", geo("X")))
        .with(format!("{}/s2", geo("X")), raw_place(&geo("X"), "X", ""));
    let h = harness(vec![vocabulary], documents, DereferenceConfig::default());
    let resolved = h.service.resolve(&ResourceId::new(geo("X"))).unwrap().unwrap();
    assert_eq!(resolved.entity.about(), geo("X"));
    assert_eq!(h.documents.requests(), 2);
}

#[test]
fn most_specific_vocabulary_wins() {
    let broad = VocabularyDefinition::new("broad", MatchRule::prefix("http://ex.org/"), "passthrough").unwrap();
    let narrow = VocabularyDefinition::new("narrow", MatchRule::prefix("http://ex.org/sub/"), "passthrough").unwrap();
    let documents = Documents::default().with(
        "http://ex.org/sub/123",
        r#"{"type":"Concept","about":"http://ex.org/sub/123"}"#,
    );
    let h = harness(vec![broad, narrow], documents, DereferenceConfig::default());
    let resolved = h.service.resolve(&ResourceId::new("http://ex.org/sub/123")).unwrap().unwrap();
    assert_eq!(resolved.vocabulary.id.as_str(), "narrow");
}

#[test]
fn pattern_vocabulary_matches_whole_uri() {
    let vocabulary = VocabularyDefinition::new(
        "viaf",
        MatchRule::pattern(r"http://viaf\.example\.org/viaf/[0-9]+").unwrap(),
        "passthrough",
    )
    .unwrap();
    let documents = Documents::default().with(
        "http://viaf.example.org/viaf/42",
        r#"{"type":"Agent","about":"http://viaf.example.org/viaf/42"}"#,
    );
    let h = harness(vec![vocabulary], documents, DereferenceConfig::default());

    let agent = h.service.resolve(&ResourceId::new("http://viaf.example.org/viaf/42")).unwrap();
    assert_eq!(agent.unwrap().entity.kind(), EntityKind::Agent);
    let outcome = h
        .service
        .resolve_outcome(&ResourceId::new("http://viaf.example.org/viaf/42/extra"))
        .unwrap();
    assert_eq!(outcome, Resolution::NotFound);
}

#[test]
fn unparsable_payload_surfaces_error() {
    let vocabulary = VocabularyDefinition::new("ex", MatchRule::prefix("http://ex.org/"), "passthrough").unwrap();
    let documents = Documents::default().with("http://ex.org/broken", "<rdf:RDF/>");
    let h = harness(vec![vocabulary], documents, DereferenceConfig::default());
    let err = h.service.resolve(&ResourceId::new("http://ex.org/broken")).unwrap_err();
    assert!(err.is_parse_failure());
    assert!(!err.is_retryable());
}

#[test]
fn unknown_uri_is_absent_without_requests() {
    let h = harness(vec![geonames(2)], place_chain(), DereferenceConfig::default());
    assert!(h.service.dereference(&ResourceId::new("http://unknown.org/1")).unwrap().is_empty());
    assert_eq!(h.documents.requests(), 0);
}

#[test]
fn negative_caching_follows_config() {
    let broken = "only-one-field";
    let documents = Documents::default().with(format!("{}/about.rdf", geo("BAD")), broken);
    let config = DereferenceConfig::default().with_unmatched_caching(true);
    let h = harness(vec![geonames(0)], documents, config);
    let id = ResourceId::new(geo("BAD"));

    assert_eq!(h.service.resolve_outcome(&id).unwrap(), Resolution::NoMatchingTransformation);
    assert_eq!(h.service.resolve_outcome(&id).unwrap(), Resolution::NoMatchingTransformation);
    assert_eq!(h.documents.requests(), 1);
    assert_eq!(h.service.purge_all().unwrap(), 1);
}
