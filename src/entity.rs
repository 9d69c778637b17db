//! Normalized entity model.
//!
//! Every vocabulary transformation produces the same normalized form: a JSON
//! document tagged with the entity kind. Parsing that payload yields an
//! [`EnrichmentEntity`]; pairing it with the vocabulary that produced it gives a
//! [`ResolvedEntity`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resource::ResourceId;
use crate::vocabulary::VocabularyDefinition;

/// Literal values keyed by language tag (`""` for no language).
pub type LangLiterals = BTreeMap<String, Vec<String>>;

/// Classification of entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    /// An abstract concept or subject.
    Concept,
    /// A geographic location.
    Place,
    /// A period of time.
    Timespan,
    /// A person or group acting as creator.
    Agent,
    /// A company, institution or other body.
    Organization,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concept => write!(f, "concept"),
            Self::Place => write!(f, "place"),
            Self::Timespan => write!(f, "timespan"),
            Self::Agent => write!(f, "agent"),
            Self::Organization => write!(f, "organization"),
        }
    }
}

/// Fields shared by every entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityHeader {
    /// The URI the entity describes.
    pub about: String,

    /// Preferred labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pref_label: LangLiterals,

    /// Alternative labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub alt_label: LangLiterals,

    /// Free-text notes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub note: LangLiterals,

    /// Equivalent URIs in other vocabularies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub same_as: Vec<String>,
}

/// A SKOS concept.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    #[serde(flatten)]
    pub header: EntityHeader,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub broader: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub narrower: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exact_match: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub close_match: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notation: LangLiterals,
}

/// A geographic place.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    #[serde(flatten)]
    pub header: EntityHeader,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub is_part_of: Vec<String>,
}

/// A period of time.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timespan {
    #[serde(flatten)]
    pub header: EntityHeader,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub is_part_of: Vec<String>,
}

/// A person or group.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(flatten)]
    pub header: EntityHeader,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profession_or_occupation: LangLiterals,
}

/// An organization.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(flatten)]
    pub header: EntityHeader,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub acronym: LangLiterals,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// A normalized entity of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnrichmentEntity {
    /// See [`Concept`].
    Concept(Concept),
    /// See [`Place`].
    Place(Place),
    /// See [`Timespan`].
    Timespan(Timespan),
    /// See [`Agent`].
    Agent(Agent),
    /// See [`Organization`].
    Organization(Organization),
}

impl EnrichmentEntity {
    /// The kind of this entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Concept(_) => EntityKind::Concept,
            Self::Place(_) => EntityKind::Place,
            Self::Timespan(_) => EntityKind::Timespan,
            Self::Agent(_) => EntityKind::Agent,
            Self::Organization(_) => EntityKind::Organization,
        }
    }

    /// Shared fields.
    #[must_use]
    pub const fn header(&self) -> &EntityHeader {
        match self {
            Self::Concept(e) => &e.header,
            Self::Place(e) => &e.header,
            Self::Timespan(e) => &e.header,
            Self::Agent(e) => &e.header,
            Self::Organization(e) => &e.header,
        }
    }

    /// The URI the entity describes.
    #[must_use]
    pub fn about(&self) -> &str {
        &self.header().about
    }
}

/// Exposes the ids of entities one hop up the hierarchy.
///
/// Which relation counts as "up" depends on the kind; kinds without one use
/// the default and expose nothing.
pub trait RelatedResources {
    /// Raw relation references, possibly blank.
    fn broader_references(&self) -> &[String] {
        &[]
    }

    /// Non-blank broader ids, in declaration order.
    fn broader_ids(&self) -> Vec<ResourceId> {
        self.broader_references()
            .iter()
            .filter_map(|r| ResourceId::from_reference(Some(r)))
            .collect()
    }
}

impl RelatedResources for Concept {
    fn broader_references(&self) -> &[String] {
        &self.broader
    }
}

impl RelatedResources for Place {
    fn broader_references(&self) -> &[String] {
        &self.is_part_of
    }
}

impl RelatedResources for Timespan {
    fn broader_references(&self) -> &[String] {
        &self.is_part_of
    }
}

impl RelatedResources for Agent {}

impl RelatedResources for Organization {}

impl RelatedResources for EnrichmentEntity {
    fn broader_references(&self) -> &[String] {
        match self {
            Self::Concept(e) => e.broader_references(),
            Self::Place(e) => e.broader_references(),
            Self::Timespan(e) => e.broader_references(),
            Self::Agent(e) => e.broader_references(),
            Self::Organization(e) => e.broader_references(),
        }
    }
}

/// A parsed entity together with the vocabulary that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    /// The parsed entity.
    pub entity: EnrichmentEntity,
    /// The vocabulary that owns it.
    pub vocabulary: VocabularyDefinition,
}

impl ResolvedEntity {
    /// Pairs an entity with its owning vocabulary.
    #[must_use]
    pub fn new(entity: EnrichmentEntity, vocabulary: VocabularyDefinition) -> Self {
        Self { entity, vocabulary }
    }
}

impl RelatedResources for ResolvedEntity {
    fn broader_references(&self) -> &[String] {
        self.entity.broader_references()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(about: &str, broader: &[&str]) -> EnrichmentEntity {
        EnrichmentEntity::Concept(Concept {
            header: EntityHeader {
                about: about.to_string(),
                ..EntityHeader::default()
            },
            broader: broader.iter().map(|s| (*s).to_string()).collect(),
            ..Concept::default()
        })
    }

    #[test]
    fn test_concept_exposes_broader() {
        let entity = concept("http://ex.org/a", &["http://ex.org/b", "", "  "]);
        assert_eq!(entity.broader_ids(), vec![ResourceId::new("http://ex.org/b")]);
    }

    #[test]
    fn test_place_and_timespan_expose_is_part_of() {
        let place = EnrichmentEntity::Place(Place {
            is_part_of: vec!["http://sws.geonames.org/2635167/".to_string()],
            ..Place::default()
        });
        assert_eq!(place.broader_ids().len(), 1);

        let span = EnrichmentEntity::Timespan(Timespan {
            is_part_of: vec!["http://semium.org/time/19xx".to_string()],
            ..Timespan::default()
        });
        assert_eq!(span.broader_ids(), vec![ResourceId::new("http://semium.org/time/19xx")]);
    }

    #[test]
    fn test_agent_exposes_nothing() {
        let agent = EnrichmentEntity::Agent(Agent::default());
        assert!(agent.broader_ids().is_empty());
    }

    #[test]
    fn test_payload_shape() {
        let json = r#"{"type":"Concept","about":"http://ex.org/a","prefLabel":{"en":["Bridge"]},"broader":["http://ex.org/b"]}"#;
        let entity: EnrichmentEntity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.kind(), EntityKind::Concept);
        assert_eq!(entity.about(), "http://ex.org/a");
        assert_eq!(entity.header().pref_label["en"], vec!["Bridge".to_string()]);
        assert_eq!(entity.broader_ids(), vec![ResourceId::new("http://ex.org/b")]);
    }
}
