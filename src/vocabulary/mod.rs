//! Vocabulary definitions.
//!
//! A vocabulary is an external source of entities. It claims resource ids by a
//! URI-matching rule, says which retrieval suffixes to try when fetching a raw
//! representation, names the transformation rule that normalizes that
//! representation, and sets how many broader hops to expand.

pub mod candidates;

use std::collections::HashMap;
use std::fmt;
use std::sync::{OnceLock, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use candidates::VocabularyCandidates;

const REGEX_CACHE_MAX: usize = 1024;

static REGEX_CACHE: OnceLock<RwLock<HashMap<String, Regex>>> = OnceLock::new();

fn compile_anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

fn cached_regex(pattern: &str) -> Result<Regex, regex::Error> {
    cached_regex_in(REGEX_CACHE.get_or_init(|| RwLock::new(HashMap::new())), pattern)
}

fn cached_regex_in(
    cache: &RwLock<HashMap<String, Regex>>,
    pattern: &str,
) -> Result<Regex, regex::Error> {
    match cache.read() {
        Ok(guard) => {
            if let Some(re) = guard.get(pattern) {
                return Ok(re.clone());
            }
        }
        Err(_) => tracing::warn!(pattern = %pattern, "regex cache lock poisoned; compiling uncached"),
    }

    let compiled = compile_anchored(pattern)?;

    match cache.write() {
        Ok(mut guard) => {
            if guard.len() >= REGEX_CACHE_MAX {
                guard.clear();
            }
            // Another thread may have inserted it while we compiled.
            guard
                .entry(pattern.to_string())
                .or_insert_with(|| compiled.clone());
        }
        Err(_) => tracing::warn!(pattern = %pattern, "regex cache lock poisoned; not caching"),
    }
    Ok(compiled)
}

/// Identifier of a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VocabularyId(String);

impl VocabularyId {
    /// Creates a vocabulary ID.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::BlankVocabularyId` if `id` is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::BlankVocabularyId);
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VocabularyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a vocabulary claims resource ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MatchRule {
    /// The resource id starts with this prefix.
    Prefix(String),
    /// The whole resource id matches this regular expression.
    Pattern(String),
}

impl MatchRule {
    /// Creates a prefix rule.
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    /// Creates a pattern rule, compiling it once to reject invalid expressions.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPattern` if the expression does not compile.
    pub fn pattern(pattern: impl Into<String>) -> Result<Self, ValidationError> {
        let pattern = pattern.into();
        if let Err(e) = cached_regex(&pattern) {
            return Err(ValidationError::InvalidPattern {
                pattern,
                reason: e.to_string(),
            });
        }
        Ok(Self::Pattern(pattern))
    }

    /// Returns true if `uri` is claimed by this rule.
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        match self {
            Self::Prefix(prefix) => !prefix.is_empty() && uri.starts_with(prefix.as_str()),
            Self::Pattern(pattern) => match cached_regex(pattern) {
                Ok(re) => re.is_match(uri),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "ignoring invalid vocabulary URI pattern");
                    false
                }
            },
        }
    }

    /// How restrictive the rule is; higher is more specific.
    ///
    /// A prefix counts its characters. A pattern counts the literal characters
    /// before its first metacharacter, so `http://ex\.org/sub/.*` ranks like
    /// the prefix `http://ex`.
    #[must_use]
    pub fn specificity(&self) -> usize {
        match self {
            Self::Prefix(prefix) => prefix.chars().count(),
            Self::Pattern(pattern) => literal_prefix_len(pattern),
        }
    }
}

fn literal_prefix_len(pattern: &str) -> usize {
    pattern
        .trim_start_matches('^')
        .chars()
        .take_while(|c| !matches!(c, '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'))
        .count()
}

/// A vocabulary as loaded from the vocabulary store.
///
/// Immutable once loaded; a resolution works against the snapshot it was handed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyDefinition {
    /// Unique id.
    pub id: VocabularyId,

    /// Display name; defaults to the id.
    #[serde(default)]
    pub name: String,

    /// Which resource ids the vocabulary claims.
    pub rule: MatchRule,

    /// Retrieval variants tried against the resource id, in order.
    #[serde(default)]
    pub suffixes: Vec<String>,

    /// Name of the transformation rule that normalizes raw representations.
    pub transformation: String,

    /// Maximum number of broader hops to expand (0 = no expansion).
    #[serde(default)]
    pub iterations: u32,
}

impl VocabularyDefinition {
    /// Creates a vocabulary with no suffixes and no expansion.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::BlankVocabularyId` for a blank id and
    /// `ValidationError::InvalidUriPattern` if a pattern rule does not compile.
    pub fn new(
        id: impl Into<String>,
        rule: MatchRule,
        transformation: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let id = VocabularyId::new(id)?;
        if let MatchRule::Pattern(pattern) = &rule {
            cached_regex(pattern).map_err(|e| ValidationError::InvalidUriPattern {
                vocabulary: id.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(Self {
            name: id.to_string(),
            id,
            rule,
            suffixes: Vec::new(),
            transformation: transformation.into(),
            iterations: 0,
        })
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a retrieval suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.push(suffix.into());
        self
    }

    /// Sets the iteration depth.
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Returns true if this vocabulary claims `uri`.
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        self.rule.matches(uri)
    }

    /// Suffixes to try, with the bare URI standing in when none are declared.
    pub(crate) fn retrieval_suffixes(&self) -> Vec<&str> {
        if self.suffixes.is_empty() {
            vec![""]
        } else {
            self.suffixes.iter().map(String::as_str).collect()
        }
    }
}
