//! Resource identifiers.
//!
//! Every entity the dereferencer knows about is addressed by the URI under which
//! its vocabulary publishes it. The URI is opaque: it is never parsed, only
//! compared and matched against vocabulary rules.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque, immutable URI of a vocabulary entity.
///
/// Cloning is cheap; the string is shared.
///
/// # Examples
///
/// ```
/// use dereferencer::ResourceId;
///
/// let id = ResourceId::new("http://vocab.getty.edu/aat/300026656");
/// assert_eq!(id.as_str(), "http://vocab.getty.edu/aat/300026656");
/// assert!(!id.is_blank());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Arc<str>);

impl ResourceId {
    /// Creates a resource ID from a URI string.
    #[must_use]
    pub fn new(uri: impl AsRef<str>) -> Self {
        Self(Arc::from(uri.as_ref()))
    }

    /// Returns the URI.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the URI is empty or only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Builds a resource ID from an optional, possibly blank, reference.
    ///
    /// Relation links in vocabulary data are frequently missing or empty;
    /// those collapse to `None`.
    #[must_use]
    pub fn from_reference(reference: Option<&str>) -> Option<Self> {
        reference
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(Self::new)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for ResourceId {
    fn from(uri: String) -> Self {
        Self(Arc::from(uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_blank_references_are_discarded() {
        assert_eq!(ResourceId::from_reference(None), None);
        assert_eq!(ResourceId::from_reference(Some("")), None);
        assert_eq!(ResourceId::from_reference(Some("   ")), None);
        assert_eq!(
            ResourceId::from_reference(Some(" http://ex.org/1 ")),
            Some(ResourceId::new("http://ex.org/1"))
        );
    }

    #[test]
    fn test_map_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(ResourceId::new("http://ex.org/a"), 1);
        assert_eq!(map.get("http://ex.org/a"), Some(&1));
        assert_eq!(map.get("http://ex.org/b"), None);
    }

    #[test]
    fn test_serde_transparent() {
        let id = ResourceId::new("http://ex.org/a");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"http://ex.org/a\"");
        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
