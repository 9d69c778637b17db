//! Vocabulary transformations.
//!
//! Each vocabulary names a transformation rule that turns the raw published
//! representation into the normalized payload. Rules are registered by name;
//! the conversion logic itself lives with whoever registers them.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::resource::ResourceId;
use crate::vocabulary::VocabularyDefinition;

/// Name of the built-in rule that accepts an already normalized payload.
pub const PASSTHROUGH_RULE: &str = "passthrough";

/// A failed transformation. Local to one candidate vocabulary.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The vocabulary names a rule nobody registered.
    #[error("No transformation registered under '{rule}'")]
    UnknownRule {
        /// The missing rule name.
        rule: String,
    },

    /// The rule rejected the input.
    #[error("Transformation '{rule}' failed for {resource_id}: {message}")]
    Failed {
        /// Rule that ran.
        rule: String,
        /// Id being transformed.
        resource_id: ResourceId,
        /// Why the rule rejected the input.
        message: String,
    },
}

/// Converts a raw representation into a normalized payload.
pub trait EntityTransformer: Send + Sync {
    /// Converts `raw` for `resource_id`.
    ///
    /// `Ok(None)` means the rule ran but produced nothing for this input.
    fn convert(&self, raw: &str, resource_id: &ResourceId) -> Result<Option<String>, TransformError>;
}

impl<F> EntityTransformer for F
where
    F: Fn(&str, &ResourceId) -> Result<Option<String>, TransformError> + Send + Sync,
{
    fn convert(&self, raw: &str, resource_id: &ResourceId) -> Result<Option<String>, TransformError> {
        self(raw, resource_id)
    }
}

/// Accepts input that is already in normalized form.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughTransformer;

impl EntityTransformer for PassthroughTransformer {
    fn convert(&self, raw: &str, _resource_id: &ResourceId) -> Result<Option<String>, TransformError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }
}

/// Transformation rules by name.
#[derive(Clone)]
pub struct TransformerRegistry {
    rules: HashMap<String, Arc<dyn EntityTransformer>>,
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.rules.keys().collect();
        names.sort();
        f.debug_struct("TransformerRegistry").field("rules", &names).finish()
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PASSTHROUGH_RULE, PassthroughTransformer);
        registry
    }
}

impl TransformerRegistry {
    /// Creates a registry holding only the passthrough rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with no rules at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Registers (or replaces) a rule.
    pub fn register(&mut self, rule: impl Into<String>, transformer: impl EntityTransformer + 'static) {
        self.rules.insert(rule.into(), Arc::new(transformer));
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, rule: impl Into<String>, transformer: impl EntityTransformer + 'static) -> Self {
        self.register(rule, transformer);
        self
    }

    /// Runs the rule named by `vocabulary` on `raw`.
    ///
    /// # Errors
    ///
    /// `TransformError::UnknownRule` if the rule is not registered, otherwise
    /// whatever the rule reports.
    pub fn transform(
        &self,
        vocabulary: &VocabularyDefinition,
        raw: &str,
        resource_id: &ResourceId,
    ) -> Result<Option<String>, TransformError> {
        let transformer = self
            .rules
            .get(&vocabulary.transformation)
            .ok_or_else(|| TransformError::UnknownRule {
                rule: vocabulary.transformation.clone(),
            })?;
        let converted = transformer.convert(raw, resource_id)?;
        Ok(converted.filter(|payload| !payload.trim().is_empty()))
    }
}
