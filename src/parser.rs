//! Normalized payload parsing.

use thiserror::Error;

use crate::entity::EnrichmentEntity;

/// The normalized payload could not be parsed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    /// Creates a parse error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns a normalized payload into a typed entity.
pub trait EntityPayloadParser: Send + Sync {
    /// Parses `payload`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the payload is not a valid normalized entity.
    fn parse(&self, payload: &str) -> Result<EnrichmentEntity, ParseError>;
}

/// Parses the JSON normalized form.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPayloadParser;

impl EntityPayloadParser for JsonPayloadParser {
    fn parse(&self, payload: &str) -> Result<EnrichmentEntity, ParseError> {
        serde_json::from_str(payload).map_err(|e| ParseError::new(e.to_string()))
    }
}
