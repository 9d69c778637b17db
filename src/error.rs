//! Error types for the dereferencer.
//!
//! Only a small set of failures is fatal to a caller. Retrieval and
//! transformation problems are absorbed inside the resolution pipeline and
//! surface as "not found"; what remains here is validation of inputs and
//! configuration, and the failures a `resolve` call cannot recover from.

use thiserror::Error;

use crate::parser::ParseError;
use crate::resource::ResourceId;
use crate::storage::StorageError;

/// Validation errors that occur during input or configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A vocabulary was given a blank id.
    #[error("Vocabulary id cannot be blank")]
    BlankVocabularyId,

    /// A vocabulary's pattern rule does not compile.
    #[error("Vocabulary '{vocabulary}' has an invalid URI pattern: {reason}")]
    InvalidUriPattern {
        /// Id of the vocabulary.
        vocabulary: String,
        /// Compiler message.
        reason: String,
    },

    /// A standalone pattern rule does not compile.
    #[error("Invalid URI pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected expression.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// Configuration could not be read.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Parser message.
        reason: String,
    },

    /// A numeric setting is below its minimum.
    #[error("Setting '{field}' must be at least {min} (got {actual})")]
    SettingTooSmall {
        /// Name of the setting.
        field: String,
        /// Smallest accepted value.
        min: u64,
        /// Value given.
        actual: u64,
    },
}

/// Failures that abort a single resolution.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The normalized payload is not a valid entity.
    #[error("Failed to parse normalized payload of {resource_id}: {source}")]
    Parse {
        /// Id whose payload failed.
        resource_id: ResourceId,
        /// Parser error.
        #[source]
        source: ParseError,
    },

    /// A cache or vocabulary read failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Top-level error type for the dereferencer.
#[derive(Debug, Error)]
pub enum DerefError {
    /// Invalid input or configuration.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A resolution could not complete.
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Misuse or an unexpected state.
    #[error("Internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl From<StorageError> for DerefError {
    fn from(err: StorageError) -> Self {
        Self::Resolution(ResolutionError::Storage(err))
    }
}

impl DerefError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a payload parse failure.
    #[must_use]
    pub const fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Resolution(ResolutionError::Parse { .. }))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Internal { .. } => false,
            Self::Resolution(e) => matches!(
                e,
                ResolutionError::Storage(
                    StorageError::BackendError(_) | StorageError::ConnectionError(_)
                )
            ),
        }
    }
}

/// Result type alias for dereferencer operations.
pub type DerefResult<T> = Result<T, DerefError>;
