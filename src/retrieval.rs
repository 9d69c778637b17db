//! Raw entity retrieval.
//!
//! Fetching the published representation of an entity is the job of an
//! external collaborator (typically an HTTP client with its own timeouts).
//! The resolver only needs this trait.

use thiserror::Error;

use crate::resource::ResourceId;

/// A single failed retrieval attempt.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// I/O or network failure.
    #[error("I/O error retrieving {uri}: {message}")]
    Io {
        /// URL that was requested.
        uri: String,
        /// Underlying error.
        message: String,
    },

    /// The source did not answer in time.
    #[error("Timed out retrieving {uri} after {duration_ms}ms")]
    Timeout {
        /// URL that was requested.
        uri: String,
        /// Time waited.
        duration_ms: u64,
    },

    /// The source answered with an error status.
    #[error("Source returned status {status} for {uri}")]
    Status {
        /// URL that was requested.
        uri: String,
        /// HTTP status code.
        status: u16,
    },
}

/// Fetches the raw representation of a resource.
pub trait RawEntityRetriever: Send + Sync {
    /// Retrieves `resource_id` using the given suffix variant.
    ///
    /// `Ok(None)` means the source had nothing; an `Err` is a failed attempt.
    /// The resolver treats both as "try the next suffix".
    fn retrieve(&self, resource_id: &ResourceId, suffix: &str)
        -> Result<Option<String>, RetrievalError>;
}

impl<F> RawEntityRetriever for F
where
    F: Fn(&ResourceId, &str) -> Result<Option<String>, RetrievalError> + Send + Sync,
{
    fn retrieve(
        &self,
        resource_id: &ResourceId,
        suffix: &str,
    ) -> Result<Option<String>, RetrievalError> {
        self(resource_id, suffix)
    }
}

/// The URL to fetch for a resource and suffix.
#[must_use]
pub fn retrieval_url(resource_id: &ResourceId, suffix: &str) -> String {
    format!("{resource_id}{suffix}")
}
