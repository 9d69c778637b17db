//! Storage traits and backends.
//!
//! The traits define the external store interfaces; `memory` provides
//! thread-safe in-memory implementations and `persistent` (behind the
//! `persistent` feature) a durable processed entity cache.

pub mod memory;
#[cfg(feature = "persistent")]
pub mod persistent;
mod traits;

pub use memory::{InMemoryEntityCache, InMemoryTermStore, InMemoryVocabularyStore};
pub use traits::{EntityCacheStore, StorageError, TermStore, VocabularyStore};
