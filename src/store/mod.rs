//! Abstract persistence with optimistic concurrency.
//!
//! Three resources (games, lobbies, users) share one contract: every stored
//! document is paired with an opaque version token, and writes name the
//! version they expect. A write against a changed document fails with
//! `VersionConflict`, distinct from `NotFound` and generic unavailability;
//! the retry policy lives in the engine, not here. The in-memory reference
//! implementation uses a monotonically incrementing integer; a production
//! implementation maps `put` onto a conditional-write database primitive.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryStore;

/// Opaque version token. Callers only ever pass it back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(pub(crate) u64);

impl Version {
    /// The token a brand-new document receives in the reference impl.
    #[cfg(test)]
    pub(crate) fn initial() -> Self {
        Version(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(String),
    #[error("version conflict on {id}")]
    VersionConflict { id: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed document storage with conditional writes.
///
/// `put` with `expected: None` means "must not exist"; with `Some(v)` the
/// stored version must equal `v`. Reads and writes are the engine's only
/// suspension points.
#[async_trait]
pub trait DocumentStore<D>: Send + Sync
where
    D: Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> Result<(D, Version), StoreError>;

    async fn put(&self, id: &str, doc: D, expected: Option<Version>)
        -> Result<Version, StoreError>;

    async fn delete(&self, id: &str, expected: Version) -> Result<(), StoreError>;
}
