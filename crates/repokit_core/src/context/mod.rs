//! Persistence-context contract and its store-backed implementation.
//!
//! # Responsibility
//! - Define the per-entity-type context repositories forward storage work to.
//! - Track pending writes and scoped write contexts until an explicit commit.
//!
//! # Invariants
//! - Mutations are staged; nothing reaches the backend before `commit`.
//! - A commit flushes only once every open write context has been released.
//! - `cancel_write` discards staged writes and every open write context.

use crate::error::RepoResult;
use crate::model::Persistable;
use async_trait::async_trait;

pub mod backend;
pub mod memory;
mod store;
mod write;

pub use backend::{ApplyReport, Change, ContextBackend, Row};
pub use memory::MemoryBackend;
pub use store::StoreContext;
pub use write::WriteContext;

/// Result of committing one write context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// `false` while other write contexts are still open.
    pub flushed: bool,
    /// Surrogate keys assigned to inserted rows, in staging order.
    pub inserted: Vec<i64>,
    pub updated: usize,
    pub deleted: usize,
    /// Updates/deletes whose target row no longer exists.
    pub skipped: usize,
}

/// Storage-backed provider of the queryable set of one entity type.
///
/// Repositories receive a context by injection and never own its lifecycle.
#[async_trait]
pub trait PersistenceContext<T: Persistable>: Send + Sync {
    /// Name of the entity set this context serves.
    fn set_name(&self) -> &str;

    /// Whether a backing set exists for `T`.
    fn is_valid(&self) -> bool;

    /// Every committed row, soft-deleted ones included.
    fn all(&self) -> RepoResult<Vec<T>>;

    fn add(&self, items: Vec<T>) -> RepoResult<()>;

    fn update(&self, items: Vec<T>) -> RepoResult<()>;

    fn delete(&self, items: Vec<T>) -> RepoResult<()>;

    fn add_or_update(&self, items: Vec<T>) -> RepoResult<()>;

    fn find(&self, id: i64) -> RepoResult<Option<T>>;

    /// Committed rows for `ids`, in request order, missing keys skipped.
    fn find_range(&self, ids: &[i64]) -> RepoResult<Vec<T>>;

    /// Opens a scoped write batch.
    fn write_context(&self) -> WriteContext;

    fn commit(&self, write: WriteContext) -> RepoResult<CommitSummary>;

    async fn commit_async(&self, write: WriteContext) -> RepoResult<CommitSummary> {
        self.commit(write)
    }

    fn cancel_write(&self);
}
