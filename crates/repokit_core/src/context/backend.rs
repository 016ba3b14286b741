//! Storage seam behind [`StoreContext`](super::StoreContext).
//!
//! Backends store each entity set as JSON rows keyed by a backend-assigned
//! surrogate key. They know nothing about entity types.

use crate::error::RepoResult;
use serde_json::Value;

/// One persisted row body.
pub type Row = Value;

/// A single mutation in a commit batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Insert under a fresh key.
    Insert(Row),
    /// Replace an existing row; skipped when the row is gone.
    Update { id: i64, row: Row },
    /// Replace when present, insert under a fresh key otherwise.
    Upsert { id: i64, row: Row },
    /// Remove an existing row; skipped when the row is gone.
    Delete { id: i64 },
}

/// Outcome of applying one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Keys assigned to inserted rows, in batch order.
    pub inserted: Vec<i64>,
    pub updated: usize,
    pub deleted: usize,
    /// Updates/deletes that targeted missing rows.
    pub skipped: usize,
}

/// Storage engine contract consumed by the generic context.
///
/// # Invariants
/// - `apply` is atomic: either every change lands or none does.
/// - `load` returns rows ordered by ascending key.
pub trait ContextBackend: Send + Sync {
    /// Stable backend name used in logs.
    fn name(&self) -> &'static str;

    /// Whether a set for `set` exists in the store.
    fn has_set(&self, set: &str) -> bool;

    /// Creates the set when missing.
    fn ensure_set(&self, set: &str) -> RepoResult<()>;

    fn load(&self, set: &str) -> RepoResult<Vec<(i64, Row)>>;

    fn load_one(&self, set: &str, id: i64) -> RepoResult<Option<Row>> {
        Ok(self
            .load(set)?
            .into_iter()
            .find(|(row_id, _)| *row_id == id)
            .map(|(_, row)| row))
    }

    fn apply(&self, set: &str, changes: Vec<Change>) -> RepoResult<ApplyReport>;
}
