//! In-process backend.

use super::backend::{ApplyReport, Change, ContextBackend, Row};
use crate::error::RepoResult;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
struct MemorySet {
    last_id: i64,
    rows: BTreeMap<i64, Row>,
}

impl MemorySet {
    fn insert(&mut self, row: Row) -> i64 {
        self.last_id += 1;
        self.rows.insert(self.last_id, row);
        self.last_id
    }
}

/// Backend holding every set in process memory.
///
/// Contexts opened over one `MemoryBackend` share its rows, which is how a
/// fresh context per request still observes earlier commits.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sets: Mutex<BTreeMap<String, MemorySet>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored for `set`.
    pub fn row_count(&self, set: &str) -> usize {
        self.sets.lock().get(set).map_or(0, |rows| rows.rows.len())
    }
}

impl ContextBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn has_set(&self, set: &str) -> bool {
        self.sets.lock().contains_key(set)
    }

    fn ensure_set(&self, set: &str) -> RepoResult<()> {
        self.sets.lock().entry(set.to_string()).or_default();
        Ok(())
    }

    fn load(&self, set: &str) -> RepoResult<Vec<(i64, Row)>> {
        let sets = self.sets.lock();
        Ok(sets
            .get(set)
            .map(|rows| {
                rows.rows
                    .iter()
                    .map(|(id, row)| (*id, row.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn load_one(&self, set: &str, id: i64) -> RepoResult<Option<Row>> {
        let sets = self.sets.lock();
        Ok(sets.get(set).and_then(|rows| rows.rows.get(&id).cloned()))
    }

    fn apply(&self, set: &str, changes: Vec<Change>) -> RepoResult<ApplyReport> {
        let mut sets = self.sets.lock();
        // Work on a copy so a batch lands all-or-nothing.
        let mut staged = sets.get(set).cloned().unwrap_or_default();
        let mut report = ApplyReport::default();

        for change in changes {
            match change {
                Change::Insert(row) => report.inserted.push(staged.insert(row)),
                Change::Update { id, row } => match staged.rows.get_mut(&id) {
                    Some(existing) => {
                        *existing = row;
                        report.updated += 1;
                    }
                    None => report.skipped += 1,
                },
                Change::Upsert { id, row } => match staged.rows.get_mut(&id) {
                    Some(existing) => {
                        *existing = row;
                        report.updated += 1;
                    }
                    None => report.inserted.push(staged.insert(row)),
                },
                Change::Delete { id } => {
                    if staged.rows.remove(&id).is_some() {
                        report.deleted += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
            }
        }

        sets.insert(set.to_string(), staged);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryBackend;
    use crate::context::backend::{Change, ContextBackend};
    use serde_json::json;

    #[test]
    fn assigns_monotonic_keys_and_skips_missing_rows() {
        let backend = MemoryBackend::new();
        assert!(!backend.has_set("widgets"));

        let report = backend
            .apply(
                "widgets",
                vec![
                    Change::Insert(json!({"name": "a"})),
                    Change::Insert(json!({"name": "b"})),
                    Change::Update {
                        id: 99,
                        row: json!({"name": "ghost"}),
                    },
                ],
            )
            .expect("apply");
        assert_eq!(report.inserted, vec![1, 2]);
        assert_eq!(report.skipped, 1);
        assert!(backend.has_set("widgets"));

        backend
            .apply("widgets", vec![Change::Delete { id: 1 }])
            .expect("delete");
        let report = backend
            .apply(
                "widgets",
                vec![Change::Upsert {
                    id: 1,
                    row: json!({"name": "again"}),
                }],
            )
            .expect("upsert");
        assert_eq!(report.inserted, vec![3], "deleted keys are never reused");
        assert_eq!(backend.row_count("widgets"), 2);
    }

    #[test]
    fn load_one_returns_none_for_unknown_set() {
        let backend = MemoryBackend::new();
        assert!(backend.load_one("nothing", 1).expect("load").is_none());
        assert!(backend.load("nothing").expect("load").is_empty());
    }
}
