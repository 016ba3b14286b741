//! Generic context closed over one entity type.

use super::backend::{Change, ContextBackend, Row};
use super::write::{WriteContext, WriteTracker};
use super::{CommitSummary, PersistenceContext};
use crate::error::{RepoError, RepoResult};
use crate::model::keyed::short_type_name;
use crate::model::{Persistable, UNPERSISTED_ID};
use async_trait::async_trait;
use log::{debug, error, info};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
enum PendingWrite<T> {
    Add(T),
    Update(T),
    Delete(T),
    AddOrUpdate(T),
}

/// Persistence context for `T` over any [`ContextBackend`].
///
/// Each instance owns its own pending-write list and write-context tokens;
/// the backend is the only shared state.
pub struct StoreContext<T: Persistable> {
    backend: Arc<dyn ContextBackend>,
    set: String,
    pending: Mutex<Vec<PendingWrite<T>>>,
    writes: Arc<WriteTracker>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Persistable> StoreContext<T> {
    /// Creates a context for `T`, using the entity's short type name as set.
    pub fn new(backend: Arc<dyn ContextBackend>) -> Self {
        Self::with_set(backend, short_type_name::<T>())
    }

    pub fn with_set(backend: Arc<dyn ContextBackend>, set: impl Into<String>) -> Self {
        Self {
            backend,
            set: set.into(),
            pending: Mutex::new(Vec::new()),
            writes: Arc::new(WriteTracker::default()),
            _entity: PhantomData,
        }
    }

    /// Creates a context and makes sure its backing set exists.
    pub fn open(backend: Arc<dyn ContextBackend>) -> RepoResult<Self> {
        let context = Self::new(backend);
        context.backend.ensure_set(&context.set)?;
        Ok(context)
    }

    /// Number of staged, uncommitted writes.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    fn stage(&self, items: Vec<T>, wrap: fn(T) -> PendingWrite<T>) {
        self.pending.lock().extend(items.into_iter().map(wrap));
    }

    fn decode(&self, id: i64, row: Row) -> RepoResult<T> {
        let mut item: T = serde_json::from_value(row)?;
        item.set_id(id);
        Ok(item)
    }

    fn encode(item: &T) -> RepoResult<Row> {
        Ok(serde_json::to_value(item)?)
    }

    fn to_changes(pending: &[PendingWrite<T>]) -> RepoResult<(Vec<Change>, usize)> {
        let mut changes = Vec::with_capacity(pending.len());
        let mut skipped = 0;
        for write in pending {
            match write {
                PendingWrite::Add(item) => changes.push(Change::Insert(Self::encode(item)?)),
                PendingWrite::Update(item) if item.id() == UNPERSISTED_ID => skipped += 1,
                PendingWrite::Update(item) => changes.push(Change::Update {
                    id: item.id(),
                    row: Self::encode(item)?,
                }),
                PendingWrite::Delete(item) if item.id() == UNPERSISTED_ID => skipped += 1,
                PendingWrite::Delete(item) => changes.push(Change::Delete { id: item.id() }),
                PendingWrite::AddOrUpdate(item) if item.id() == UNPERSISTED_ID => {
                    changes.push(Change::Insert(Self::encode(item)?))
                }
                PendingWrite::AddOrUpdate(item) => changes.push(Change::Upsert {
                    id: item.id(),
                    row: Self::encode(item)?,
                }),
            }
        }
        Ok((changes, skipped))
    }

    fn flush(&self) -> RepoResult<CommitSummary> {
        let started_at = Instant::now();
        let pending = std::mem::take(&mut *self.pending.lock());
        if pending.is_empty() {
            return Ok(CommitSummary {
                flushed: true,
                ..CommitSummary::default()
            });
        }

        let result = Self::to_changes(&pending)
            .and_then(|(changes, skipped)| Ok((self.backend.apply(&self.set, changes)?, skipped)));

        match result {
            Ok((report, skipped)) => {
                info!(
                    "event=context_commit module=context status=ok backend={} set={} inserted={} updated={} deleted={} skipped={} duration_ms={}",
                    self.backend.name(),
                    self.set,
                    report.inserted.len(),
                    report.updated,
                    report.deleted,
                    report.skipped + skipped,
                    started_at.elapsed().as_millis()
                );
                Ok(CommitSummary {
                    flushed: true,
                    inserted: report.inserted,
                    updated: report.updated,
                    deleted: report.deleted,
                    skipped: report.skipped + skipped,
                })
            }
            Err(err) => {
                error!(
                    "event=context_commit module=context status=error backend={} set={} error={}",
                    self.backend.name(),
                    self.set,
                    err
                );
                // Failed batches stay staged so the caller can retry or cancel.
                let mut staged = self.pending.lock();
                let newer = std::mem::take(&mut *staged);
                *staged = pending;
                staged.extend(newer);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<T: Persistable> PersistenceContext<T> for StoreContext<T> {
    fn set_name(&self) -> &str {
        &self.set
    }

    fn is_valid(&self) -> bool {
        self.backend.has_set(&self.set)
    }

    fn all(&self) -> RepoResult<Vec<T>> {
        self.backend
            .load(&self.set)?
            .into_iter()
            .map(|(id, row)| self.decode(id, row))
            .collect()
    }

    fn add(&self, items: Vec<T>) -> RepoResult<()> {
        self.stage(items, PendingWrite::Add);
        Ok(())
    }

    fn update(&self, items: Vec<T>) -> RepoResult<()> {
        self.stage(items, PendingWrite::Update);
        Ok(())
    }

    fn delete(&self, items: Vec<T>) -> RepoResult<()> {
        self.stage(items, PendingWrite::Delete);
        Ok(())
    }

    fn add_or_update(&self, items: Vec<T>) -> RepoResult<()> {
        self.stage(items, PendingWrite::AddOrUpdate);
        Ok(())
    }

    fn find(&self, id: i64) -> RepoResult<Option<T>> {
        match self.backend.load_one(&self.set, id)? {
            Some(row) => Ok(Some(self.decode(id, row)?)),
            None => Ok(None),
        }
    }

    fn find_range(&self, ids: &[i64]) -> RepoResult<Vec<T>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = self.find(*id)? {
                found.push(item);
            }
        }
        Ok(found)
    }

    fn write_context(&self) -> WriteContext {
        self.writes.open()
    }

    fn commit(&self, write: WriteContext) -> RepoResult<CommitSummary> {
        if !write.belongs_to(&self.writes) {
            return Err(RepoError::InvalidWrite(format!(
                "write context {} was not opened by the `{}` context",
                write.token(),
                self.set
            )));
        }

        match self.writes.release(write.token()) {
            None => Err(RepoError::InvalidWrite(format!(
                "write context {} is no longer open",
                write.token()
            ))),
            Some(0) => self.flush(),
            Some(remaining) => {
                debug!(
                    "event=context_commit module=context status=deferred set={} open_write_contexts={}",
                    self.set, remaining
                );
                Ok(CommitSummary::default())
            }
        }
    }

    fn cancel_write(&self) {
        let discarded = std::mem::take(&mut *self.pending.lock()).len();
        self.writes.release_all();
        info!(
            "event=context_cancel module=context status=ok set={} discarded={}",
            self.set, discarded
        );
    }
}

#[cfg(test)]
mod tests {
    use super::StoreContext;
    use crate::context::{ContextBackend, MemoryBackend, PersistenceContext};
    use crate::error::RepoError;
    use crate::model::KeyedObject;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: i64,
        value: u32,
    }

    impl KeyedObject for Counter {
        fn id(&self) -> i64 {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }
    }

    fn counter(value: u32) -> Counter {
        Counter { id: 0, value }
    }

    #[test]
    fn writes_stay_pending_until_commit() {
        let backend = Arc::new(MemoryBackend::new());
        let context = StoreContext::<Counter>::open(backend.clone()).expect("open");
        assert!(context.is_valid());
        assert_eq!(context.set_name(), "Counter");

        let write = context.write_context();
        context.add(vec![counter(1), counter(2)]).expect("add");
        assert!(context.all().expect("all").is_empty());
        assert_eq!(context.pending_len(), 2);

        let summary = context.commit(write).expect("commit");
        assert!(summary.flushed);
        assert_eq!(summary.inserted, vec![1, 2]);

        let loaded = context.find(2).expect("find").expect("row 2");
        assert_eq!(loaded, Counter { id: 2, value: 2 });
        assert!(context.find(3).expect("find").is_none());
        assert_eq!(backend.row_count("Counter"), 2);
    }

    #[test]
    fn nested_write_contexts_flush_on_last_commit() {
        let context = StoreContext::<Counter>::new(Arc::new(MemoryBackend::new()));
        let outer = context.write_context();
        let inner = context.write_context();
        context.add(vec![counter(7)]).expect("add");

        let deferred = context.commit(inner).expect("inner commit");
        assert!(!deferred.flushed);
        assert!(context.all().expect("all").is_empty());

        let flushed = context.commit(outer).expect("outer commit");
        assert!(flushed.flushed);
        assert_eq!(context.all().expect("all").len(), 1);
    }

    #[test]
    fn cancel_discards_pending_and_invalidates_tokens() {
        let context = StoreContext::<Counter>::new(Arc::new(MemoryBackend::new()));
        let write = context.write_context();
        context.add(vec![counter(1)]).expect("add");
        context.cancel_write();

        let err = context.commit(write).expect_err("cancelled token must fail");
        assert!(matches!(err, RepoError::InvalidWrite(_)));
        assert_eq!(context.pending_len(), 0);
    }

    #[test]
    fn rejects_foreign_write_context() {
        let backend: Arc<dyn ContextBackend> = Arc::new(MemoryBackend::new());
        let first = StoreContext::<Counter>::new(backend.clone());
        let second = StoreContext::<Counter>::new(backend);
        let foreign = first.write_context();

        let err = second.commit(foreign).expect_err("foreign token must fail");
        assert!(matches!(err, RepoError::InvalidWrite(_)));
    }

    #[test]
    fn updates_of_unpersisted_rows_are_skipped() {
        let context = StoreContext::<Counter>::new(Arc::new(MemoryBackend::new()));
        let write = context.write_context();
        context.update(vec![counter(3)]).expect("update");
        context.delete(vec![counter(4)]).expect("delete");
        let summary = context.commit(write).expect("commit");
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.updated, 0);
    }

    #[test]
    fn find_range_keeps_request_order() {
        let context = StoreContext::<Counter>::new(Arc::new(MemoryBackend::new()));
        let write = context.write_context();
        context
            .add(vec![counter(10), counter(20), counter(30)])
            .expect("add");
        context.commit(write).expect("commit");

        let found = context.find_range(&[3, 9, 1]).expect("range");
        let values: Vec<u32> = found.iter().map(|item| item.value).collect();
        assert_eq!(values, vec![30, 10]);
    }
}
