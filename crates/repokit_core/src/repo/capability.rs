//! Repository capability traits.
//!
//! # Responsibility
//! - `KeyedRepo`: surrogate-key CRUD, lookups, predicates and commit scoping.
//! - `IdentifiedRepo`: GUID and external-id lookups.
//! - `AuditedRepo`: tombstone-aware reads, audit notifications, restore.
//!
//! # Invariants
//! - Default methods only reach storage through `core().context()`.
//! - `where_*` sees the context's unfiltered set; `all()` sees visible rows.
//! - Natural-key lookups return the lowest-keyed match when several rows
//!   share a GUID or external id.

use crate::context::{CommitSummary, PersistenceContext, WriteContext};
use crate::error::{RepoError, RepoResult};
use crate::messaging::{LifecycleEvent, WriteHook};
use crate::model::keyed::short_type_name;
use crate::model::{AuditableEntity, Entity, EntityKey, KeyedObject, Persistable, UNPERSISTED_ID};
use crate::repo::auditable_repo::AuditStamper;
use crate::repo::core::{DeleteMode, IdentityAccess, RepoCore};
use crate::repo::predicate::ErasedPredicate;
use async_trait::async_trait;
use chrono::Utc;
use log::warn;
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

/// Surrogate-key repository over one entity type.
#[async_trait]
pub trait KeyedRepo<T: Persistable>: Send + Sync {
    fn core(&self) -> &RepoCore<T>;

    fn context(&self) -> &Arc<dyn PersistenceContext<T>> {
        self.core().context()
    }

    /// Whether the injected context has a backing set for `T`.
    fn is_valid(&self) -> bool {
        self.context().is_valid()
    }

    /// Every visible row.
    fn all(&self) -> RepoResult<Vec<T>> {
        let core = self.core();
        Ok(core
            .context()
            .all()?
            .into_iter()
            .filter(|item| core.is_visible(item))
            .collect())
    }

    fn add(&self, items: Vec<T>) -> RepoResult<()> {
        let items = self.core().prepare(LifecycleEvent::Creating, items)?;
        self.context().add(items)
    }

    fn update(&self, items: Vec<T>) -> RepoResult<()> {
        let items = self.core().prepare(LifecycleEvent::Updating, items)?;
        self.context().update(items)
    }

    /// Inserts unpersisted items and updates persisted ones.
    fn add_or_update(&self, mut items: Vec<T>) -> RepoResult<()> {
        for item in &mut items {
            let event = if item.is_persisted() {
                LifecycleEvent::Updating
            } else {
                LifecycleEvent::Creating
            };
            self.core().prepare_one(event, item)?;
        }
        self.context().add_or_update(items)
    }

    fn delete(&self, items: Vec<T>) -> RepoResult<()> {
        let core = self.core();
        let items = core.prepare(LifecycleEvent::Deleting, items)?;
        match core.delete_mode() {
            DeleteMode::Physical => self.context().delete(items),
            DeleteMode::Soft => self.context().update(items),
        }
    }

    fn find(&self, id: i64) -> RepoResult<Option<T>> {
        self.context().find(id)
    }

    fn find_range(&self, ids: &[i64]) -> RepoResult<Vec<T>> {
        self.context().find_range(ids)
    }

    fn find_key(&self, key: &EntityKey) -> RepoResult<Option<T>> {
        let identity = match key {
            EntityKey::Surrogate(id) => return self.find(*id),
            natural => self.core().identity().ok_or_else(|| {
                RepoError::type_mismatch(
                    "surrogate key",
                    format!("{} key for `{}`", natural.kind(), short_type_name::<T>()),
                )
            })?,
        };
        let matches = self.where_(&|item: &T| natural_key_matches(identity, item, key))?;
        Ok(first_match::<T>(matches, key))
    }

    /// Resolves a key whose type is only known at runtime.
    fn find_any(&self, key: &dyn Any) -> RepoResult<Option<T>> {
        self.find_key(&EntityKey::from_any(key)?)
    }

    /// Re-reads `item` by surrogate key, or by GUID while unpersisted.
    fn find_entity(&self, item: &T) -> RepoResult<Option<T>> {
        if item.is_persisted() {
            return self.find(item.id());
        }
        match self.core().identity() {
            Some(identity) => self.find_key(&EntityKey::Guid(identity.get(item).guid)),
            None => Ok(None),
        }
    }

    fn find_entities(&self, items: &[T]) -> RepoResult<Vec<T>> {
        let mut found = Vec::with_capacity(items.len());
        for item in items {
            if let Some(current) = self.find_entity(item)? {
                found.push(current);
            }
        }
        Ok(found)
    }

    /// Copy of `item` ready to be inserted as a new row.
    ///
    /// The copy is unpersisted and carries a fresh identity; layers may clear
    /// further state through [`RepoCore::with_clone_reset`].
    fn shallow_clone(&self, item: &T) -> T {
        let mut copy = item.clone();
        copy.set_id(UNPERSISTED_ID);
        if let Some(identity) = self.core().identity() {
            identity.get_mut(&mut copy).regenerate();
        }
        self.core().reset_clone(&mut copy);
        copy
    }

    fn add_copy(&self, item: &T) -> RepoResult<()> {
        self.add(vec![self.shallow_clone(item)])
    }

    fn add_or_update_copy(&self, item: &T) -> RepoResult<()> {
        self.add_or_update(vec![self.shallow_clone(item)])
    }

    fn where_(&self, predicate: &dyn Fn(&T) -> bool) -> RepoResult<Vec<T>> {
        Ok(self
            .context()
            .all()?
            .into_iter()
            .filter(|item| predicate(item))
            .collect())
    }

    fn where_erased(&self, predicate: &ErasedPredicate) -> RepoResult<Vec<T>> {
        predicate.bind::<T>()?;
        self.where_(&|item: &T| predicate.test(item))
    }

    fn write_context(&self) -> WriteContext {
        self.context().write_context()
    }

    fn commit(&self, write: WriteContext) -> RepoResult<CommitSummary> {
        self.context().commit(write)
    }

    async fn commit_async(&self, write: WriteContext) -> RepoResult<CommitSummary> {
        self.context().commit_async(write).await
    }

    fn cancel_write(&self) {
        self.context().cancel_write()
    }
}

fn natural_key_matches<T>(identity: IdentityAccess<T>, item: &T, key: &EntityKey) -> bool {
    let current = identity.get(item);
    match key {
        EntityKey::Guid(guid) => current.guid == *guid,
        EntityKey::External(external_id) => current.external_id == *external_id,
        EntityKey::Surrogate(_) => false,
    }
}

fn first_match<T: KeyedObject>(mut matches: Vec<T>, key: &EntityKey) -> Option<T> {
    if matches.len() > 1 {
        warn!(
            "event=natural_key_lookup module=repo status=ambiguous entity={} key={} matches={}",
            short_type_name::<T>(),
            key,
            matches.len()
        );
    }
    matches.sort_by_key(|item| item.id());
    matches.into_iter().next()
}

/// Repository over entities carrying a GUID and an external id.
pub trait IdentifiedRepo<T: Persistable + Entity>: KeyedRepo<T> {
    fn find_by_guid(&self, guid: Uuid) -> RepoResult<Option<T>> {
        let key = EntityKey::Guid(guid);
        let matches = self.where_(&|item: &T| item.guid() == guid)?;
        Ok(first_match::<T>(matches, &key))
    }

    fn find_by_external_id(&self, external_id: &str) -> RepoResult<Option<T>> {
        let key = EntityKey::External(external_id.to_string());
        let matches = self.where_(&|item: &T| item.external_id() == external_id)?;
        Ok(first_match::<T>(matches, &key))
    }

    /// Rows whose GUID is in `guids`, ordered by surrogate key.
    fn find_range_by_guids(&self, guids: &[Uuid]) -> RepoResult<Vec<T>> {
        let mut found = self.where_(&|item: &T| guids.contains(&item.guid()))?;
        found.sort_by_key(|item| item.id());
        Ok(found)
    }

    fn find_range_by_external_ids(&self, external_ids: &[&str]) -> RepoResult<Vec<T>> {
        let mut found = self.where_(&|item: &T| {
            external_ids.iter().any(|external_id| *external_id == item.external_id())
        })?;
        found.sort_by_key(|item| item.id());
        Ok(found)
    }
}

/// Repository over entities with audit stamps and soft deletion.
pub trait AuditedRepo<T: Persistable + AuditableEntity>: IdentifiedRepo<T> {
    /// Every row, tombstoned ones included.
    fn all_including_deleted(&self) -> RepoResult<Vec<T>> {
        self.context().all()
    }

    fn accept_creating(&self, target: &mut T) -> RepoResult<()> {
        AuditStamper.before_write(LifecycleEvent::Creating, target)
    }

    fn accept_updating(&self, target: &mut T) -> RepoResult<()> {
        AuditStamper.before_write(LifecycleEvent::Updating, target)
    }

    fn accept_deleting(&self, target: &mut T) -> RepoResult<()> {
        AuditStamper.before_write(LifecycleEvent::Deleting, target)
    }

    /// Clears the tombstone of `items` and persists them as updates.
    fn restore(&self, mut items: Vec<T>) -> RepoResult<()> {
        let now = Utc::now();
        for item in &mut items {
            item.audit_mut().stamp_restored(now);
        }
        self.context().update(items)
    }
}
