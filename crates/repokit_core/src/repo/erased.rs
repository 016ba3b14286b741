//! Repository operations for callers that only know the entity type at runtime.
//!
//! # Responsibility
//! - Accept rows as `dyn Any` and hand them back as `dyn KeyedObject`.
//! - Expose GUID and external-id lookups when the layer has an identity.
//!
//! # Invariants
//! - A value of any type other than the repository's entity fails the whole
//!   call with `TypeMismatch` before anything is staged.
//! - Erased calls run the same stages, visibility filter and delete mode as
//!   the typed repository built on the same core.

use crate::context::{CommitSummary, WriteContext};
use crate::error::{RepoError, RepoResult};
use crate::model::keyed::short_type_name;
use crate::model::{Entity, EntityKey, KeyedObject, Persistable};
use crate::repo::capability::KeyedRepo;
use crate::repo::core::{IdentityAccess, RepoCore};
use async_trait::async_trait;
use std::any::{Any, TypeId};
use uuid::Uuid;

/// Keyed operations with the entity type erased.
pub trait ErasedRepo: Send + Sync {
    fn entity_type(&self) -> TypeId;

    fn add(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()>;

    fn update(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()>;

    fn delete(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()>;

    fn add_or_update(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()>;

    /// Every visible row.
    fn all(&self) -> RepoResult<Vec<Box<dyn KeyedObject>>>;

    fn find(&self, id: i64) -> RepoResult<Option<Box<dyn KeyedObject>>>;

    fn find_range(&self, ids: &[i64]) -> RepoResult<Vec<Box<dyn KeyedObject>>>;

    /// Lookup by a key whose type is only known at runtime.
    fn find_any(&self, key: &dyn Any) -> RepoResult<Option<Box<dyn KeyedObject>>>;

    fn add_copy(&self, item: &dyn Any) -> RepoResult<()>;

    fn shallow_clone(&self, item: &dyn Any) -> RepoResult<Box<dyn KeyedObject>>;

    /// Natural-key lookups; `None` for keyed-only layers.
    fn entities(&self) -> Option<&dyn ErasedEntities>;

    fn write_context(&self) -> WriteContext;

    fn commit(&self, write: WriteContext) -> RepoResult<CommitSummary>;
}

/// GUID and external-id lookups with the entity type erased.
pub trait ErasedEntities: Send + Sync {
    fn find_by_guid(&self, guid: Uuid) -> RepoResult<Option<Box<dyn Entity>>>;

    fn find_by_external_id(&self, external_id: &str) -> RepoResult<Option<Box<dyn Entity>>>;

    fn find_range_by_guids(&self, guids: &[Uuid]) -> RepoResult<Vec<Box<dyn Entity>>>;

    fn find_range_by_external_ids(
        &self,
        external_ids: &[&str],
    ) -> RepoResult<Vec<Box<dyn Entity>>>;
}

/// Typed repository view over a bare core, so erased calls reuse the
/// default `KeyedRepo` behavior.
struct CoreView<'a, T: Persistable>(&'a RepoCore<T>);

#[async_trait]
impl<'a, T: Persistable> KeyedRepo<T> for CoreView<'a, T> {
    fn core(&self) -> &RepoCore<T> {
        self.0
    }
}

fn foreign<T>() -> RepoError {
    RepoError::type_mismatch(short_type_name::<T>(), "value of another type")
}

fn downcast_all<T: Persistable>(items: Vec<Box<dyn Any + Send>>) -> RepoResult<Vec<T>> {
    items
        .into_iter()
        .map(|item| {
            item.downcast::<T>()
                .map(|item| *item)
                .map_err(|_| foreign::<T>())
        })
        .collect()
}

fn downcast_ref<T: Persistable>(item: &dyn Any) -> RepoResult<&T> {
    item.downcast_ref::<T>().ok_or_else(foreign::<T>)
}

fn keyed<T: Persistable>(item: T) -> Box<dyn KeyedObject> {
    Box::new(item)
}

impl<T: Persistable> RepoCore<T> {
    fn view(&self) -> CoreView<'_, T> {
        CoreView(self)
    }

    fn entity_access(&self) -> RepoResult<IdentityAccess<T>> {
        self.identity().ok_or_else(|| {
            RepoError::type_mismatch(
                "entity",
                format!("keyed-only `{}`", short_type_name::<T>()),
            )
        })
    }

    fn find_entity_by(&self, key: EntityKey) -> RepoResult<Option<Box<dyn Entity>>> {
        let access = self.entity_access()?;
        Ok(self.view().find_key(&key)?.map(|item| access.boxed(item)))
    }

    fn entities_where(&self, matches: &dyn Fn(&T) -> bool) -> RepoResult<Vec<Box<dyn Entity>>> {
        let access = self.entity_access()?;
        let mut found = self.view().where_(matches)?;
        found.sort_by_key(|item| item.id());
        Ok(found.into_iter().map(|item| access.boxed(item)).collect())
    }
}

impl<T: Persistable> ErasedRepo for RepoCore<T> {
    fn entity_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn add(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()> {
        self.view().add(downcast_all(items)?)
    }

    fn update(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()> {
        self.view().update(downcast_all(items)?)
    }

    fn delete(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()> {
        self.view().delete(downcast_all(items)?)
    }

    fn add_or_update(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()> {
        self.view().add_or_update(downcast_all(items)?)
    }

    fn all(&self) -> RepoResult<Vec<Box<dyn KeyedObject>>> {
        Ok(self.view().all()?.into_iter().map(keyed).collect())
    }

    fn find(&self, id: i64) -> RepoResult<Option<Box<dyn KeyedObject>>> {
        Ok(self.view().find(id)?.map(keyed))
    }

    fn find_range(&self, ids: &[i64]) -> RepoResult<Vec<Box<dyn KeyedObject>>> {
        Ok(self.view().find_range(ids)?.into_iter().map(keyed).collect())
    }

    fn find_any(&self, key: &dyn Any) -> RepoResult<Option<Box<dyn KeyedObject>>> {
        Ok(self.view().find_any(key)?.map(keyed))
    }

    fn add_copy(&self, item: &dyn Any) -> RepoResult<()> {
        let view = self.view();
        view.add_copy(downcast_ref::<T>(item)?)
    }

    fn shallow_clone(&self, item: &dyn Any) -> RepoResult<Box<dyn KeyedObject>> {
        let view = self.view();
        Ok(keyed(view.shallow_clone(downcast_ref::<T>(item)?)))
    }

    fn entities(&self) -> Option<&dyn ErasedEntities> {
        self.identity().map(|_| self as &dyn ErasedEntities)
    }

    fn write_context(&self) -> WriteContext {
        self.view().write_context()
    }

    fn commit(&self, write: WriteContext) -> RepoResult<CommitSummary> {
        self.view().commit(write)
    }
}

impl<T: Persistable> ErasedEntities for RepoCore<T> {
    fn find_by_guid(&self, guid: Uuid) -> RepoResult<Option<Box<dyn Entity>>> {
        self.find_entity_by(EntityKey::Guid(guid))
    }

    fn find_by_external_id(&self, external_id: &str) -> RepoResult<Option<Box<dyn Entity>>> {
        self.find_entity_by(EntityKey::External(external_id.to_string()))
    }

    fn find_range_by_guids(&self, guids: &[Uuid]) -> RepoResult<Vec<Box<dyn Entity>>> {
        let access = self.entity_access()?;
        self.entities_where(&|item: &T| guids.contains(&access.get(item).guid))
    }

    fn find_range_by_external_ids(
        &self,
        external_ids: &[&str],
    ) -> RepoResult<Vec<Box<dyn Entity>>> {
        let access = self.entity_access()?;
        self.entities_where(&|item: &T| {
            let current = access.get(item).external_id.as_str();
            external_ids.iter().any(|external_id| *external_id == current)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ErasedRepo;
    use crate::context::{MemoryBackend, StoreContext};
    use crate::error::RepoError;
    use crate::model::KeyedObject;
    use crate::repo::core::RepoCore;
    use serde::{Deserialize, Serialize};
    use std::any::Any;
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

    fn store() -> Arc<StoreContext<Counter>> {
        let backend = Arc::new(MemoryBackend::new());
        Arc::new(StoreContext::<Counter>::open(backend).expect("open context"))
    }

    #[test]
    fn foreign_values_fail_before_staging() {
        let store = store();
        let core = RepoCore::<Counter>::new(store.clone());
        let items: Vec<Box<dyn Any + Send>> = vec![
            Box::new(Counter { id: 0, value: 1 }),
            Box::new("not a counter".to_string()),
        ];
        let err = ErasedRepo::add(&core, items).expect_err("mixed batch");
        assert!(matches!(err, RepoError::TypeMismatch { .. }));
        assert_eq!(store.pending_len(), 0);

        let items: Vec<Box<dyn Any + Send>> = vec![Box::new(Counter { id: 0, value: 2 })];
        ErasedRepo::add(&core, items).expect("typed batch");
        assert_eq!(store.pending_len(), 1);
    }

    #[test]
    fn keyed_only_cores_have_no_entity_view() {
        let core = RepoCore::<Counter>::new(store());
        assert!(core.entities().is_none());
    }
}
