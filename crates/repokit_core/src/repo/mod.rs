//! Generic repositories over persistence contexts.
//!
//! # Responsibility
//! - Provide the three generic layers: keyed, entity, auditable.
//! - Run before-write stages and bus subscribers ahead of each write.
//! - Offer every layer through the non-generic [`Repository`] surface.
//!
//! # Invariants
//! - Repositories never own their context; it is injected at construction.
//! - A repository built without a context fails with `ArgumentNull`.
//! - Each layer is a strict extension of the one it wraps.
//!
//! # See also
//! - `crate::registry` for how layers are closed over entity types and bound.

use crate::error::RepoResult;
use crate::model::{KeyedObject, Persistable};
use std::any::Any;
use std::sync::Arc;

pub mod auditable_repo;
pub mod capability;
pub mod core;
pub mod entity_repo;
pub mod erased;
pub mod keyed_repo;
pub mod predicate;

pub use auditable_repo::{AuditStamper, AuditableRepository, AUDITABLE_REPOSITORY};
pub use capability::{AuditedRepo, IdentifiedRepo, KeyedRepo};
pub use self::core::{DeleteMode, IdentityAccess, RepoCore};
pub use entity_repo::{EntityRepository, ENTITY_REPOSITORY};
pub use erased::{ErasedEntities, ErasedRepo};
pub use keyed_repo::{KeyedRepository, KEYED_REPOSITORY};
pub use predicate::ErasedPredicate;

/// Non-generic view of any repository instance.
///
/// The `*_erased` operations take and return rows without naming the entity
/// type; values of another type fail with `TypeMismatch`.
pub trait Repository: Send + Sync + 'static {
    /// Unparameterized type name, e.g. `AuditableRepository`.
    fn repository_name(&self) -> &'static str;

    fn entity_name(&self) -> &'static str;

    /// Whether the backing set exists.
    fn is_ready(&self) -> bool;

    /// Entity-agnostic operations over this repository's core.
    fn erased(&self) -> &dyn ErasedRepo;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    fn add_erased(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()> {
        self.erased().add(items)
    }

    fn update_erased(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()> {
        self.erased().update(items)
    }

    fn delete_erased(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()> {
        self.erased().delete(items)
    }

    fn add_or_update_erased(&self, items: Vec<Box<dyn Any + Send>>) -> RepoResult<()> {
        self.erased().add_or_update(items)
    }

    /// Every visible row as a keyed object.
    fn all_keyed(&self) -> RepoResult<Vec<Box<dyn KeyedObject>>> {
        self.erased().all()
    }

    fn find_erased(&self, id: i64) -> RepoResult<Option<Box<dyn KeyedObject>>> {
        self.erased().find(id)
    }

    fn find_range_erased(&self, ids: &[i64]) -> RepoResult<Vec<Box<dyn KeyedObject>>> {
        self.erased().find_range(ids)
    }

    fn find_any_erased(&self, key: &dyn Any) -> RepoResult<Option<Box<dyn KeyedObject>>> {
        self.erased().find_any(key)
    }

    fn add_copy_erased(&self, item: &dyn Any) -> RepoResult<()> {
        self.erased().add_copy(item)
    }

    fn shallow_clone_erased(&self, item: &dyn Any) -> RepoResult<Box<dyn KeyedObject>> {
        self.erased().shallow_clone(item)
    }

    /// GUID and external-id lookups, when the entity has an identity.
    fn entities(&self) -> Option<&dyn ErasedEntities> {
        self.erased().entities()
    }
}

/// Visible rows of `repo` that convert into `U`.
pub fn of_type<T, U, R>(repo: &R) -> RepoResult<Vec<U>>
where
    T: Persistable,
    U: TryFrom<T>,
    R: KeyedRepo<T> + ?Sized,
{
    Ok(repo
        .all()?
        .into_iter()
        .filter_map(|item| U::try_from(item).ok())
        .collect())
}
