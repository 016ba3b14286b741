//! Generic repository for entities with a natural identity.

use crate::context::PersistenceContext;
use crate::error::RepoResult;
use crate::messaging::{MessageBus, WriteHook};
use crate::model::keyed::short_type_name;
use crate::model::{Entity, Persistable};
use crate::registry::{Capability, GenericRepository, InterfaceSet, RepositoryType};
use crate::repo::capability::{IdentifiedRepo, KeyedRepo};
use crate::repo::core::{IdentityAccess, RepoCore};
use crate::repo::keyed_repo::{KeyedRepository, KEYED_REPOSITORY};
use crate::repo::{ErasedRepo, Repository};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

pub const ENTITY_REPOSITORY: GenericRepository =
    GenericRepository::new("EntityRepository", 2, Capability::Identified);

/// Keyed repository that also resolves rows by GUID and external id.
///
/// Shallow clones receive a fresh GUID whose string form becomes the
/// external id.
pub struct EntityRepository<T: Persistable + Entity> {
    base: KeyedRepository<T>,
}

impl<T: Persistable + Entity> EntityRepository<T> {
    pub fn new(context: Arc<dyn PersistenceContext<T>>) -> Self {
        Self::from_core(RepoCore::new(context))
    }

    pub fn try_new(
        context: Option<Arc<dyn PersistenceContext<T>>>,
        bus: Option<Arc<MessageBus>>,
    ) -> RepoResult<Self> {
        Ok(Self::from_core(RepoCore::try_new(
            ENTITY_REPOSITORY.name,
            context,
            bus,
        )?))
    }

    pub fn from_core(core: RepoCore<T>) -> Self {
        Self {
            base: KeyedRepository::from_core(core.with_identity(IdentityAccess::of())),
        }
    }

    pub fn with_stage(self, stage: Arc<dyn WriteHook<T>>) -> Self {
        Self {
            base: self.base.with_stage(stage),
        }
    }

    pub fn base(&self) -> &KeyedRepository<T> {
        &self.base
    }
}

#[async_trait]
impl<T: Persistable + Entity> KeyedRepo<T> for EntityRepository<T> {
    fn core(&self) -> &RepoCore<T> {
        self.base.core()
    }
}

impl<T: Persistable + Entity> IdentifiedRepo<T> for EntityRepository<T> {}

impl<T: Persistable + Entity> Repository for EntityRepository<T> {
    fn repository_name(&self) -> &'static str {
        ENTITY_REPOSITORY.name
    }

    fn entity_name(&self) -> &'static str {
        short_type_name::<T>()
    }

    fn is_ready(&self) -> bool {
        self.is_valid()
    }

    fn erased(&self) -> &dyn ErasedRepo {
        self.core()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<T: Persistable + Entity> RepositoryType<T> for EntityRepository<T> {
    const NAME: &'static str = ENTITY_REPOSITORY.name;
    const BASES: &'static [&'static str] = &[KEYED_REPOSITORY.name];

    fn construct(
        context: Option<Arc<dyn PersistenceContext<T>>>,
        bus: Option<Arc<MessageBus>>,
    ) -> RepoResult<Self> {
        Self::try_new(context, bus)
    }

    fn interfaces(set: &mut InterfaceSet<T, Self>) {
        set.keyed();
        set.identified();
    }
}
