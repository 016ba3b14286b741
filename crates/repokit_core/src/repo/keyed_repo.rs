//! Generic repository for any keyed object.

use crate::context::PersistenceContext;
use crate::error::RepoResult;
use crate::messaging::{MessageBus, WriteHook};
use crate::model::keyed::short_type_name;
use crate::model::Persistable;
use crate::registry::{Capability, GenericRepository, InterfaceSet, RepositoryType};
use crate::repo::capability::KeyedRepo;
use crate::repo::core::RepoCore;
use crate::repo::{ErasedRepo, Repository};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

pub const KEYED_REPOSITORY: GenericRepository =
    GenericRepository::new("KeyedRepository", 1, Capability::Keyed);

/// Forwards every operation to the injected context.
pub struct KeyedRepository<T: Persistable> {
    core: RepoCore<T>,
}

impl<T: Persistable> KeyedRepository<T> {
    pub fn new(context: Arc<dyn PersistenceContext<T>>) -> Self {
        Self::from_core(RepoCore::new(context))
    }

    pub fn try_new(
        context: Option<Arc<dyn PersistenceContext<T>>>,
        bus: Option<Arc<MessageBus>>,
    ) -> RepoResult<Self> {
        Ok(Self::from_core(RepoCore::try_new(
            KEYED_REPOSITORY.name,
            context,
            bus,
        )?))
    }

    pub fn from_core(core: RepoCore<T>) -> Self {
        Self { core }
    }

    /// Appends a before-write stage owned by this repository.
    pub fn with_stage(self, stage: Arc<dyn WriteHook<T>>) -> Self {
        Self {
            core: self.core.with_stage(stage),
        }
    }
}

#[async_trait]
impl<T: Persistable> KeyedRepo<T> for KeyedRepository<T> {
    fn core(&self) -> &RepoCore<T> {
        &self.core
    }
}

impl<T: Persistable> Repository for KeyedRepository<T> {
    fn repository_name(&self) -> &'static str {
        KEYED_REPOSITORY.name
    }

    fn entity_name(&self) -> &'static str {
        short_type_name::<T>()
    }

    fn is_ready(&self) -> bool {
        self.is_valid()
    }

    fn erased(&self) -> &dyn ErasedRepo {
        &self.core
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<T: Persistable> RepositoryType<T> for KeyedRepository<T> {
    const NAME: &'static str = KEYED_REPOSITORY.name;
    const BASES: &'static [&'static str] = &[];

    fn construct(
        context: Option<Arc<dyn PersistenceContext<T>>>,
        bus: Option<Arc<MessageBus>>,
    ) -> RepoResult<Self> {
        Self::try_new(context, bus)
    }

    fn interfaces(set: &mut InterfaceSet<T, Self>) {
        set.keyed();
    }
}
