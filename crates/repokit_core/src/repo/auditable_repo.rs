//! Generic repository for auditable entities.
//!
//! # Invariants
//! - `all()` hides rows carrying `date_deleted`; `where_*` does not.
//! - Deleting never removes a row: it stamps `date_deleted` and
//!   `date_modified` with one instant and persists the row as an update.
//! - Shallow clones start with empty audit stamps.

use crate::context::PersistenceContext;
use crate::error::RepoResult;
use crate::messaging::{LifecycleEvent, MessageBus, WriteHook};
use crate::model::keyed::short_type_name;
use crate::model::{AuditStamps, AuditableEntity, Persistable};
use crate::registry::{Capability, GenericRepository, InterfaceSet, RepositoryType};
use crate::repo::capability::{AuditedRepo, IdentifiedRepo, KeyedRepo};
use crate::repo::core::{DeleteMode, RepoCore};
use crate::repo::entity_repo::{EntityRepository, ENTITY_REPOSITORY};
use crate::repo::keyed_repo::KEYED_REPOSITORY;
use crate::repo::{ErasedRepo, Repository};
use async_trait::async_trait;
use chrono::Utc;
use std::any::Any;
use std::sync::Arc;

pub const AUDITABLE_REPOSITORY: GenericRepository =
    GenericRepository::new("AuditableRepository", 3, Capability::Audited);

/// Stamps audit dates ahead of every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditStamper;

impl<T: AuditableEntity> WriteHook<T> for AuditStamper {
    fn before_write(&self, event: LifecycleEvent, target: &mut T) -> RepoResult<()> {
        let now = Utc::now();
        let audit = target.audit_mut();
        match event {
            LifecycleEvent::Creating => audit.stamp_created(now),
            LifecycleEvent::Updating => audit.stamp_modified(now),
            LifecycleEvent::Deleting => audit.stamp_deleted(now),
        }
        Ok(())
    }
}

fn not_deleted<T: AuditableEntity>(item: &T) -> bool {
    !item.is_deleted()
}

fn clear_audit<T: AuditableEntity>(item: &mut T) {
    *item.audit_mut() = AuditStamps::default();
}

pub struct AuditableRepository<T: Persistable + AuditableEntity> {
    base: EntityRepository<T>,
}

impl<T: Persistable + AuditableEntity> AuditableRepository<T> {
    pub fn new(context: Arc<dyn PersistenceContext<T>>) -> Self {
        Self::from_core(RepoCore::new(context))
    }

    pub fn try_new(
        context: Option<Arc<dyn PersistenceContext<T>>>,
        bus: Option<Arc<MessageBus>>,
    ) -> RepoResult<Self> {
        Ok(Self::from_core(RepoCore::try_new(
            AUDITABLE_REPOSITORY.name,
            context,
            bus,
        )?))
    }

    /// Installs audit stamping ahead of any stage already on `core`.
    pub fn from_core(core: RepoCore<T>) -> Self {
        let core = core
            .with_first_stage(Arc::new(AuditStamper))
            .with_visibility(not_deleted::<T>)
            .with_delete_mode(DeleteMode::Soft)
            .with_clone_reset(clear_audit::<T>);
        Self {
            base: EntityRepository::from_core(core),
        }
    }

    pub fn with_stage(self, stage: Arc<dyn WriteHook<T>>) -> Self {
        Self {
            base: self.base.with_stage(stage),
        }
    }

    pub fn base(&self) -> &EntityRepository<T> {
        &self.base
    }
}

#[async_trait]
impl<T: Persistable + AuditableEntity> KeyedRepo<T> for AuditableRepository<T> {
    fn core(&self) -> &RepoCore<T> {
        self.base.core()
    }
}

impl<T: Persistable + AuditableEntity> IdentifiedRepo<T> for AuditableRepository<T> {}

impl<T: Persistable + AuditableEntity> AuditedRepo<T> for AuditableRepository<T> {}

impl<T: Persistable + AuditableEntity> Repository for AuditableRepository<T> {
    fn repository_name(&self) -> &'static str {
        AUDITABLE_REPOSITORY.name
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

impl<T: Persistable + AuditableEntity> RepositoryType<T> for AuditableRepository<T> {
    const NAME: &'static str = AUDITABLE_REPOSITORY.name;
    const BASES: &'static [&'static str] = &[ENTITY_REPOSITORY.name, KEYED_REPOSITORY.name];

    fn construct(
        context: Option<Arc<dyn PersistenceContext<T>>>,
        bus: Option<Arc<MessageBus>>,
    ) -> RepoResult<Self> {
        Self::try_new(context, bus)
    }

    fn interfaces(set: &mut InterfaceSet<T, Self>) {
        set.keyed();
        set.identified();
        set.audited();
    }
}
