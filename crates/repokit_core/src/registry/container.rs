//! Service bindings and the container that resolves them.
//!
//! # Invariants
//! - One binding per [`ServiceKey`]; a later registration replaces the earlier.
//! - Bindings are transient: every resolution runs the factory again.
//! - Resolving a missing binding fails with `NotRegistered`.

use crate::context::{ContextBackend, PersistenceContext};
use crate::error::{RepoError, RepoResult};
use crate::messaging::MessageBus;
use crate::model::keyed::short_type_name;
use crate::model::{AuditableEntity, Entity, KeyedObject, Persistable};
use crate::registry::capability::Capability;
use crate::repo::{AuditedRepo, IdentifiedRepo, KeyedRepo, Repository};
use log::debug;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Builds one service instance from the container.
pub type Factory<S> = Arc<dyn Fn(&ServiceContainer) -> RepoResult<Arc<S>> + Send + Sync>;

/// What a binding answers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Contract {
    /// The persistence context of the entity type.
    Context,
    /// A repository capability trait closed over the entity type.
    Interface(Capability),
    /// A concrete repository class closed over the entity type.
    Class(&'static str),
}

impl Display for Contract {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Context => f.write_str("PersistenceContext"),
            Self::Interface(capability) => f.write_str(capability.contract_name()),
            Self::Class(name) => f.write_str(name),
        }
    }
}

/// Closed service type: a contract applied to one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceKey {
    pub entity: &'static str,
    pub contract: Contract,
    pub entity_type: TypeId,
}

impl ServiceKey {
    pub fn new(entity: &'static str, entity_type: TypeId, contract: Contract) -> Self {
        Self {
            entity,
            contract,
            entity_type,
        }
    }

    pub fn of<T: ?Sized + 'static>(contract: Contract) -> Self {
        Self::new(short_type_name::<T>(), TypeId::of::<T>(), contract)
    }
}

impl Display for ServiceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<{}>", self.contract, self.entity)
    }
}

/// One service binding with its type-erased factory.
#[derive(Clone)]
pub struct Registration {
    key: ServiceKey,
    implementation: String,
    factory: Arc<dyn Any + Send + Sync>,
}

impl Registration {
    pub fn new<S: ?Sized + 'static>(
        key: ServiceKey,
        implementation: impl Into<String>,
        factory: Factory<S>,
    ) -> Self {
        Self {
            key,
            implementation: implementation.into(),
            factory: Arc::new(factory),
        }
    }

    /// Wraps a factory already erased by [`Registration::new`]'s scheme.
    pub(crate) fn erased(
        key: ServiceKey,
        implementation: impl Into<String>,
        factory: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            key,
            implementation: implementation.into(),
            factory,
        }
    }

    pub fn key(&self) -> ServiceKey {
        self.key
    }

    /// Closed implementation name, e.g. `AuditableRepository<User>`.
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    fn factory<S: ?Sized + 'static>(&self) -> Option<&Factory<S>> {
        self.factory.downcast_ref::<Factory<S>>()
    }
}

/// Sink for service bindings.
pub trait ServiceRegister {
    fn register(&mut self, registration: Registration);
}

/// Row of the container's binding table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub service: String,
    pub implementation: String,
}

/// In-process service container.
#[derive(Default)]
pub struct ServiceContainer {
    registrations: BTreeMap<ServiceKey, Registration>,
    bus: Option<Arc<MessageBus>>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repositories built by this container publish lifecycle events on `bus`.
    pub fn with_bus(mut self, bus: Arc<MessageBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn bus(&self) -> Option<Arc<MessageBus>> {
        self.bus.clone()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.registrations.contains_key(key)
    }

    pub fn implementation_of(&self, key: &ServiceKey) -> Option<&str> {
        self.registrations
            .get(key)
            .map(Registration::implementation)
    }

    /// Snapshot of every binding, ordered by entity then contract.
    pub fn bindings(&self) -> Vec<Binding> {
        self.registrations
            .values()
            .map(|registration| Binding {
                service: registration.key.to_string(),
                implementation: registration.implementation.clone(),
            })
            .collect()
    }

    pub fn resolve<S: ?Sized + 'static>(&self, key: &ServiceKey) -> RepoResult<Arc<S>> {
        let registration = self
            .registrations
            .get(key)
            .ok_or_else(|| RepoError::NotRegistered(key.to_string()))?;
        let factory = registration.factory::<S>().ok_or_else(|| {
            RepoError::type_mismatch(key.to_string(), registration.implementation.clone())
        })?;
        factory(self)
    }

    /// Storage behind the canonical context, bound without an entity type.
    pub fn backend(&self) -> RepoResult<Arc<dyn ContextBackend>> {
        self.resolve(&ServiceKey::of::<dyn KeyedObject>(Contract::Context))
    }

    pub fn context<T: Persistable>(&self) -> RepoResult<Arc<dyn PersistenceContext<T>>> {
        self.resolve(&ServiceKey::of::<T>(Contract::Context))
    }

    pub fn keyed<T: Persistable>(&self) -> RepoResult<Arc<dyn KeyedRepo<T>>> {
        self.resolve(&ServiceKey::of::<T>(Contract::Interface(Capability::Keyed)))
    }

    pub fn identified<T: Persistable + Entity>(&self) -> RepoResult<Arc<dyn IdentifiedRepo<T>>> {
        self.resolve(&ServiceKey::of::<T>(Contract::Interface(
            Capability::Identified,
        )))
    }

    pub fn audited<T: Persistable + AuditableEntity>(
        &self,
    ) -> RepoResult<Arc<dyn AuditedRepo<T>>> {
        self.resolve(&ServiceKey::of::<T>(Contract::Interface(Capability::Audited)))
    }

    /// Repository bound under class `name` for entity `T`.
    pub fn class<T: 'static>(&self, name: &'static str) -> RepoResult<Arc<dyn Repository>> {
        self.resolve(&ServiceKey::of::<T>(Contract::Class(name)))
    }

    /// Like [`Self::class`], downcast to the concrete repository type.
    pub fn class_as<T: 'static, R: Repository>(&self, name: &'static str) -> RepoResult<Arc<R>> {
        let repository = self.class::<T>(name)?;
        let found = repository.repository_name();
        repository
            .into_any()
            .downcast::<R>()
            .map_err(|_| RepoError::type_mismatch(short_type_name::<R>(), found))
    }
}

impl ServiceRegister for ServiceContainer {
    fn register(&mut self, registration: Registration) {
        let key = registration.key;
        let implementation = registration.implementation.clone();
        if let Some(previous) = self.registrations.insert(key, registration) {
            debug!(
                "event=service_register module=registry status=replaced service={} previous={} implementation={}",
                key, previous.implementation, implementation
            );
        } else {
            debug!(
                "event=service_register module=registry status=ok service={} implementation={}",
                key, implementation
            );
        }
    }
}
