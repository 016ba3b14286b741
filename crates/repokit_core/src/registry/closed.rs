//! Repository types closed over one entity type.
//!
//! # Responsibility
//! - Describe a concrete repository type: name, base chain, contracts.
//! - Turn that description into container registrations.
//!
//! # Invariants
//! - `BASES` lists ancestor repository names, nearest first.
//! - Every registration of one closed repository builds the same type.

use crate::context::PersistenceContext;
use crate::error::{RepoError, RepoResult};
use crate::messaging::MessageBus;
use crate::model::keyed::short_type_name;
use crate::model::{AuditableEntity, Entity, Persistable};
use crate::registry::capability::Capability;
use crate::registry::container::{Contract, Factory, Registration, ServiceContainer, ServiceKey};
use crate::repo::{AuditedRepo, IdentifiedRepo, KeyedRepo, Repository};
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Concrete repository type the registrar can bind.
pub trait RepositoryType<T: Persistable>: KeyedRepo<T> + Repository + Sized {
    /// Unparameterized type name.
    const NAME: &'static str;
    /// Ancestor repository names, nearest first.
    const BASES: &'static [&'static str];

    /// Builds an instance; a missing context must fail with `ArgumentNull`.
    fn construct(
        context: Option<Arc<dyn PersistenceContext<T>>>,
        bus: Option<Arc<MessageBus>>,
    ) -> RepoResult<Self>;

    /// Declares the capability contracts this type is bound under.
    fn interfaces(set: &mut InterfaceSet<T, Self>);
}

#[derive(Clone)]
struct ExposedInterface {
    capability: Capability,
    factory: Arc<dyn Any + Send + Sync>,
}

/// Collects the contracts a [`RepositoryType`] exposes.
pub struct InterfaceSet<T, R> {
    build: Factory<R>,
    exposed: Vec<ExposedInterface>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Persistable, R: RepositoryType<T>> InterfaceSet<T, R> {
    fn new(build: Factory<R>) -> Self {
        Self {
            build,
            exposed: Vec::new(),
            _entity: PhantomData,
        }
    }

    fn expose<S: ?Sized + 'static>(&mut self, capability: Capability, factory: Factory<S>) {
        self.exposed.retain(|exposed| exposed.capability != capability);
        self.exposed.push(ExposedInterface {
            capability,
            factory: Arc::new(factory),
        });
    }

    pub fn keyed(&mut self) {
        let build = self.build.clone();
        let factory: Factory<dyn KeyedRepo<T>> =
            Arc::new(move |container: &ServiceContainer| -> RepoResult<Arc<dyn KeyedRepo<T>>> {
                Ok(build(container)?)
            });
        self.expose(Capability::Keyed, factory);
    }

    pub fn identified(&mut self)
    where
        T: Entity,
        R: IdentifiedRepo<T>,
    {
        let build = self.build.clone();
        let factory: Factory<dyn IdentifiedRepo<T>> = Arc::new(
            move |container: &ServiceContainer| -> RepoResult<Arc<dyn IdentifiedRepo<T>>> {
                Ok(build(container)?)
            },
        );
        self.expose(Capability::Identified, factory);
    }

    pub fn audited(&mut self)
    where
        T: AuditableEntity,
        R: AuditedRepo<T>,
    {
        let build = self.build.clone();
        let factory: Factory<dyn AuditedRepo<T>> = Arc::new(
            move |container: &ServiceContainer| -> RepoResult<Arc<dyn AuditedRepo<T>>> {
                Ok(build(container)?)
            },
        );
        self.expose(Capability::Audited, factory);
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        self.exposed.iter().map(|exposed| exposed.capability).collect()
    }
}

/// Repository type closed over one entity type, ready to register.
#[derive(Clone)]
pub struct ClosedRepository {
    name: &'static str,
    bases: &'static [&'static str],
    entity: &'static str,
    entity_type: TypeId,
    class: Factory<dyn Repository>,
    interfaces: Vec<ExposedInterface>,
}

impl ClosedRepository {
    pub fn of<T: Persistable, R: RepositoryType<T>>() -> Self {
        let build: Factory<R> = Arc::new(|container: &ServiceContainer| -> RepoResult<Arc<R>> {
            let context = match container.context::<T>() {
                Ok(context) => Some(context),
                Err(RepoError::NotRegistered(_)) => None,
                Err(err) => return Err(err),
            };
            Ok(Arc::new(R::construct(context, container.bus())?))
        });

        let mut set = InterfaceSet::<T, R>::new(build.clone());
        R::interfaces(&mut set);

        let class: Factory<dyn Repository> = Arc::new(
            move |container: &ServiceContainer| -> RepoResult<Arc<dyn Repository>> {
                Ok(build(container)?)
            },
        );

        Self {
            name: R::NAME,
            bases: R::BASES,
            entity: short_type_name::<T>(),
            entity_type: TypeId::of::<T>(),
            class,
            interfaces: set.exposed,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bases(&self) -> &'static [&'static str] {
        self.bases
    }

    pub fn depth(&self) -> usize {
        self.bases.len() + 1
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    pub fn entity_type(&self) -> TypeId {
        self.entity_type
    }

    /// Closed display name, e.g. `AuditableRepository<User>`.
    pub fn closed_name(&self) -> String {
        format!("{}<{}>", self.name, self.entity)
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        self.interfaces
            .iter()
            .map(|exposed| exposed.capability)
            .collect()
    }

    fn key(&self, contract: Contract) -> ServiceKey {
        ServiceKey::new(self.entity, self.entity_type, contract)
    }

    /// Own class, every base class, then every exposed contract.
    pub fn registrations(&self) -> Vec<Registration> {
        let implementation = self.closed_name();
        let mut registrations = Vec::with_capacity(1 + self.bases.len() + self.interfaces.len());
        for name in std::iter::once(self.name).chain(self.bases.iter().copied()) {
            registrations.push(Registration::new(
                self.key(Contract::Class(name)),
                implementation.clone(),
                self.class.clone(),
            ));
        }
        for exposed in &self.interfaces {
            registrations.push(Registration::erased(
                self.key(Contract::Interface(exposed.capability)),
                implementation.clone(),
                exposed.factory.clone(),
            ));
        }
        registrations
    }
}
