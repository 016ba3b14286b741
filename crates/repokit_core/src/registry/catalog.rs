//! Init-time catalog of everything the registrar may bind.
//!
//! # Responsibility
//! - Hold entity types, authored repositories, generic repositories and
//!   context implementations discovered at startup.
//! - Reject duplicate names as soon as they are declared.
//!
//! # Invariants
//! - Catalog iteration order is by name, never by declaration order.
//! - An entity descriptor can only close generics declared for its own type.

use crate::context::{ContextBackend, MemoryBackend, PersistenceContext, StoreContext};
use crate::db::SqliteBackend;
use crate::error::{RepoError, RepoResult};
use crate::model::keyed::short_type_name;
use crate::model::{AuditableEntity, Entity, KeyedObject, Persistable};
use crate::registry::capability::Capability;
use crate::registry::closed::{ClosedRepository, RepositoryType};
use crate::registry::container::{Contract, Factory, Registration, ServiceContainer, ServiceKey};
use crate::repo::{
    AuditableRepository, EntityRepository, KeyedRepository, AUDITABLE_REPOSITORY,
    ENTITY_REPOSITORY, KEYED_REPOSITORY,
};
use std::any::TypeId;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Open generic repository: closable over any entity meeting `constraint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericRepository {
    pub name: &'static str,
    /// Inheritance depth; deeper generics are more specialized.
    pub depth: usize,
    pub constraint: Capability,
}

impl GenericRepository {
    pub const fn new(name: &'static str, depth: usize, constraint: Capability) -> Self {
        Self {
            name,
            depth,
            constraint,
        }
    }
}

/// Opens the storage a context implementation runs on.
pub type BackendOpener = Arc<dyn Fn() -> RepoResult<Arc<dyn ContextBackend>> + Send + Sync>;

/// One persistence-context implementation.
#[derive(Clone)]
pub struct ContextDescriptor {
    name: &'static str,
    requires_configuration: bool,
    open: BackendOpener,
}

impl ContextDescriptor {
    pub fn new(name: &'static str, requires_configuration: bool, open: BackendOpener) -> Self {
        Self {
            name,
            requires_configuration,
            open,
        }
    }

    /// Zero-configuration context over a shared in-process store.
    pub fn memory(backend: Arc<MemoryBackend>) -> Self {
        Self::new(
            "MemoryContext",
            false,
            Arc::new(move || -> RepoResult<Arc<dyn ContextBackend>> { Ok(backend.clone()) }),
        )
    }

    /// SQLite-file context; not canonical until marked [`Self::configured`].
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(
            "SqliteContext",
            true,
            Arc::new(move || -> RepoResult<Arc<dyn ContextBackend>> {
                Ok(Arc::new(SqliteBackend::open(&path)?))
            }),
        )
    }

    /// Marks the descriptor as configured, making it a canonical candidate.
    pub fn configured(mut self) -> Self {
        self.requires_configuration = false;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the context needs explicit configuration to be constructed.
    pub fn requires_configuration(&self) -> bool {
        self.requires_configuration
    }

    pub fn open_backend(&self) -> RepoResult<Arc<dyn ContextBackend>> {
        (self.open)()
    }

    /// Entity-agnostic binding: the raw backend under `PersistenceContext<KeyedObject>`.
    pub(crate) fn backend_registration(&self) -> Registration {
        let context = self.clone();
        let factory: Factory<dyn ContextBackend> = Arc::new(
            move |_: &ServiceContainer| -> RepoResult<Arc<dyn ContextBackend>> {
                context.open_backend()
            },
        );
        Registration::new(
            ServiceKey::of::<dyn KeyedObject>(Contract::Context),
            format!("{}<{}>", self.name, short_type_name::<dyn KeyedObject>()),
            factory,
        )
    }
}

type Closer = fn() -> ClosedRepository;

/// One entity type and the generic repositories it can close.
#[derive(Clone)]
pub struct EntityDescriptor {
    name: &'static str,
    type_id: TypeId,
    capability: Capability,
    bind_context: fn(&ContextDescriptor) -> Registration,
    closers: BTreeMap<&'static str, Closer>,
}

impl EntityDescriptor {
    fn base<T: Persistable>(capability: Capability) -> Self {
        Self {
            name: short_type_name::<T>(),
            type_id: TypeId::of::<T>(),
            capability,
            bind_context: bind_context::<T>,
            closers: BTreeMap::new(),
        }
    }

    fn closing<T: Persistable, R: RepositoryType<T>>(mut self) -> Self {
        self.closers.insert(R::NAME, ClosedRepository::of::<T, R>);
        self
    }

    pub fn keyed<T: Persistable>() -> Self {
        Self::base::<T>(Capability::Keyed).closing::<T, KeyedRepository<T>>()
    }

    pub fn entity<T: Persistable + Entity>() -> Self {
        Self::base::<T>(Capability::Identified)
            .closing::<T, KeyedRepository<T>>()
            .closing::<T, EntityRepository<T>>()
    }

    pub fn auditable<T: Persistable + AuditableEntity>() -> Self {
        Self::base::<T>(Capability::Audited)
            .closing::<T, KeyedRepository<T>>()
            .closing::<T, EntityRepository<T>>()
            .closing::<T, AuditableRepository<T>>()
    }

    /// Lets a catalog-declared generic repository close over this entity.
    pub fn with_generic<T: Persistable, R: RepositoryType<T>>(self) -> RepoResult<Self> {
        if TypeId::of::<T>() != self.type_id {
            return Err(RepoError::InvalidCatalog(format!(
                "`{}` cannot be closed over `{}`: descriptor is for `{}`",
                R::NAME,
                short_type_name::<T>(),
                self.name
            )));
        }
        Ok(self.closing::<T, R>())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Whether `generic` accepts this entity and can be closed over it.
    pub fn accepts(&self, generic: &GenericRepository) -> bool {
        self.capability.satisfies(generic.constraint) && self.closers.contains_key(generic.name)
    }

    pub fn close(&self, generic: &GenericRepository) -> Option<ClosedRepository> {
        if !self.accepts(generic) {
            return None;
        }
        self.closers.get(generic.name).map(|close| close())
    }

    pub(crate) fn context_registration(&self, context: &ContextDescriptor) -> Registration {
        (self.bind_context)(context)
    }
}

fn bind_context<T: Persistable>(descriptor: &ContextDescriptor) -> Registration {
    let context = descriptor.clone();
    let factory: Factory<dyn PersistenceContext<T>> = Arc::new(
        move |_: &ServiceContainer| -> RepoResult<Arc<dyn PersistenceContext<T>>> {
            let backend = context.open_backend()?;
            Ok(Arc::new(StoreContext::<T>::open(backend)?))
        },
    );
    Registration::new(
        ServiceKey::of::<T>(Contract::Context),
        format!("{}<{}>", descriptor.name(), short_type_name::<T>()),
        factory,
    )
}

/// Everything discovered at startup, keyed by name.
#[derive(Clone, Default)]
pub struct TypeCatalog {
    entities: BTreeMap<&'static str, EntityDescriptor>,
    repositories: BTreeMap<String, ClosedRepository>,
    generics: BTreeMap<&'static str, GenericRepository>,
    contexts: BTreeMap<&'static str, ContextDescriptor>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-loaded with the three built-in generic repositories.
    pub fn with_builtin_generics() -> Self {
        let mut catalog = Self::new();
        for generic in [KEYED_REPOSITORY, ENTITY_REPOSITORY, AUDITABLE_REPOSITORY] {
            catalog.generics.insert(generic.name, generic);
        }
        catalog
    }

    pub fn add_entity(&mut self, entity: EntityDescriptor) -> RepoResult<()> {
        if self.entities.contains_key(entity.name) {
            return Err(duplicate("entity", entity.name));
        }
        self.entities.insert(entity.name, entity);
        Ok(())
    }

    /// Declares an authored repository type closed over `T`.
    pub fn add_repository<T: Persistable, R: RepositoryType<T>>(&mut self) -> RepoResult<()> {
        let closed = ClosedRepository::of::<T, R>();
        let name = closed.closed_name();
        if self.repositories.contains_key(&name) {
            return Err(duplicate("repository", &name));
        }
        self.repositories.insert(name, closed);
        Ok(())
    }

    pub fn add_generic(&mut self, generic: GenericRepository) -> RepoResult<()> {
        if self.generics.contains_key(generic.name) {
            return Err(duplicate("generic repository", generic.name));
        }
        self.generics.insert(generic.name, generic);
        Ok(())
    }

    pub fn add_context(&mut self, context: ContextDescriptor) -> RepoResult<()> {
        if self.contexts.contains_key(context.name) {
            return Err(duplicate("context", context.name));
        }
        self.contexts.insert(context.name, context);
        Ok(())
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &ClosedRepository> {
        self.repositories.values()
    }

    pub fn generics(&self) -> impl Iterator<Item = &GenericRepository> {
        self.generics.values()
    }

    pub fn generic(&self, name: &str) -> Option<&GenericRepository> {
        self.generics.get(name)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &ContextDescriptor> {
        self.contexts.values()
    }
}

fn duplicate(kind: &str, name: &str) -> RepoError {
    RepoError::InvalidCatalog(format!("{kind} `{name}` is declared twice"))
}
