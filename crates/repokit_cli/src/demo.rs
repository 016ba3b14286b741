//! Sample entity catalog the CLI registers and exercises.

use async_trait::async_trait;
use repokit_core::context::PersistenceContext;
use repokit_core::registry::InterfaceSet;
use repokit_core::repo::{AUDITABLE_REPOSITORY, ENTITY_REPOSITORY, KEYED_REPOSITORY};
use repokit_core::{
    AuditStamps, AuditableEntity, AuditableRepository, AuditedRepo, ContextDescriptor, Entity,
    EntityDescriptor, ErasedRepo, IdentifiedRepo, Identity, KeyedObject, KeyedRepo, MemoryBackend,
    MessageBus, RepoCore, RepoResult, Repository, RepositoryType, TypeCatalog,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub id: i64,
    pub key: String,
    pub value: String,
}

impl KeyedObject for Setting {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    #[serde(flatten)]
    pub identity: Identity,
    pub label: String,
}

impl KeyedObject for Tag {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Entity for Tag {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(flatten)]
    pub audit: AuditStamps,
    pub email: String,
}

impl User {
    pub fn new(email: &str) -> Self {
        Self {
            id: 0,
            identity: Identity::new(),
            audit: AuditStamps::default(),
            email: email.to_string(),
        }
    }
}

impl KeyedObject for User {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Entity for User {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }
}

impl AuditableEntity for User {
    fn audit(&self) -> &AuditStamps {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditStamps {
        &mut self.audit
    }
}

/// Authored repository adding an email lookup to the auditable layer.
pub struct UserRepository {
    inner: AuditableRepository<User>,
}

impl UserRepository {
    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.all()?.into_iter().find(|user| user.email == email))
    }
}

#[async_trait]
impl KeyedRepo<User> for UserRepository {
    fn core(&self) -> &RepoCore<User> {
        self.inner.core()
    }
}

impl IdentifiedRepo<User> for UserRepository {}

impl AuditedRepo<User> for UserRepository {}

impl Repository for UserRepository {
    fn repository_name(&self) -> &'static str {
        Self::NAME
    }

    fn entity_name(&self) -> &'static str {
        "User"
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

impl RepositoryType<User> for UserRepository {
    const NAME: &'static str = "UserRepository";
    const BASES: &'static [&'static str] = &[
        AUDITABLE_REPOSITORY.name,
        ENTITY_REPOSITORY.name,
        KEYED_REPOSITORY.name,
    ];

    fn construct(
        context: Option<Arc<dyn PersistenceContext<User>>>,
        bus: Option<Arc<MessageBus>>,
    ) -> RepoResult<Self> {
        Ok(Self {
            inner: AuditableRepository::try_new(context, bus)?,
        })
    }

    fn interfaces(set: &mut InterfaceSet<User, Self>) {
        set.keyed();
        set.identified();
        set.audited();
    }
}

/// Catalog over the sample entities, backed by SQLite when a path is given.
pub fn catalog(sqlite_path: Option<&Path>) -> RepoResult<TypeCatalog> {
    let mut catalog = TypeCatalog::with_builtin_generics();
    catalog.add_entity(EntityDescriptor::keyed::<Setting>())?;
    catalog.add_entity(EntityDescriptor::entity::<Tag>())?;
    catalog.add_entity(EntityDescriptor::auditable::<User>())?;
    catalog.add_repository::<User, UserRepository>()?;

    let context = match sqlite_path {
        Some(path) => ContextDescriptor::sqlite(path).configured(),
        None => ContextDescriptor::memory(Arc::new(MemoryBackend::new())),
    };
    catalog.add_context(context)?;
    Ok(catalog)
}
