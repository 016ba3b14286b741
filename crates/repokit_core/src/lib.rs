//! Typed repository layer over pluggable persistence contexts.
//! Generic repositories are closed over entity types and bound at startup.

pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod settings;

pub use context::{CommitSummary, MemoryBackend, PersistenceContext, StoreContext, WriteContext};
pub use db::SqliteBackend;
pub use error::{RepoError, RepoResult};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use messaging::{LifecycleEvent, MessageBus, WriteHook};
pub use model::{
    AuditStamps, AuditableEntity, Entity, EntityKey, Identity, KeyedObject, Persistable,
    UNPERSISTED_ID,
};
pub use registry::{
    build_container, register_dependencies, Capability, ContextDescriptor, EntityDescriptor,
    GenericRepository, RegistrationReport, RepositoryType, ServiceContainer, TypeCatalog,
    TypeRegistry,
};
pub use repo::{
    of_type, AuditableRepository, AuditedRepo, EntityRepository, ErasedEntities, ErasedPredicate,
    ErasedRepo, IdentifiedRepo, KeyedRepo, KeyedRepository, RepoCore, Repository,
};
pub use settings::Settings;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
