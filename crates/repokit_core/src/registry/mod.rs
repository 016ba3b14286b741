//! Type catalog, registration and service resolution.
//!
//! # Responsibility
//! - Describe entity types, repository types and context implementations.
//! - Close generic repositories over entity types at registration time.
//! - Bind contexts and repositories into a [`ServiceContainer`].
//!
//! # Invariants
//! - Exactly one zero-configuration context may exist; otherwise
//!   registration fails and names the candidates.
//! - Registration is deterministic for a given catalog.
//!
//! # See also
//! - `crate::repo` for the repository layers being bound.

pub mod capability;
pub mod catalog;
pub mod closed;
pub mod container;
pub mod registrar;
pub mod type_registry;

pub use capability::{parse_capability, supported_capability_strings, Capability, CapabilityError};
pub use catalog::{BackendOpener, ContextDescriptor, EntityDescriptor, GenericRepository, TypeCatalog};
pub use closed::{ClosedRepository, InterfaceSet, RepositoryType};
pub use container::{
    Binding, Contract, Factory, Registration, ServiceContainer, ServiceKey, ServiceRegister,
};
pub use registrar::{build_container, register_dependencies, RegistrationReport};
pub use type_registry::{RepositoryTypeInfo, TypeRegistry};
