//! Persisted entity model.
//!
//! # Responsibility
//! - Define the keyed/entity/auditable capability ladder every persisted type
//!   climbs.
//! - Provide the embeddable identity and audit blocks entity types compose.
//!
//! # Invariants
//! - Surrogate key `0` means "not yet persisted".
//! - A soft-deleted row is still physically present; only views hide it.

pub mod identity;
pub mod key;
pub mod keyed;

pub use identity::{AuditStamps, Identity};
pub use key::EntityKey;
pub use keyed::{AuditableEntity, Entity, KeyedObject, Persistable, UNPERSISTED_ID};
