//! Capability traits for persisted types.
//!
//! # Invariants
//! - `KeyedObject`, `Entity` and `AuditableEntity` stay object-safe so
//!   type-erased predicates can view any row through them.
//! - Persistence bounds (`Clone`, serde) live on [`Persistable`] only.

use crate::model::identity::{AuditStamps, Identity};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use uuid::Uuid;

/// Surrogate key of a row that no context has persisted yet.
pub const UNPERSISTED_ID: i64 = 0;

/// Any persisted type addressable by an integer surrogate key.
pub trait KeyedObject: Any + Send + Sync {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);

    fn is_persisted(&self) -> bool {
        self.id() != UNPERSISTED_ID
    }
}

/// Keyed object carrying a GUID and an external string identifier.
pub trait Entity: KeyedObject {
    fn identity(&self) -> &Identity;
    fn identity_mut(&mut self) -> &mut Identity;

    fn guid(&self) -> Uuid {
        self.identity().guid
    }

    fn external_id(&self) -> &str {
        self.identity().external_id.as_str()
    }
}

/// Entity whose create/modify/delete instants are tracked.
pub trait AuditableEntity: Entity {
    fn audit(&self) -> &AuditStamps;
    fn audit_mut(&mut self) -> &mut AuditStamps;

    fn is_deleted(&self) -> bool {
        self.audit().is_deleted()
    }
}

/// Bound required by contexts and repositories.
///
/// Owned `Clone` is a full field-wise copy, so a clone never shares a
/// mutable collection with its source.
pub trait Persistable: KeyedObject + Clone + Serialize + DeserializeOwned {}

impl<T> Persistable for T where T: KeyedObject + Clone + Serialize + DeserializeOwned {}

/// Short type name used for set names, logs and binding keys.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(index) => &full[index + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::short_type_name;

    struct Widget;

    #[test]
    fn short_type_name_strips_module_path() {
        assert_eq!(short_type_name::<Widget>(), "Widget");
        assert_eq!(short_type_name::<Vec<Widget>>(), "Vec<repokit_core::model::keyed::tests::Widget>");
    }
}
