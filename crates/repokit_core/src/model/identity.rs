//! Embeddable identity and audit blocks.
//!
//! # Invariants
//! - A fresh `Identity` uses its GUID string as external id.
//! - Well-known identities derive their GUID from the external id, so the same
//!   external id always maps to the same GUID.
//! - Stamping a deletion sets `date_modified` to the same instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for GUIDs derived from well-known external ids.
const WELL_KNOWN_NAMESPACE: Uuid = Uuid::from_u128(0x6f9a_54c1_2b7e_4d0a_9c35_8e1f_d2a4_b703);

/// Natural identity carried by every [`Entity`](crate::model::Entity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub guid: Uuid,
    pub external_id: String,
}

impl Identity {
    /// Creates a new identity with a random GUID.
    pub fn new() -> Self {
        Self::from_guid(Uuid::new_v4())
    }

    /// Identity whose external id is the GUID string.
    pub fn from_guid(guid: Uuid) -> Self {
        Self {
            guid,
            external_id: guid.to_string(),
        }
    }

    /// Identity for static rows whose surrogate key stays `0`.
    pub fn well_known(external_id: impl Into<String>) -> Self {
        let external_id = external_id.into();
        Self {
            guid: Uuid::new_v5(&WELL_KNOWN_NAMESPACE, external_id.as_bytes()),
            external_id,
        }
    }

    /// Replaces GUID and external id with a brand new identity.
    pub fn regenerate(&mut self) {
        *self = Self::new();
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

/// Audit timestamps carried by every [`AuditableEntity`](crate::model::AuditableEntity).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamps {
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub date_deleted: Option<DateTime<Utc>>,
}

impl AuditStamps {
    pub fn is_deleted(&self) -> bool {
        self.date_deleted.is_some()
    }

    pub fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.date_created = Some(now);
    }

    pub fn stamp_modified(&mut self, now: DateTime<Utc>) {
        self.date_modified = Some(now);
    }

    /// Hides the row; `date_modified` moves with it.
    pub fn stamp_deleted(&mut self, now: DateTime<Utc>) {
        self.date_deleted = Some(now);
        self.date_modified = Some(now);
    }

    /// Clears the tombstone.
    pub fn stamp_restored(&mut self, now: DateTime<Utc>) {
        self.date_deleted = None;
        self.date_modified = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::{AuditStamps, Identity};
    use chrono::Utc;

    #[test]
    fn fresh_identity_uses_guid_as_external_id() {
        let identity = Identity::new();
        assert_eq!(identity.external_id, identity.guid.to_string());
    }

    #[test]
    fn well_known_identity_is_deterministic() {
        let first = Identity::well_known("group.administrators");
        let second = Identity::well_known("group.administrators");
        let other = Identity::well_known("group.guests");
        assert_eq!(first, second);
        assert_ne!(first.guid, other.guid);
        assert_eq!(first.external_id, "group.administrators");
    }

    #[test]
    fn regenerate_replaces_both_fields() {
        let mut identity = Identity::well_known("seed");
        let before = identity.clone();
        identity.regenerate();
        assert_ne!(identity.guid, before.guid);
        assert_eq!(identity.external_id, identity.guid.to_string());
    }

    #[test]
    fn deletion_moves_modified_to_same_instant() {
        let mut stamps = AuditStamps::default();
        let now = Utc::now();
        stamps.stamp_deleted(now);
        assert!(stamps.is_deleted());
        assert_eq!(stamps.date_modified, stamps.date_deleted);

        stamps.stamp_restored(now);
        assert!(!stamps.is_deleted());
    }
}
