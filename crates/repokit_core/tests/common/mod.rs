#![allow(dead_code)]

use repokit_core::{
    AuditStamps, AuditableEntity, Entity, Identity, KeyedObject, KeyedRepo, MemoryBackend,
    Persistable, PersistenceContext, StoreContext,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Keyed-only fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub id: i64,
    pub key: String,
    pub value: String,
}

impl Setting {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            id: 0,
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl KeyedObject for Setting {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// Entity fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    #[serde(flatten)]
    pub identity: Identity,
    pub label: String,
    pub aliases: Vec<String>,
}

impl Tag {
    pub fn new(label: &str) -> Self {
        Self {
            id: 0,
            identity: Identity::new(),
            label: label.to_string(),
            aliases: Vec::new(),
        }
    }

    pub fn well_known(external_id: &str, label: &str) -> Self {
        Self {
            identity: Identity::well_known(external_id),
            ..Self::new(label)
        }
    }
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

/// Auditable fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(flatten)]
    pub audit: AuditStamps,
    pub number: String,
    pub amount_cents: i64,
}

impl Invoice {
    pub fn new(number: &str, amount_cents: i64) -> Self {
        Self {
            id: 0,
            identity: Identity::new(),
            audit: AuditStamps::default(),
            number: number.to_string(),
            amount_cents,
        }
    }
}

impl KeyedObject for Invoice {
    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Entity for Invoice {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }
}

impl AuditableEntity for Invoice {
    fn audit(&self) -> &AuditStamps {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditStamps {
        &mut self.audit
    }
}

/// Fresh in-memory context for `T`.
pub fn memory_context<T: Persistable>() -> Arc<dyn PersistenceContext<T>> {
    let backend = Arc::new(MemoryBackend::new());
    Arc::new(StoreContext::<T>::open(backend).unwrap())
}

/// Runs `write` inside one write context and commits it.
pub fn committed<T, R>(repo: &R, write: impl FnOnce(&R))
where
    T: Persistable,
    R: KeyedRepo<T> + ?Sized,
{
    let scope = repo.write_context();
    write(repo);
    repo.commit(scope).unwrap();
}
