//! Lifecycle notifications and before-write hooks.
//!
//! # Responsibility
//! - Deliver `Creating`/`Updating`/`Deleting` notifications for one entity
//!   type to its subscribers.
//! - Let hooks mutate the in-memory instance before the physical write.
//!
//! # Invariants
//! - Delivery order equals subscription order.
//! - The first failing hook aborts delivery and the write.

use crate::error::RepoResult;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Write-pipeline lifecycle notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleEvent {
    Creating,
    Updating,
    Deleting,
}

impl LifecycleEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creating => "creating",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
        }
    }
}

impl Display for LifecycleEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage run against an entity before it is handed to the context.
pub trait WriteHook<T>: Send + Sync {
    fn before_write(&self, event: LifecycleEvent, target: &mut T) -> RepoResult<()>;
}

impl<T, F> WriteHook<T> for F
where
    F: Fn(LifecycleEvent, &mut T) -> RepoResult<()> + Send + Sync,
{
    fn before_write(&self, event: LifecycleEvent, target: &mut T) -> RepoResult<()> {
        self(event, target)
    }
}

type Subscribers<T> = Vec<Arc<dyn WriteHook<T>>>;

/// Per-entity-type subscriber registry.
#[derive(Default)]
pub struct MessageBus {
    handlers: RwLock<BTreeMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `hook` to lifecycle notifications for `T`.
    pub fn subscribe<T: 'static>(&self, hook: Arc<dyn WriteHook<T>>) {
        let mut handlers = self.handlers.write();
        let entry = handlers
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Subscribers::<T>::new()));
        if let Some(subscribers) = entry.downcast_mut::<Subscribers<T>>() {
            subscribers.push(hook);
        }
    }

    pub fn subscriber_count<T: 'static>(&self) -> usize {
        self.handlers
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Subscribers<T>>())
            .map_or(0, Vec::len)
    }

    /// Delivers `event` for `target` to every subscriber of `T`.
    pub fn publish<T: 'static>(&self, event: LifecycleEvent, target: &mut T) -> RepoResult<()> {
        // Snapshot so hooks may subscribe or publish without deadlocking.
        let subscribers: Subscribers<T> = self
            .handlers
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Subscribers<T>>())
            .cloned()
            .unwrap_or_default();

        for hook in subscribers {
            hook.before_write(event, target)?;
        }
        Ok(())
    }
}
