//! State shared by every repository layer.

use crate::context::PersistenceContext;
use crate::error::{RepoError, RepoResult};
use crate::messaging::{LifecycleEvent, MessageBus, WriteHook};
use crate::model::keyed::short_type_name;
use crate::model::{Entity, Identity, Persistable};
use std::sync::Arc;

/// What `delete` does with the rows it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Forward to the context's physical delete.
    Physical,
    /// Run the deleting stages, then persist the stamped rows as updates.
    Soft,
}

/// Accessors for the natural identity of an entity type.
pub struct IdentityAccess<T> {
    get: fn(&T) -> &Identity,
    get_mut: fn(&mut T) -> &mut Identity,
    boxed: fn(T) -> Box<dyn Entity>,
}

impl<T> Clone for IdentityAccess<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IdentityAccess<T> {}

impl<T: Entity> IdentityAccess<T> {
    pub fn of() -> Self {
        Self {
            get: entity_identity::<T>,
            get_mut: entity_identity_mut::<T>,
            boxed: box_entity::<T>,
        }
    }
}

impl<T> IdentityAccess<T> {
    pub fn get<'a>(&self, item: &'a T) -> &'a Identity {
        (self.get)(item)
    }

    pub fn get_mut<'a>(&self, item: &'a mut T) -> &'a mut Identity {
        (self.get_mut)(item)
    }

    /// Moves `item` behind the object-safe entity view.
    pub fn boxed(&self, item: T) -> Box<dyn Entity> {
        (self.boxed)(item)
    }
}

fn entity_identity<T: Entity>(item: &T) -> &Identity {
    item.identity()
}

fn entity_identity_mut<T: Entity>(item: &mut T) -> &mut Identity {
    item.identity_mut()
}

fn box_entity<T: Entity>(item: T) -> Box<dyn Entity> {
    Box::new(item)
}

/// Context reference plus the policies a repository layer installed.
///
/// Repositories are thin: this is all the state they hold.
pub struct RepoCore<T: Persistable> {
    context: Arc<dyn PersistenceContext<T>>,
    bus: Option<Arc<MessageBus>>,
    stages: Vec<Arc<dyn WriteHook<T>>>,
    visible: Option<fn(&T) -> bool>,
    delete_mode: DeleteMode,
    identity: Option<IdentityAccess<T>>,
    clone_reset: Option<fn(&mut T)>,
}

impl<T: Persistable> RepoCore<T> {
    pub fn new(context: Arc<dyn PersistenceContext<T>>) -> Self {
        Self {
            context,
            bus: None,
            stages: Vec::new(),
            visible: None,
            delete_mode: DeleteMode::Physical,
            identity: None,
            clone_reset: None,
        }
    }

    /// Fails with `ArgumentNull` when no context is supplied.
    pub fn try_new(
        repository: &'static str,
        context: Option<Arc<dyn PersistenceContext<T>>>,
        bus: Option<Arc<MessageBus>>,
    ) -> RepoResult<Self> {
        let context = context.ok_or_else(|| {
            RepoError::ArgumentNull(format!(
                "cannot create {repository}<{}> without a persistence context",
                short_type_name::<T>()
            ))
        })?;
        Ok(Self {
            bus,
            ..Self::new(context)
        })
    }

    pub fn with_bus(mut self, bus: Arc<MessageBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Appends a before-write stage; stages run before bus subscribers.
    pub fn with_stage(mut self, stage: Arc<dyn WriteHook<T>>) -> Self {
        self.stages.push(stage);
        self
    }

    pub(crate) fn with_first_stage(mut self, stage: Arc<dyn WriteHook<T>>) -> Self {
        self.stages.insert(0, stage);
        self
    }

    /// Restricts `all()` to rows accepted by `visible`.
    pub fn with_visibility(mut self, visible: fn(&T) -> bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }

    pub fn with_identity(mut self, identity: IdentityAccess<T>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Clears layer-owned state on every shallow clone.
    pub fn with_clone_reset(mut self, reset: fn(&mut T)) -> Self {
        self.clone_reset = Some(reset);
        self
    }

    pub fn context(&self) -> &Arc<dyn PersistenceContext<T>> {
        &self.context
    }

    pub fn bus(&self) -> Option<&Arc<MessageBus>> {
        self.bus.as_ref()
    }

    pub fn delete_mode(&self) -> DeleteMode {
        self.delete_mode
    }

    pub fn identity(&self) -> Option<IdentityAccess<T>> {
        self.identity
    }

    pub fn is_visible(&self, item: &T) -> bool {
        self.visible.map_or(true, |visible| visible(item))
    }

    pub fn reset_clone(&self, item: &mut T) {
        if let Some(reset) = self.clone_reset {
            reset(item);
        }
    }

    /// Runs own stages, then bus subscribers, against one instance.
    pub fn prepare_one(&self, event: LifecycleEvent, item: &mut T) -> RepoResult<()> {
        for stage in &self.stages {
            stage.before_write(event, item)?;
        }
        if let Some(bus) = &self.bus {
            bus.publish(event, item)?;
        }
        Ok(())
    }

    pub fn prepare(&self, event: LifecycleEvent, mut items: Vec<T>) -> RepoResult<Vec<T>> {
        for item in &mut items {
            self.prepare_one(event, item)?;
        }
        Ok(items)
    }
}
