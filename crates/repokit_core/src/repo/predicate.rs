//! Predicates whose target type is checked at runtime.

use crate::error::{RepoError, RepoResult};
use crate::model::keyed::short_type_name;
use crate::model::KeyedObject;
use std::any::{Any, TypeId};
use std::fmt::{Debug, Formatter};

type ConcreteTest = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;
type KeyedTest = Box<dyn Fn(&dyn KeyedObject) -> bool + Send + Sync>;

enum Target {
    /// Built for one concrete row type.
    Concrete {
        type_id: TypeId,
        type_name: &'static str,
        test: ConcreteTest,
    },
    /// Built against the keyed view every row type offers.
    Keyed(KeyedTest),
}

/// Predicate handed to `where_erased` without a compile-time row type.
pub struct ErasedPredicate {
    target: Target,
}

impl ErasedPredicate {
    pub fn concrete<U, F>(predicate: F) -> Self
    where
        U: Any,
        F: Fn(&U) -> bool + Send + Sync + 'static,
    {
        let test: ConcreteTest = Box::new(move |row: &dyn Any| {
            row.downcast_ref::<U>().map_or(false, |row| predicate(row))
        });
        Self {
            target: Target::Concrete {
                type_id: TypeId::of::<U>(),
                type_name: short_type_name::<U>(),
                test,
            },
        }
    }

    pub fn keyed<F>(predicate: F) -> Self
    where
        F: Fn(&dyn KeyedObject) -> bool + Send + Sync + 'static,
    {
        Self {
            target: Target::Keyed(Box::new(predicate)),
        }
    }

    /// Checks that rows of type `T` can be fed to this predicate.
    pub fn bind<T: KeyedObject>(&self) -> RepoResult<()> {
        match &self.target {
            Target::Concrete {
                type_id, type_name, ..
            } if *type_id != TypeId::of::<T>() => Err(RepoError::type_mismatch(
                short_type_name::<T>(),
                *type_name,
            )),
            _ => Ok(()),
        }
    }

    pub fn test<T: KeyedObject>(&self, row: &T) -> bool {
        match &self.target {
            Target::Concrete { test, .. } => test(row as &dyn Any),
            Target::Keyed(test) => test(row as &dyn KeyedObject),
        }
    }
}

impl Debug for ErasedPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Target::Concrete { type_name, .. } => write!(f, "ErasedPredicate<{type_name}>"),
            Target::Keyed(_) => f.write_str("ErasedPredicate<dyn KeyedObject>"),
        }
    }
}
