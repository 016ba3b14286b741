//! Lookup keys.

use crate::error::{RepoError, RepoResult};
use std::any::Any;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Any key a repository can resolve an entity by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Surrogate(i64),
    Guid(Uuid),
    External(String),
}

impl EntityKey {
    /// Builds a key from a value whose type is only known at runtime.
    ///
    /// GUIDs and strings map to natural keys; integer primitives coercible to
    /// `i64` map to the surrogate key. Anything else is a `TypeMismatch`.
    pub fn from_any(value: &dyn Any) -> RepoResult<Self> {
        if let Some(key) = value.downcast_ref::<EntityKey>() {
            return Ok(key.clone());
        }
        if let Some(guid) = value.downcast_ref::<Uuid>() {
            return Ok(Self::Guid(*guid));
        }
        if let Some(text) = value.downcast_ref::<String>() {
            return Ok(Self::External(text.clone()));
        }
        if let Some(text) = value.downcast_ref::<&str>() {
            return Ok(Self::External((*text).to_string()));
        }
        surrogate_from_any(value).map(Self::Surrogate).ok_or_else(|| {
            RepoError::type_mismatch("i64 | Uuid | String", "unsupported key type")
        })
    }

    /// Stable name of the key variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Surrogate(_) => "surrogate",
            Self::Guid(_) => "guid",
            Self::External(_) => "external",
        }
    }
}

fn surrogate_from_any(value: &dyn Any) -> Option<i64> {
    macro_rules! coerce {
        ($($ty:ty),*) => {
            $(
                if let Some(number) = value.downcast_ref::<$ty>() {
                    return i64::try_from(*number).ok();
                }
            )*
        };
    }
    coerce!(i64, i32, i16, i8, u64, u32, u16, u8, isize, usize);
    None
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Surrogate(id) => write!(f, "#{id}"),
            Self::Guid(guid) => write!(f, "{{{guid}}}"),
            Self::External(value) => write!(f, "`{value}`"),
        }
    }
}

impl From<i64> for EntityKey {
    fn from(value: i64) -> Self {
        Self::Surrogate(value)
    }
}

impl From<Uuid> for EntityKey {
    fn from(value: Uuid) -> Self {
        Self::Guid(value)
    }
}

impl From<&str> for EntityKey {
    fn from(value: &str) -> Self {
        Self::External(value.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(value: String) -> Self {
        Self::External(value)
    }
}
