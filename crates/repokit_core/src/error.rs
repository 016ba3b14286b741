//! Crate-wide error taxonomy.
//!
//! # Responsibility
//! - Give every repository, context and registration failure one typed shape.
//! - Keep "not found" out of the error space: lookups return `Option`/`Vec`.
//!
//! # Invariants
//! - Registration errors are fatal and name every offending type.
//! - Per-call errors propagate to the immediate caller; nothing here retries.

use crate::db::DbError;
use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by repositories, contexts, the catalog and the registrar.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Zero or multiple canonical persistence-context implementations.
    #[error("{message}{}", listed(types))]
    Configuration { message: String, types: Vec<String> },

    /// A required collaborator or argument was not supplied.
    #[error("argument must not be null: {0}")]
    ArgumentNull(String),

    /// A type-erased call named a type the repository does not manage.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },

    /// The container holds no binding for the requested service.
    #[error("service not registered: {0}")]
    NotRegistered(String),

    /// Write-context misuse (foreign or already released token).
    #[error("invalid write context: {0}")]
    InvalidWrite(String),

    /// The type catalog was declared inconsistently.
    #[error("invalid type catalog: {0}")]
    InvalidCatalog(String),

    /// A before-write hook rejected the write.
    #[error("write hook rejected {event} of `{entity}`: {message}")]
    Hook {
        event: &'static str,
        entity: &'static str,
        message: String,
    },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("entity serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to load settings: {0}")]
    Settings(#[from] config::ConfigError),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Fatal "no canonical context" error.
    pub fn no_context() -> Self {
        Self::Configuration {
            message: "no context found".to_string(),
            types: Vec::new(),
        }
    }

    /// Fatal "ambiguous context" error listing every candidate.
    pub fn ambiguous_context(types: Vec<String>) -> Self {
        Self::Configuration {
            message: "ambiguous context".to_string(),
            types,
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

fn listed(types: &[String]) -> String {
    if types.is_empty() {
        String::new()
    } else {
        format!(": {}", types.join(", "))
    }
}
