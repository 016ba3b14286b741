//! Layered runtime settings.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. a TOML file (`repokit.toml` in the working directory, or an explicit path)
//! 3. `REPOKIT__`-prefixed environment variables, e.g. `REPOKIT__LOGGING__LEVEL`

use crate::error::RepoResult;
use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_FILE_STEM: &str = "repokit";
const ENV_PREFIX: &str = "REPOKIT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,
    /// Rolling log directory; stderr when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file backing the context; in-memory store when unset.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

fn default_level() -> String {
    default_log_level().to_string()
}

impl Settings {
    /// Loads settings from `file` (required) or the optional default file.
    pub fn load(file: Option<&Path>) -> RepoResult<Self> {
        Self::load_with_prefix(file, ENV_PREFIX)
    }

    fn load_with_prefix(file: Option<&Path>, env_prefix: &str) -> RepoResult<Self> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_FILE_STEM).required(false),
        };
        let settings = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
