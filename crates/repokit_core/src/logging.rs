//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend once per process, to rolling files or
//!   to stderr when no directory is configured.
//! - Emit `event=... module=... status=...` lines from every module.
//!
//! # Invariants
//! - Initialization never panics.
//! - Repeating initialization with the same settings is a no-op.
//! - Switching level or destination after startup is rejected.

use crate::settings::LoggingSettings;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOG_FILE_BASENAME: &str = "repokit";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Directory(PathBuf),
}

impl LogTarget {
    fn describe(&self) -> String {
        match self {
            Self::Stderr => "stderr".to_string(),
            Self::Directory(dir) => dir.display().to_string(),
        }
    }
}

struct LoggingState {
    level: &'static str,
    target: LogTarget,
    _logger: LoggerHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingError {
    #[error("unsupported log level `{0}`; expected trace|debug|info|warn|error")]
    UnsupportedLevel(String),
    #[error("log directory must be an absolute path, got `{0}`")]
    RelativeDirectory(String),
    #[error("logging already initialized with {field} `{active}`; refusing to switch to `{requested}`")]
    Conflict {
        field: &'static str,
        active: String,
        requested: String,
    },
    #[error("failed to start logger: {0}")]
    Backend(String),
}

/// Starts logging from loaded settings.
///
/// # Errors
/// - `UnsupportedLevel` / `RelativeDirectory` for malformed settings.
/// - `Conflict` when logging already runs with other settings.
/// - `Backend` when the directory cannot be created or the logger fails.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), LoggingError> {
    let level = normalize_level(&settings.level)?;
    let target = match settings.dir.as_deref() {
        Some(dir) => LogTarget::Directory(normalize_log_dir(dir)?),
        None => LogTarget::Stderr,
    };

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(level, &target))?;
    if state.target != target {
        return Err(LoggingError::Conflict {
            field: "target",
            active: state.target.describe(),
            requested: target.describe(),
        });
    }
    if state.level != level {
        return Err(LoggingError::Conflict {
            field: "level",
            active: state.level.to_string(),
            requested: level.to_string(),
        });
    }
    Ok(())
}

fn start_logger(level: &'static str, target: &LogTarget) -> Result<LoggingState, LoggingError> {
    let logger = Logger::try_with_str(level).map_err(|err| LoggingError::Backend(err.to_string()))?;
    let logger = match target {
        LogTarget::Stderr => logger.log_to_stderr(),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                LoggingError::Backend(format!(
                    "cannot create log directory `{}`: {err}",
                    dir.display()
                ))
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
    };
    let handle = logger
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook_once();
    info!(
        "event=logging_init module=core status=ok level={} target={} version={}",
        level,
        target.describe(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(LoggingState {
        level,
        target: target.clone(),
        _logger: handle,
    })
}

/// Active `(level, target)`, or `None` before initialization.
pub fn logging_status() -> Option<(&'static str, LogTarget)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.target.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn normalize_log_dir(dir: &Path) -> Result<PathBuf, LoggingError> {
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDirectory(dir.display().to_string()));
    }
    Ok(dir.to_path_buf())
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            panic_payload_summary(panic_info)
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    single_line(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn single_line(value: &str, max_chars: usize) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    let mut truncated: String = flattened.chars().take(max_chars).collect();
    if flattened.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, normalize_log_dir, single_line, LogTarget,
        LoggingError,
    };
    use crate::settings::LoggingSettings;
    use std::path::Path;

    #[test]
    fn levels_normalize_case_and_aliases() {
        assert_eq!(normalize_level("INFO").expect("INFO"), "info");
        assert_eq!(normalize_level(" warning ").expect("warning"), "warn");
        assert!(matches!(
            normalize_level("verbose"),
            Err(LoggingError::UnsupportedLevel(_))
        ));
    }

    #[test]
    fn relative_directories_are_rejected() {
        let err = normalize_log_dir(Path::new("logs/dev")).expect_err("relative path");
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn single_line_flattens_and_truncates() {
        let flattened = single_line("line1\nline2\rline3", 8);
        assert!(!flattened.contains('\n'));
        assert!(!flattened.contains('\r'));
        assert!(flattened.ends_with("..."));
    }

    #[test]
    fn init_is_idempotent_and_rejects_conflicts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = LoggingSettings {
            level: "info".to_string(),
            dir: Some(dir.path().to_path_buf()),
        };

        init_logging(&settings).expect("first init");
        init_logging(&settings).expect("same settings are idempotent");

        let louder = LoggingSettings {
            level: "debug".to_string(),
            ..settings.clone()
        };
        let err = init_logging(&louder).expect_err("level conflict");
        assert!(matches!(err, LoggingError::Conflict { field: "level", .. }));

        let stderr = LoggingSettings {
            level: "info".to_string(),
            dir: None,
        };
        let err = init_logging(&stderr).expect_err("target conflict");
        assert!(matches!(err, LoggingError::Conflict { field: "target", .. }));

        let (level, target) = logging_status().expect("logging is active");
        assert_eq!(level, "info");
        assert_eq!(target, LogTarget::Directory(dir.path().to_path_buf()));
    }
}
