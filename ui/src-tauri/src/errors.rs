use std::error::Error;
use std::path::PathBuf;
use tracing::{error, warn, Level};

/// Base trait for all shell errors
pub trait ShellError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error should be logged as an error or warning
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Level an error is logged at: user errors are warnings.
pub fn log_level(err: &dyn ShellError) -> Level {
    if err.is_user_error() {
        Level::WARN
    } else {
        Level::ERROR
    }
}

/// Log `err` under `event` at the level its kind calls for.
pub fn report_error(event: &str, window: Option<&str>, err: &dyn ShellError) {
    if log_level(err) == Level::WARN {
        warn!(event = event, window = window, code = err.error_code(), error = %err);
    } else {
        error!(event = event, window = window, code = err.error_code(), error = %err);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("Native handle for window '{label}' is unavailable: {message}")]
    Unavailable { label: String, message: String },

    #[error("Unsupported native handle kind: {kind}")]
    Unsupported { kind: String },

    #[error("Handle has {len} bytes, at least 4 are required")]
    TooShort { len: usize },
}

impl ShellError for HandleError {
    fn error_code(&self) -> &'static str {
        match self {
            HandleError::Unavailable { .. } => "HANDLE_UNAVAILABLE",
            HandleError::Unsupported { .. } => "HANDLE_UNSUPPORTED",
            HandleError::TooShort { .. } => "HANDLE_TOO_SHORT",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Failed to start renderer '{path}': {source}")]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Renderer working directory '{path}' does not exist")]
    WorkingDirMissing { path: PathBuf },
}

impl ShellError for LaunchError {
    fn error_code(&self) -> &'static str {
        match self {
            LaunchError::SpawnFailed { .. } => "RENDERER_SPAWN_FAILED",
            LaunchError::WorkingDirMissing { .. } => "RENDERER_WORKING_DIR_MISSING",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, LaunchError::WorkingDirMissing { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ShellError for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::ReadFailed { .. } => "CONFIG_READ_FAILED",
            ConfigError::ParseFailed { .. } => "CONFIG_PARSE_FAILED",
            ConfigError::Invalid { .. } => "CONFIG_INVALID",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConfigError::ParseFailed { .. } | ConfigError::Invalid { .. }
        )
    }
}
