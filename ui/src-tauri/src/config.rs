//! Shell configuration.
//!
//! Built-in defaults are overridden by `renderer-shell.json` in the current
//! directory when that file exists. Fields missing from the file keep their
//! default values.

use crate::errors::ConfigError;
use crate::handle::ByteOrder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "renderer-shell.json";
pub const DEFAULT_RENDERER_PATH: &str = "build/my-renderer.exe";
pub const DEFAULT_OUTPUT_TAG: &str = "[native side]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Executable spawned once per window.
    pub renderer_path: PathBuf,
    /// Working directory of the renderer. `None` means the shell's own.
    pub working_dir: Option<PathBuf>,
    pub handle_byte_order: ByteOrder,
    /// Prefix of every forwarded renderer line.
    pub output_tag: String,
    pub kill_on_window_close: bool,
    pub target_frame_rate: u32,
    pub window: WindowConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            renderer_path: PathBuf::from(DEFAULT_RENDERER_PATH),
            working_dir: None,
            handle_byte_order: ByteOrder::default(),
            output_tag: DEFAULT_OUTPUT_TAG.to_string(),
            kill_on_window_close: true,
            target_frame_rate: 60,
            window: WindowConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Renderer Shell".to_string(),
            width: 800.0,
            height: 600.0,
        }
    }
}

impl ShellConfig {
    /// Load defaults merged with `renderer-shell.json` from the current directory.
    pub fn load() -> Result<Self, ConfigError> {
        let dir = std::env::current_dir().map_err(|source| ConfigError::ReadFailed {
            path: PathBuf::from("."),
            source,
        })?;
        Self::load_from_dir(&dir)
    }

    /// Load defaults merged with `renderer-shell.json` from `dir`.
    ///
    /// A missing file is not an error.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        let config = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|source| ConfigError::ParseFailed { path, source })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => return Err(ConfigError::ReadFailed { path, source }),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.renderer_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                message: "renderer_path must not be empty".to_string(),
            });
        }
        if self.target_frame_rate == 0 {
            return Err(ConfigError::Invalid {
                message: "target_frame_rate must be greater than zero".to_string(),
            });
        }
        if self.window.width <= 0.0 || self.window.height <= 0.0 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "window size must be positive, got {}x{}",
                    self.window.width, self.window.height
                ),
            });
        }
        Ok(())
    }

    /// Directory the renderer runs in.
    pub fn renderer_working_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(|source| ConfigError::ReadFailed {
                path: PathBuf::from("."),
                source,
            }),
        }
    }
}
