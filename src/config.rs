use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::view::output_buffer::DEFAULT_MAX_LINES;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ssh: SshConfig,

    #[serde(default)]
    pub panel: PanelConfig,

    #[serde(default)]
    pub editor: EditorConfig,
}

/// How the remote shell is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    /// Remote-shell program
    #[serde(default = "default_ssh_program")]
    pub program: String,

    /// Extra arguments placed before the host, e.g. `["-o", "ControlMaster=auto"]`
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Give up on a directory listing after this many seconds
    #[serde(default = "default_listing_timeout_secs")]
    pub listing_timeout_secs: u64,
}

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_listing_timeout_secs() -> u64 {
    30
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: default_ssh_program(),
            extra_args: Vec::new(),
            listing_timeout_secs: default_listing_timeout_secs(),
        }
    }
}

/// Command panel behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Scrollback cap for command output
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    /// UI tick while waiting for input, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_max_lines() -> usize {
    DEFAULT_MAX_LINES
}

fn default_tick_ms() -> u64 {
    50
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
            tick_ms: default_tick_ms(),
        }
    }
}

/// Remote editing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Editor used when VISUAL and EDITOR give nothing usable
    #[serde(default = "default_fallback_editor")]
    pub fallback: String,
}

fn default_fallback_editor() -> String {
    crate::services::remote::editor::FALLBACK_EDITOR.to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            fallback: default_fallback_editor(),
        }
    }
}

impl Config {
    /// Default config file location: `<config dir>/rex/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rex").join("config.json"))
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file at the default location yields the default config; an
    /// explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path)?,
                _ => {
                    tracing::debug!("No config file, using defaults");
                    Self::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        tracing::info!("Loaded config from {:?}", path.as_ref());
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Pretty JSON of the effective configuration
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.panel.max_lines == 0 {
            return Err(ConfigError::ValidationError(
                "panel.max_lines must be greater than 0".to_string(),
            ));
        }

        if self.panel.tick_ms == 0 {
            return Err(ConfigError::ValidationError(
                "panel.tick_ms must be greater than 0".to_string(),
            ));
        }

        if self.ssh.listing_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "ssh.listing_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.ssh.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ssh.program cannot be empty".to_string(),
            ));
        }

        if self.editor.fallback.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "editor.fallback cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
