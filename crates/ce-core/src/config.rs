//! Configuration management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default PPU time base frequency (79.8 MHz)
pub const DEFAULT_TIMEBASE_FREQUENCY: u64 = 79_800_000;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ppu: PpuConfig,
    pub memory: MemoryConfig,
    pub debug: DebugConfig,
}

/// PPU interpreter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpuConfig {
    /// Frequency reported through the time base registers
    pub timebase_frequency: u64,
    /// Instruction budget used by the runner before it gives up
    pub max_steps: u64,
    /// Stop with an error instead of skipping unimplemented instructions
    pub trap_unimplemented: bool,
}

impl Default for PpuConfig {
    fn default() -> Self {
        Self {
            timebase_frequency: DEFAULT_TIMEBASE_FREQUENCY,
            max_steps: 1_000_000,
            trap_unimplemented: false,
        }
    }
}

/// Guest memory layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub main_size: u32,
    pub user_size: u32,
    pub stack_size: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            main_size: 0x1000_0000,
            user_size: 0x1000_0000,
            stack_size: 0x1000_0000,
        }
    }
}

/// Log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Debugging and logging options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
    pub log_to_file: bool,
    pub log_path: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_to_file: false,
            log_path: PathBuf::from("cellemu.log"),
        }
    }
}

impl Config {
    /// Path of the user configuration file, if a config directory exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cellemu").join("config.toml"))
    }

    /// Load the user configuration, falling back to defaults when no file exists
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Write the configuration to the user config file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Write the configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
