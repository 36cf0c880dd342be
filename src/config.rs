//! Persisted settings and custom rules.
//!
//! Configuration is stored as TOML. Scalar settings come first, followed by
//! the ordered rule list:
//!
//! ```toml
//! default_download_path = "/home/me/Downloads"
//! conflict_resolution = "rename"
//! dry_run = false
//!
//! [[rules]]
//! name = "invoices"
//! rule_type = "keyword"
//! pattern = "invoice"
//! target_folder = "finance"
//! priority = 10
//! case_sensitive = false
//! ```
//!
//! Commands never touch the file directly; they go through a [`ConfigStore`]
//! so tests can swap in a [`MemoryConfigStore`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::file_organizer::{ConflictPolicy, ParsePolicyError};
use crate::rules::{Rule, RuleEngine};

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_NAME: &str = ".taxonrc.toml";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read configuration {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid TOML syntax or structure.
    #[error("invalid configuration {}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write configuration {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Settings plus the custom rule list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory organized when no path is given on the command line.
    #[serde(default = "default_download_path")]
    pub default_download_path: PathBuf,

    /// One of `rename`, `skip` or `overwrite`. Kept as text so an unknown
    /// value surfaces as an error when a run starts.
    #[serde(default = "default_conflict_resolution")]
    pub conflict_resolution: String,

    #[serde(default)]
    pub dry_run: bool,

    /// Custom rules in evaluation order.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn default_download_path() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

fn default_conflict_resolution() -> String {
    ConflictPolicy::default().to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_download_path: default_download_path(),
            conflict_resolution: default_conflict_resolution(),
            dry_run: false,
            rules: Vec::new(),
        }
    }
}

impl Config {
    /// Parses the stored conflict resolution.
    pub fn conflict_policy(&self) -> Result<ConflictPolicy, ParsePolicyError> {
        self.conflict_resolution.parse()
    }

    /// Validates and stores a conflict resolution.
    pub fn set_conflict_policy(&mut self, value: &str) -> Result<ConflictPolicy, ParsePolicyError> {
        let policy: ConflictPolicy = value.parse()?;
        self.conflict_resolution = policy.to_string();
        Ok(policy)
    }

    pub fn rule_engine(&self) -> RuleEngine {
        RuleEngine::from_records(self.rules.iter().cloned())
    }

    pub fn set_rules(&mut self, engine: &RuleEngine) {
        self.rules = engine.to_records();
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Source of truth for settings and rules.
pub trait ConfigStore {
    /// Loads the configuration, falling back to defaults if none is stored.
    fn load(&self) -> Result<Config, ConfigError>;

    /// Persists `config`, replacing what was stored.
    fn save(&self, config: &Config) -> Result<(), ConfigError>;

    /// Human-readable location, shown by `config show`.
    fn location(&self) -> String;
}

/// Stores configuration in a TOML file.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Picks the configuration file to use.
    ///
    /// Resolution order:
    /// 1. `explicit`, if provided
    /// 2. `.taxonrc.toml` in the current directory, if it exists
    /// 3. `<config dir>/taxon/config.toml`
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self::new(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_NAME);
        if local_config.exists() {
            return Self::new(local_config);
        }

        Self::new(Self::default_path())
    }

    /// Per-user configuration path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_default()
            .join("taxon")
            .join("config.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no configuration file, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| ConfigError::Read {
            path: self.path.clone(),
            source: e,
        })?;

        Config::from_toml(&content).map_err(|e| ConfigError::Invalid {
            path: self.path.clone(),
            source: e,
        })
    }

    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let content = config.to_toml()?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(&self.path, content).map_err(|e| ConfigError::Write {
            path: self.path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps configuration in memory. Used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    config: Mutex<Config>,
}

impl MemoryConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    /// Returns a copy of what is currently stored.
    pub fn snapshot(&self) -> Config {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Config> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.snapshot())
    }

    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        *self.lock() = config.clone();
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
