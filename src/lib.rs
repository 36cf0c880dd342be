//! taxon - sort a folder's files into category subfolders
//!
//! This library provides a prioritized rule engine for classifying file names,
//! a built-in extension table used when no rules are configured, and an
//! organizer that moves files into category folders while resolving name
//! collisions with a configurable policy. Settings and rules are persisted via
//! TOML configuration files.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod rules;
pub mod schedule;

pub use config::{Config, ConfigError, ConfigStore, FileConfigStore, MemoryConfigStore};
pub use file_category::{Category, DEFAULT_CATEGORY, ExtensionTable};
pub use file_organizer::{
    ConflictPolicy, FileOutcome, OrganizeError, OrganizeOptions, Organizer, RunStats,
};
pub use rules::{Rule, RuleEngine, RuleKind};
pub use schedule::Scheduler;

pub use cli::{Cli, run_cli};
