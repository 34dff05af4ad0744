//! Configuration and file management for gh-pr-guardian
//!
//! This crate provides:
//! - Configuration file loading (TOML) and `.env` support
//! - Guardian configuration with environment overrides (GuardianConfig)
//! - Cache paths for the label expiry ledger

pub mod config_file;
pub mod guardian_config;
pub mod paths;

pub use config_file::{load_config_file, load_dotenv};
pub use guardian_config::{
    GuardianConfig, RepositoryParseError, RepositoryRef, DEFAULT_REPOSITORY,
};
pub use paths::{cache_dir, ledger_path};
