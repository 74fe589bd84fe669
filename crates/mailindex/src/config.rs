//! Index configuration
//!
//! Settings are read from `mailindex.json` in the config directory. The
//! database location can be overridden with `MAILINDEX_DATABASE`; without
//! either, the mail root defaults to `~/mail`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Config filename in the mailindex config directory
pub const CONFIG_FILE: &str = "mailindex.json";

/// Environment variable overriding the mail root
pub const DATABASE_ENV: &str = "MAILINDEX_DATABASE";

/// Settings shared by the library context, the scanner and bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Mail root; the index lives in `<root>/.mailindex`
    pub database_path: PathBuf,
    /// Tags applied to messages first seen by a scan
    pub new_tags: Vec<String>,
    /// Tags hidden from searches unless named in the query
    pub exclude_tags: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            new_tags: vec!["inbox".to_string(), "unread".to_string()],
            exclude_tags: Vec::new(),
        }
    }
}

fn default_database_path() -> PathBuf {
    config::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mail")
}

impl IndexConfig {
    /// Load settings using the following priority:
    /// 1. `MAILINDEX_DATABASE` for the database path
    /// 2. `mailindex.json` in the config directory
    /// 3. Built-in defaults
    pub fn load() -> Result<Self> {
        let mut config: IndexConfig = config::load_json_or_default(CONFIG_FILE)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a specific JSON file, then apply the environment
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let mut config: IndexConfig = config::load_json_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: IndexConfig =
            serde_json::from_str(json).context("Failed to parse index config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        config::save_json(CONFIG_FILE, self)
    }

    fn apply_env(&mut self) {
        if let Some(path) = std::env::var_os(DATABASE_ENV).filter(|p| !p.is_empty()) {
            self.database_path = PathBuf::from(path);
        }
    }

    fn validate(&self) -> Result<()> {
        for tag in self.new_tags.iter().chain(&self.exclude_tags) {
            crate::models::validate_tag(tag)
                .with_context(|| format!("Invalid tag {:?} in index config", tag))?;
        }
        Ok(())
    }
}
