//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default schema file name
pub const DEFAULT_SCHEMA: &str = "schema.json";

/// Default record store file name
pub const DEFAULT_DB: &str = "db.sqlite";

/// Project-local config file name
pub const LOCAL_CONFIG: &str = ".taxonopy.yaml";

/// Taxonopy configuration with layered hierarchy
///
/// Every field is optional so layers can be merged; use the accessor methods
/// to read a value with its default applied.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema file used when `--schema` is not given
    pub schema: Option<PathBuf>,

    /// Record store used when `--db` is not given
    pub db: Option<PathBuf>,

    /// Separator between path segments in flat column titles
    pub title_sep: Option<String>,

    /// Separator between multiple values in one flat cell
    pub value_sep: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Global user config (~/.config/taxonopy/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            config.merge_file(&global_path);
        }

        // 2. Project config in the working directory
        config.merge_file(Path::new(LOCAL_CONFIG));

        // 3. Environment variables
        if let Ok(schema) = std::env::var("TAXONOPY_SCHEMA") {
            config.schema = Some(PathBuf::from(schema));
        }
        if let Ok(db) = std::env::var("TAXONOPY_DB") {
            config.db = Some(PathBuf::from(db));
        }

        config
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "taxonopy")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn merge_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yml::from_str::<Config>(&contents) {
                Ok(layer) => {
                    tracing::debug!(path = %path.display(), "merged config layer");
                    self.merge(layer);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config"),
            },
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config"),
        }
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.db.is_some() {
            self.db = other.db;
        }
        if other.title_sep.is_some() {
            self.title_sep = other.title_sep;
        }
        if other.value_sep.is_some() {
            self.value_sep = other.value_sep;
        }
    }

    pub fn schema(&self) -> PathBuf {
        self.schema
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA))
    }

    pub fn db(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
    }

    pub fn title_sep(&self) -> &str {
        self.title_sep.as_deref().unwrap_or(":")
    }

    pub fn value_sep(&self) -> &str {
        self.value_sep.as_deref().unwrap_or(", ")
    }
}
