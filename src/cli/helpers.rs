//! Shared helper functions for CLI commands

use miette::Result;
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::core::Config;
use crate::schema::SchemaTree;
use crate::store::RecordStore;

/// Resolved locations and settings for one command run
///
/// Command-line flags win over the layered [`Config`].
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub schema_path: PathBuf,
    pub db_path: PathBuf,
    pub config: Config,
    pub quiet: bool,
}

impl CommandContext {
    pub fn new(global: &GlobalOpts) -> Self {
        Self::with_config(global, Config::load())
    }

    pub fn with_config(global: &GlobalOpts, config: Config) -> Self {
        Self {
            schema_path: global.schema.clone().unwrap_or_else(|| config.schema()),
            db_path: global.db.clone().unwrap_or_else(|| config.db()),
            config,
            quiet: global.quiet,
        }
    }

    pub fn load_schema(&self) -> Result<SchemaTree> {
        load_schema(&self.schema_path)
    }

    /// Open the record store, refusing to create one implicitly
    pub fn open_store(&self) -> Result<RecordStore> {
        open_store_at(&self.db_path)
    }

    /// Open the record store, creating it when missing
    pub fn create_store(&self) -> Result<RecordStore> {
        RecordStore::open(&self.db_path)
    }
}

/// Open an existing record store
pub fn open_store_at(path: &Path) -> Result<RecordStore> {
    if !path.exists() {
        return Err(miette::miette!("Record store not found: {}", path.display()));
    }
    RecordStore::open(path)
}

pub fn load_schema(path: &Path) -> Result<SchemaTree> {
    if !path.exists() {
        return Err(miette::miette!(
            help = "create one with 'taxonopy schema new <NAME>'",
            "Schema not found: {}",
            path.display()
        ));
    }
    let schema = SchemaTree::from_json_file(path)?;
    if schema.is_empty() {
        return Err(miette::miette!("Schema is empty: {}", path.display()));
    }
    Ok(schema)
}

/// Parse `KEY=VALUE` pairs; values keep any further `=` signs
pub fn parse_attributes(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| miette::miette!("Expected KEY=VALUE, got '{}'", pair))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(miette::miette!("Missing attribute name in '{}'", pair));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

/// `Name 'value'` label for a record's root
pub fn record_label(record: &SchemaTree) -> String {
    match record.root() {
        Some(root) => format!("{} '{}'", root.name(), root.attr("value").unwrap_or_default()),
        None => "(empty record)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_attributes() {
        let parsed = parse_attributes(&[
            "type=int".to_string(),
            "description=a = b".to_string(),
            "default=".to_string(),
        ])
        .unwrap();
        assert_eq!(
            parsed,
            vec![
                ("type".to_string(), "int".to_string()),
                ("description".to_string(), "a = b".to_string()),
                ("default".to_string(), String::new()),
            ]
        );
        assert!(parse_attributes(&["type".to_string()]).is_err());
        assert!(parse_attributes(&["=int".to_string()]).is_err());
    }

    #[test]
    fn test_record_label() {
        let mut record = SchemaTree::new();
        assert_eq!(record_label(&record), "(empty record)");
        record
            .add_node("Title", None, [("value", "Dune")])
            .unwrap();
        assert_eq!(record_label(&record), "Title 'Dune'");
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            schema: Some(PathBuf::from("conf.json")),
            db: Some(PathBuf::from("conf.sqlite")),
            ..Config::default()
        };
        let global = GlobalOpts {
            db: Some(PathBuf::from("flag.sqlite")),
            ..GlobalOpts::default()
        };
        let ctx = CommandContext::with_config(&global, config);
        assert_eq!(ctx.schema_path, PathBuf::from("conf.json"));
        assert_eq!(ctx.db_path, PathBuf::from("flag.sqlite"));
    }

    #[test]
    fn test_missing_files() {
        let dir = tempdir().unwrap();
        let global = GlobalOpts {
            schema: Some(dir.path().join("schema.json")),
            db: Some(dir.path().join("db.sqlite")),
            ..GlobalOpts::default()
        };
        let ctx = CommandContext::with_config(&global, Config::default());
        assert!(ctx.load_schema().is_err());
        assert!(ctx.open_store().is_err());
        assert!(ctx.create_store().is_ok());
        assert!(ctx.open_store().is_ok());
    }
}
