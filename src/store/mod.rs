//! SQLite-backed record store
//!
//! Each record is kept as one row holding its Tree-JSON document, plus the
//! root's name and value for listing. Queries are evaluated against the
//! parsed records.

pub mod csv;
mod query;

pub use query::{Query, ValueMatch};

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use miette::{IntoDiagnostic, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::schema::SchemaTree;

/// Current schema version - older stores are refused
const SCHEMA_VERSION: i32 = 1;

/// A record as stored
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: i64,
    pub record: SchemaTree,
    pub updated: DateTime<Utc>,
}

/// The record store backed by SQLite
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open or create a store file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).into_diagnostic()?;
        }
        let conn = Connection::open(path).into_diagnostic()?;
        tracing::debug!(path = %path.display(), "opened record store");
        Self::with_connection(conn)
    }

    /// Store that lives only as long as the value
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().into_diagnostic()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- One row per record
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                root_name TEXT NOT NULL,
                root_value TEXT,
                document TEXT NOT NULL,
                updated TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_records_root ON records(root_name, root_value);
            "#,
            )
            .into_diagnostic()?;

        let version: Option<i32> = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()
            .into_diagnostic()?;

        match version {
            None => {
                self.conn
                    .execute(
                        "INSERT INTO schema_version (version) VALUES (?1)",
                        params![SCHEMA_VERSION],
                    )
                    .into_diagnostic()?;
            }
            Some(v) if v != SCHEMA_VERSION => {
                return Err(miette::miette!(
                    "record store has schema version {}, expected {}",
                    v,
                    SCHEMA_VERSION
                ));
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Add a record, returning its id
    pub fn insert(&mut self, record: &SchemaTree) -> Result<i64> {
        let (name, value, document) = Self::columns(record)?;
        self.conn
            .execute(
                "INSERT INTO records (root_name, root_value, document, updated) VALUES (?1, ?2, ?3, ?4)",
                params![name, value, document, Utc::now().to_rfc3339()],
            )
            .into_diagnostic()?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, root = %name, "record stored");
        Ok(id)
    }

    /// Add many records in one transaction, optionally dropping every stored one first
    ///
    /// Nothing is written unless every record is accepted.
    pub fn insert_all(&mut self, records: &[SchemaTree], replace: bool) -> Result<usize> {
        let rows = records
            .iter()
            .map(Self::columns)
            .collect::<Result<Vec<_>>>()?;

        let tx = self.conn.transaction().into_diagnostic()?;
        if replace {
            tx.execute("DELETE FROM records", []).into_diagnostic()?;
        }
        let updated = Utc::now().to_rfc3339();
        for (name, value, document) in &rows {
            tx.execute(
                "INSERT INTO records (root_name, root_value, document, updated) VALUES (?1, ?2, ?3, ?4)",
                params![name, value, document, updated],
            )
            .into_diagnostic()?;
        }
        tx.commit().into_diagnostic()?;

        tracing::info!(count = rows.len(), replace, "records stored");
        Ok(rows.len())
    }

    /// Overwrite the record with the given id
    pub fn replace(&mut self, id: i64, record: &SchemaTree) -> Result<()> {
        let (name, value, document) = Self::columns(record)?;
        let changed = self
            .conn
            .execute(
                "UPDATE records SET root_name = ?1, root_value = ?2, document = ?3, updated = ?4 WHERE id = ?5",
                params![name, value, document, Utc::now().to_rfc3339(), id],
            )
            .into_diagnostic()?;
        if changed == 0 {
            return Err(miette::miette!("no record with id {}", id));
        }
        tracing::info!(id, "record replaced");
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<Option<SchemaTree>> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM records WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .into_diagnostic()?;

        document
            .map(|d| SchemaTree::from_json_str(&d).map_err(miette::Report::new))
            .transpose()
    }

    /// Every record, oldest first
    pub fn all(&self) -> Result<Vec<StoredRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, document, updated FROM records ORDER BY id")
            .into_diagnostic()?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .into_diagnostic()?;

        let mut records = Vec::new();
        for row in rows {
            let (id, document, updated) = row.into_diagnostic()?;
            let record = SchemaTree::from_json_str(&document).map_err(miette::Report::new)?;
            let updated = DateTime::parse_from_rfc3339(&updated)
                .map(|t| t.with_timezone(&Utc))
                .into_diagnostic()?;
            records.push(StoredRecord {
                id,
                record,
                updated,
            });
        }
        Ok(records)
    }

    pub fn search(&self, query: &Query) -> Result<Vec<StoredRecord>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|r| query.matches(&r.record))
            .collect())
    }

    pub fn count(&self, query: &Query) -> Result<usize> {
        if *query == Query::All {
            return self.len();
        }
        Ok(self.search(query)?.len())
    }

    /// Total number of records
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .into_diagnostic()?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every record
    pub fn clear(&mut self) -> Result<()> {
        self.conn
            .execute("DELETE FROM records", [])
            .into_diagnostic()?;
        tracing::info!("record store cleared");
        Ok(())
    }

    fn columns(record: &SchemaTree) -> Result<(String, Option<String>, String)> {
        let root = record
            .root()
            .ok_or_else(|| miette::miette!("cannot store an empty record"))?;
        let document = serde_json::to_string(&record.to_dict()).into_diagnostic()?;
        Ok((
            root.name().to_string(),
            root.attr("value").map(str::to_string),
            document,
        ))
    }
}
