//! Database for csvdb
//!
//! Owns one `Table` per schema entry and the schema-wide lock that marks the
//! database directory as in use for as long as the database is open.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

use super::lock::{FileLock, LockPolicy};
use super::table::Table;
use crate::catalog::Schema;
use crate::collections::ChainedHashMap;
use crate::error::{Error, Result};

/// Name of the schema-wide lock file inside the database directory
pub const DB_LOCK_FILE: &str = ".db_lock";

/// An open database: the schema plus its tables
#[derive(Debug)]
pub struct Database {
    /// Schema the tables were built from
    schema: Schema,
    /// Database directory (`<data_dir>/<schema.name>`)
    path: PathBuf,
    /// Tables by name
    tables: ChainedHashMap<String, Table>,
    /// Schema-wide lock, held until `close` or drop
    lock: Mutex<Option<FileLock>>,
    lock_path: PathBuf,
}

impl Database {
    /// Open the database described by `schema` under `data_dir`
    pub fn open(schema: Schema, data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_policy(schema, data_dir, LockPolicy::DATABASE, LockPolicy::TABLE)
    }

    /// Open with explicit lock retry schedules for the database and its tables
    pub fn open_with_policy(
        schema: Schema,
        data_dir: impl AsRef<Path>,
        db_policy: LockPolicy,
        table_policy: LockPolicy,
    ) -> Result<Self> {
        schema.validate()?;

        let path = data_dir.as_ref().join(&schema.name);
        fs::create_dir_all(&path)?;

        let lock_path = path.join(DB_LOCK_FILE);
        let lock = FileLock::acquire(&lock_path, db_policy).map_err(|e| match e {
            Error::LockTimeout(path) => Error::DatabaseLocked(path),
            other => other,
        })?;

        let mut tables = ChainedHashMap::new();
        for config in schema.table_configs(&path) {
            let name = config.name.clone();
            let table = Table::open(config)?.with_lock_policy(table_policy);
            tables.insert(name, table);
        }

        info!(
            schema = %schema.name,
            path = %path.display(),
            tables = tables.len(),
            "database opened"
        );

        Ok(Self {
            schema,
            path,
            tables,
            lock: Mutex::new(Some(lock)),
            lock_path,
        })
    }

    /// Get a table by name
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Check if a table exists
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// List all table names in schema order
    pub fn table_names(&self) -> Vec<String> {
        self.schema.table_names()
    }

    pub fn schema_name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Database directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the schema-wide lock file
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Whether the schema-wide lock is still held
    pub fn is_locked(&self) -> bool {
        self.lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Release the schema-wide lock ahead of drop. Calling it twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let lock = self
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(lock) = lock {
            lock.release()?;
            info!(schema = %self.schema.name, "database closed");
        }
        Ok(())
    }
}
