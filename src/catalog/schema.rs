//! Schema definitions for csvdb
//!
//! A schema names the database directory, the per-page row limit and the
//! ordered column list of every table. It is loaded once from a JSON
//! document and never changes afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Suffix appended to a table name to build its primary-key column name
pub const PK_SUFFIX: &str = "_pk";

/// Primary-key column name for a table
pub fn pk_column_name(table: &str) -> String {
    format!("{}{}", table, PK_SUFFIX)
}

/// Database schema - table names, their columns and the page row limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name, also the name of the database directory
    pub name: String,
    /// Maximum number of data rows per page file
    pub tuples_limit: usize,
    /// Table name -> ordered column names (document order is kept)
    pub structure: IndexMap<String, Vec<String>>,
}

impl Schema {
    /// Create an empty schema
    pub fn new(name: impl Into<String>, tuples_limit: usize) -> Self {
        Self {
            name: name.into(),
            tuples_limit,
            structure: IndexMap::new(),
        }
    }

    /// Add a table definition (builder style)
    pub fn with_table<I, C>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.structure
            .insert(name.into(), columns.into_iter().map(Into::into).collect());
        self
    }

    /// Load and validate a schema from a JSON file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot open schema '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Parse and validate a schema from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value.get("structure") {
            Some(structure) if structure.is_object() => {}
            Some(_) => {
                return Err(Error::Config(
                    "structure in schema must be an object".to_string(),
                ))
            }
            None => return Err(Error::Config("schema has no structure".to_string())),
        }

        // Deserialize from the text so `structure` keeps document order
        let schema: Schema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check the invariants the storage layer relies on
    pub fn validate(&self) -> Result<()> {
        check_name("schema", &self.name)?;
        if self.tuples_limit == 0 {
            return Err(Error::Config(
                "tuples_limit must be greater than zero".to_string(),
            ));
        }

        for (table, columns) in &self.structure {
            check_name("table", table)?;
            let pk = pk_column_name(table);
            for (i, column) in columns.iter().enumerate() {
                check_name("column", column)?;
                if *column == pk {
                    return Err(Error::Config(format!(
                        "column '{}' of table '{}' uses the reserved primary key name",
                        column, table
                    )));
                }
                if columns[..i].contains(column) {
                    return Err(Error::Config(format!(
                        "duplicate column '{}' in table '{}'",
                        column, table
                    )));
                }
            }
        }
        Ok(())
    }

    /// Table names in document order
    pub fn table_names(&self) -> Vec<String> {
        self.structure.keys().cloned().collect()
    }

    /// Columns of a table
    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.structure.get(table).map(Vec::as_slice)
    }

    /// Derive the per-table configuration rooted at `schema_dir`
    pub fn table_configs(&self, schema_dir: &Path) -> Vec<TableConfig> {
        self.structure
            .iter()
            .map(|(table, columns)| TableConfig {
                name: table.clone(),
                tuples_limit: self.tuples_limit,
                base_path: schema_dir.join(table),
                columns: columns.clone(),
            })
            .collect()
    }
}

/// Names end up in file paths and in the comma-separated header line.
fn check_name(kind: &str, name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name
            .chars()
            .any(|c| c == ',' || c == '/' || c == '\\' || c == '\'' || c.is_whitespace());
    if invalid {
        return Err(Error::Config(format!("invalid {} name '{}'", kind, name)));
    }
    Ok(())
}

/// Configuration of a single table's storage
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    /// Table name
    pub name: String,
    /// Maximum number of data rows per page file
    pub tuples_limit: usize,
    /// Directory holding the page files, sequence file and lock file
    pub base_path: PathBuf,
    /// Ordered column names (without the primary key)
    pub columns: Vec<String>,
}
