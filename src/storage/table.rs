//! Table storage for csvdb
//!
//! A table owns a directory holding its page files, a primary-key sequence
//! file and an advisory lock file. Inserts and deletes run under the table
//! lock; scans read the page files without locking.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::lock::{FileLock, LockPolicy};
use super::page::{self, PageFile, DELIMITER};
use crate::catalog::{pk_column_name, TableConfig};
use crate::error::{Error, Result};

/// A schema table stored as a sequence of page files
#[derive(Debug)]
pub struct Table {
    /// Storage configuration
    config: TableConfig,
    /// Primary-key column name (`<table>_pk`)
    pk_column: String,
    /// File holding the last assigned primary key
    pk_sequence_path: PathBuf,
    /// Advisory lock file
    lock_path: PathBuf,
    /// Retry schedule for the lock
    lock_policy: LockPolicy,
}

impl Table {
    /// Open (or create) the table's storage directory
    pub fn open(config: TableConfig) -> Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        let pk_column = pk_column_name(&config.name);
        let pk_sequence_path = config.base_path.join(format!("{}_pk_sequence", config.name));
        let lock_path = config.base_path.join(format!("{}_lock", config.name));

        if !pk_sequence_path.exists() {
            fs::write(&pk_sequence_path, "0")?;
        }

        Ok(Self {
            config,
            pk_column,
            pk_sequence_path,
            lock_path,
            lock_policy: LockPolicy::TABLE,
        })
    }

    /// Override the lock retry schedule
    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    /// Get table name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the configured columns (primary key excluded)
    pub fn columns(&self) -> &[String] {
        &self.config.columns
    }

    /// Get the primary-key column name
    pub fn pk_column_name(&self) -> &str {
        &self.pk_column
    }

    /// Primary key followed by the configured columns
    pub fn full_columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.config.columns.len() + 1);
        columns.push(self.pk_column.clone());
        columns.extend(self.config.columns.iter().cloned());
        columns
    }

    pub fn tuples_limit(&self) -> usize {
        self.config.tuples_limit
    }

    /// Directory holding the table's files
    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// Path of the table's advisory lock file
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Insert a row and return the primary key assigned to it
    pub fn insert<S: AsRef<str>>(&self, values: &[S]) -> Result<u64> {
        if values.len() != self.config.columns.len() {
            return Err(Error::ColumnCountMismatch {
                expected: self.config.columns.len(),
                found: values.len(),
            });
        }
        for value in values {
            let value = value.as_ref();
            if value.contains(DELIMITER) || value.contains('\n') || value.contains('\r') {
                return Err(Error::InvalidValue(value.to_string()));
            }
        }

        let _lock = self.lock()?;

        let id = self.next_id()?;
        let path = self.current_data_file_path()?;
        // A page left empty by an interrupted insert still needs its header
        let new_file = fs::metadata(&path).map_or(true, |meta| meta.len() == 0);

        let mut contents = String::new();
        if new_file {
            contents.push_str(&page::format_line(&self.full_columns()));
            contents.push('\n');
        }
        contents.push_str(&id.to_string());
        for value in values {
            contents.push(DELIMITER);
            contents.push_str(value.as_ref());
        }
        contents.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(contents.as_bytes())?;

        if new_file {
            info!(table = %self.name(), page = %path.display(), "started new page file");
        }
        debug!(table = %self.name(), pk = id, "row inserted");
        Ok(id)
    }

    /// Read every row of every page file, in page order then line order
    pub fn scan(&self) -> Result<Vec<Vec<String>>> {
        let mut rows = Vec::new();
        for path in self.data_files()? {
            let page = match PageFile::read(&path) {
                Ok(page) => page,
                // A page can vanish between listing and reading.
                Err(Error::Io(e)) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            rows.extend(page.rows());
        }
        Ok(rows)
    }

    /// Delete every row for which `predicate(row, full_columns)` holds.
    ///
    /// Only pages that lose at least one row are rewritten. Returns the number
    /// of rows removed. Predicate errors abort the delete after the lock is released.
    pub fn delete_rows<F>(&self, mut predicate: F) -> Result<usize>
    where
        F: FnMut(&[String], &[String]) -> Result<bool>,
    {
        let _lock = self.lock()?;

        let columns = self.full_columns();
        let mut deleted = 0;

        for path in self.data_files()? {
            let mut page = PageFile::read(&path)?;
            let before = page.lines.len();

            let mut kept = Vec::with_capacity(before);
            for line in page.lines {
                let row = page::parse_line(&line);
                if !predicate(&row, &columns)? {
                    kept.push(line);
                }
            }
            page.lines = kept;

            let removed = before - page.lines.len();
            if removed > 0 {
                page.write(&path)?;
                deleted += removed;
                debug!(table = %self.name(), page = %path.display(), removed, "page rewritten");
            }
        }

        info!(table = %self.name(), deleted, "rows deleted");
        Ok(deleted)
    }

    /// All page files in page order
    pub fn data_files(&self) -> Result<Vec<PathBuf>> {
        page::list_page_files(&self.config.base_path)
    }

    /// The page file the next insert goes to.
    ///
    /// This is the highest-numbered page, or the page after it once it holds
    /// `tuples_limit` rows. Page 1 when the table has no pages yet.
    pub fn current_data_file_path(&self) -> Result<PathBuf> {
        let last = self
            .data_files()?
            .into_iter()
            .filter_map(|path| page::page_number(&path).map(|n| (n, path)))
            .max_by_key(|(n, _)| *n);

        match last {
            None => Ok(self.config.base_path.join(page::page_file_name(1))),
            Some((number, path)) => {
                if page::count_data_rows(&path)? >= self.config.tuples_limit {
                    Ok(self.config.base_path.join(page::page_file_name(number + 1)))
                } else {
                    Ok(path)
                }
            }
        }
    }

    /// Last primary key handed out
    pub fn last_pk(&self) -> u64 {
        self.read_sequence()
    }

    fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(&self.lock_path, self.lock_policy)
    }

    fn read_sequence(&self) -> u64 {
        match fs::read_to_string(&self.pk_sequence_path) {
            Ok(contents) => contents.trim().parse().unwrap_or_else(|_| {
                warn!(table = %self.name(), "unreadable pk sequence, restarting from 0");
                0
            }),
            Err(e) => {
                warn!(table = %self.name(), error = %e, "missing pk sequence, restarting from 0");
                0
            }
        }
    }

    /// Read, increment and persist the primary-key counter. Caller holds the lock.
    fn next_id(&self) -> Result<u64> {
        let id = self.read_sequence() + 1;
        fs::write(&self.pk_sequence_path, id.to_string())?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_table(dir: &TempDir, columns: &[&str], limit: usize) -> Table {
        let config = TableConfig {
            name: "users".to_string(),
            tuples_limit: limit,
            base_path: dir.path().join("users"),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        };
        Table::open(config).unwrap()
    }

    #[test]
    fn test_open_creates_layout() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name", "age"], 10);

        let base = dir.path().join("users");
        assert!(base.is_dir());
        assert_eq!(
            fs::read_to_string(base.join("users_pk_sequence")).unwrap(),
            "0"
        );
        assert_eq!(table.pk_column_name(), "users_pk");
        assert_eq!(table.full_columns(), vec!["users_pk", "name", "age"]);
        assert_eq!(table.lock_path(), base.join("users_lock").as_path());
        assert!(table.data_files().unwrap().is_empty());
    }

    #[test]
    fn test_insert_into_empty_page_writes_header() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name", "age"], 10);
        let page = dir.path().join("users/1.csv");
        fs::write(&page, "").unwrap();

        assert_eq!(table.insert(&["Alice", "25"]).unwrap(), 1);

        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "users_pk,name,age\n1,Alice,25\n"
        );
        assert_eq!(table.scan().unwrap(), vec![vec!["1", "Alice", "25"]]);
    }

    #[test]
    fn test_table_insert() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name", "age"], 10);

        assert_eq!(table.insert(&["Alice", "25"]).unwrap(), 1);
        assert_eq!(table.insert(&["Bob", "30"]).unwrap(), 2);

        let contents = fs::read_to_string(dir.path().join("users/1.csv")).unwrap();
        assert_eq!(contents, "users_pk,name,age\n1,Alice,25\n2,Bob,30\n");
        assert!(!table.lock_path().exists());
        assert_eq!(table.last_pk(), 2);
    }

    #[test]
    fn test_table_wrong_column_count() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name", "age"], 10);

        let result = table.insert(&["Alice"]);
        assert!(matches!(
            result,
            Err(Error::ColumnCountMismatch {
                expected: 2,
                found: 1
            })
        ));
        assert!(!table.lock_path().exists());
        // A rejected row does not consume a primary key
        assert_eq!(table.insert(&["Alice", "25"]).unwrap(), 1);
    }

    #[test]
    fn test_value_with_delimiter_rejected() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name"], 10);

        assert!(matches!(
            table.insert(&["a,b"]),
            Err(Error::InvalidValue(_))
        ));
        assert!(table.scan().unwrap().is_empty());
    }

    #[test]
    fn test_table_scan() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name", "age"], 2);

        for i in 0..5 {
            table.insert(&[format!("User{}", i), format!("{}", 20 + i)]).unwrap();
        }

        let rows = table.scan().unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], vec!["1", "User0", "20"]);
        assert_eq!(rows[4], vec!["5", "User4", "24"]);
        assert_eq!(table.data_files().unwrap().len(), 3);
    }

    #[test]
    fn test_page_rotation_boundary() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name"], 3);
        let base = dir.path().join("users");

        assert_eq!(table.current_data_file_path().unwrap(), base.join("1.csv"));
        for i in 0..3 {
            table.insert(&[format!("n{}", i)]).unwrap();
        }
        // The third row fills page 1 without creating page 2
        assert!(!base.join("2.csv").exists());
        assert_eq!(table.current_data_file_path().unwrap(), base.join("2.csv"));

        table.insert(&["n3"]).unwrap();
        assert!(base.join("2.csv").exists());
        assert_eq!(
            fs::read_to_string(base.join("2.csv")).unwrap(),
            "users_pk,name\n4,n3\n"
        );
    }

    #[test]
    fn test_delete_rows() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name"], 2);
        for name in ["a", "b", "c", "d"] {
            table.insert(&[name]).unwrap();
        }

        let deleted = table
            .delete_rows(|row, columns| {
                assert_eq!(columns, ["users_pk", "name"]);
                Ok(row[1] == "b" || row[1] == "c")
            })
            .unwrap();
        assert_eq!(deleted, 2);

        let names: Vec<_> = table.scan().unwrap().into_iter().map(|r| r[1].clone()).collect();
        assert_eq!(names, vec!["a", "d"]);
        assert!(!table.lock_path().exists());
    }

    #[test]
    fn test_delete_nothing_keeps_bytes() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name"], 10);
        table.insert(&["a"]).unwrap();
        let path = dir.path().join("users/1.csv");
        let before = fs::read(&path).unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        assert_eq!(table.delete_rows(|_, _| Ok(false)).unwrap(), 0);

        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn test_delete_all_keeps_header() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name"], 10);
        table.insert(&["a"]).unwrap();
        table.insert(&["b"]).unwrap();

        assert_eq!(table.delete_rows(|_, _| Ok(true)).unwrap(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("users/1.csv")).unwrap(),
            "users_pk,name\n"
        );
        // New rows keep numbering after the deleted ones
        assert_eq!(table.insert(&["c"]).unwrap(), 3);
    }

    #[test]
    fn test_predicate_error_releases_lock() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name"], 10);
        table.insert(&["a"]).unwrap();

        let result = table.delete_rows(|_, _| Err(Error::syntax("bad predicate")));
        assert!(matches!(result, Err(Error::Syntax(_))));
        assert!(!table.lock_path().exists());
        assert_eq!(table.scan().unwrap().len(), 1);
    }

    #[test]
    fn test_lock_timeout() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name"], 10)
            .with_lock_policy(LockPolicy::new(Duration::from_millis(1), 3));

        let _held = FileLock::acquire(table.lock_path(), LockPolicy::TABLE).unwrap();
        assert!(matches!(table.insert(&["a"]), Err(Error::LockTimeout(_))));
        assert!(matches!(
            table.delete_rows(|_, _| Ok(true)),
            Err(Error::LockTimeout(_))
        ));
    }

    #[test]
    fn test_unreadable_sequence_fails_open() {
        let dir = TempDir::new().unwrap();
        let table = create_test_table(&dir, &["name"], 10);
        fs::write(dir.path().join("users/users_pk_sequence"), "garbage").unwrap();

        assert_eq!(table.insert(&["a"]).unwrap(), 1);
    }
}
