//! Statement executor for csvdb
//!
//! SELECT joins its tables with nested full scans in FROM order and filters
//! the combined rows with the WHERE clause. INSERT and DELETE delegate to the
//! target table.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::row::{bind_row, evaluate, Row};
use crate::error::Result;
use crate::sql::{DeleteStatement, InsertStatement, Parser, Projection, SelectStatement, Statement};
use crate::storage::{Database, Table};

/// Rendered in place of a projected identifier the combined row does not bind
pub const NULL_TEXT: &str = "NULL";

/// Query result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Vec<String>>,
    /// Number of affected rows (for INSERT/DELETE)
    pub affected_rows: usize,
    /// Message
    pub message: Option<String>,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Create a result holding rows
    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    /// Rows as comma-joined lines
    pub fn lines(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.join(",")).collect()
    }

    /// Plain-text rendering: the message, or one comma-joined line per row
    pub fn to_text(&self) -> String {
        if let Some(message) = &self.message {
            return format!("{}\n", message);
        }
        let mut output = String::new();
        for line in self.lines() {
            output.push_str(&line);
            output.push('\n');
        }
        output
    }
}

/// One table of a join with its scanned rows already bound
struct JoinSource<'a> {
    table: &'a Table,
    bindings: Vec<Vec<(String, String)>>,
}

/// Execution Engine
pub struct ExecutionEngine {
    db: Arc<Database>,
}

impl ExecutionEngine {
    /// Create a new execution engine over a database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Parse a statement string. A single trailing `;` is ignored.
    pub fn parse(&self, sql: &str) -> Result<Statement> {
        let sql = sql.trim();
        let sql = sql.strip_suffix(';').unwrap_or(sql);
        Parser::new(sql)?.parse()
    }

    /// Parse and execute a statement string
    pub fn execute_sql(&self, sql: &str) -> Result<QueryResult> {
        let statement = self.parse(sql)?;
        self.execute(statement)
    }

    /// Execute a parsed statement
    pub fn execute(&self, statement: Statement) -> Result<QueryResult> {
        debug!(?statement, "executing statement");
        match statement {
            Statement::Select(select) => self.execute_select(&select),
            Statement::Insert(insert) => self.execute_insert(&insert),
            Statement::Delete(delete) => self.execute_delete(&delete),
        }
    }

    fn execute_select(&self, select: &SelectStatement) -> Result<QueryResult> {
        let mut sources = Vec::with_capacity(select.tables.len());
        for name in &select.tables {
            let table = self.db.table(name)?;
            let bindings = table
                .scan()?
                .iter()
                .map(|cells| bind_row(table.name(), table.pk_column_name(), table.columns(), cells))
                .collect();
            sources.push(JoinSource { table, bindings });
        }

        let columns = match &select.projection {
            Projection::All => sources
                .iter()
                .flat_map(|source| source.table.full_columns())
                .collect(),
            Projection::Columns(columns) => columns.clone(),
        };

        let mut rows = Vec::new();
        join(&sources, 0, &Row::new(), select, &mut rows);

        debug!(rows = rows.len(), "select finished");
        Ok(QueryResult::with_rows(columns, rows))
    }

    fn execute_insert(&self, insert: &InsertStatement) -> Result<QueryResult> {
        let table = self.db.table(&insert.table)?;
        let pk = table.insert(&insert.values)?;
        Ok(QueryResult::with_affected_rows(
            1,
            format!("Inserted 1 row ({} = {})", table.pk_column_name(), pk),
        ))
    }

    fn execute_delete(&self, delete: &DeleteStatement) -> Result<QueryResult> {
        let table = self.db.table(&delete.table)?;
        let deleted = table.delete_rows(|cells, columns| {
            let Some(expr) = &delete.selection else {
                return Ok(true);
            };
            let (pk_column, columns) = match columns.split_first() {
                Some((pk, rest)) => (pk.as_str(), rest),
                None => (table.pk_column_name(), columns),
            };
            let row: Row = bind_row(table.name(), pk_column, columns, cells)
                .into_iter()
                .collect();
            Ok(evaluate(expr, &row))
        })?;
        Ok(QueryResult::with_affected_rows(
            deleted,
            format!("Deleted {} row(s)", deleted),
        ))
    }
}

/// Descend through the join sources; at the leaf, filter and project
fn join(
    sources: &[JoinSource<'_>],
    depth: usize,
    current: &Row,
    select: &SelectStatement,
    out: &mut Vec<Vec<String>>,
) {
    let Some(source) = sources.get(depth) else {
        let matched = select
            .selection
            .as_ref()
            .map_or(true, |expr| evaluate(expr, current));
        if matched {
            out.push(project(sources, current, &select.projection));
        }
        return;
    };

    for bindings in &source.bindings {
        let mut combined = current.clone();
        combined.extend(bindings.iter().cloned());
        join(sources, depth + 1, &combined, select, out);
    }
}

fn project(sources: &[JoinSource<'_>], row: &Row, projection: &Projection) -> Vec<String> {
    let lookup = |key: &str| {
        row.get(key)
            .cloned()
            .unwrap_or_else(|| NULL_TEXT.to_string())
    };

    match projection {
        Projection::All => {
            let mut values = Vec::new();
            for source in sources {
                let table = source.table;
                values.push(lookup(table.pk_column_name()));
                for column in table.columns() {
                    values.push(lookup(&format!("{}.{}", table.name(), column)));
                }
            }
            values
        }
        Projection::Columns(columns) => columns.iter().map(|column| lookup(column)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Schema;
    use crate::error::Error;
    use tempfile::TempDir;

    fn create_engine(dir: &TempDir) -> ExecutionEngine {
        let schema = Schema::new("testdb", 2)
            .with_table("users", ["name", "city"])
            .with_table("t1", ["c1"])
            .with_table("t2", ["c2"]);
        let db = Database::open(schema, dir.path()).unwrap();
        ExecutionEngine::new(Arc::new(db))
    }

    fn select_lines(engine: &ExecutionEngine, sql: &str) -> Vec<String> {
        engine.execute_sql(sql).unwrap().lines()
    }

    #[test]
    fn test_insert_and_select() {
        let dir = TempDir::new().unwrap();
        let engine = create_engine(&dir);

        let result = engine
            .execute_sql("INSERT INTO users VALUES ('Ann', 'Oslo')")
            .unwrap();
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.message.as_deref(), Some("Inserted 1 row (users_pk = 1)"));

        engine
            .execute_sql("INSERT INTO users VALUES ('Bob', 'Rome');")
            .unwrap();

        assert_eq!(
            select_lines(&engine, "SELECT name, city FROM users"),
            vec!["Ann,Oslo", "Bob,Rome"]
        );
        assert_eq!(
            select_lines(&engine, "SELECT * FROM users"),
            vec!["1,Ann,Oslo", "2,Bob,Rome"]
        );

        let result = engine.execute_sql("SELECT * FROM users").unwrap();
        assert_eq!(result.columns, vec!["users_pk", "name", "city"]);
    }

    #[test]
    fn test_select_where_and_null() {
        let dir = TempDir::new().unwrap();
        let engine = create_engine(&dir);
        engine.execute_sql("INSERT INTO users VALUES ('Ann', 'Oslo')").unwrap();
        engine.execute_sql("INSERT INTO users VALUES ('Bob', 'Rome')").unwrap();
        engine.execute_sql("INSERT INTO users VALUES ('Cid', 'Oslo')").unwrap();

        assert_eq!(
            select_lines(&engine, "SELECT users_pk, name FROM users WHERE city = 'Oslo'"),
            vec!["1,Ann", "3,Cid"]
        );
        assert_eq!(
            select_lines(&engine, "SELECT name, missing FROM users WHERE users.name = 'Bob'"),
            vec!["Bob,NULL"]
        );
        assert!(select_lines(&engine, "SELECT name FROM users WHERE name = 'Zed'").is_empty());
    }

    #[test]
    fn test_join_semantics() {
        let dir = TempDir::new().unwrap();
        let engine = create_engine(&dir);
        engine.execute_sql("INSERT INTO t1 VALUES (A)").unwrap();
        engine.execute_sql("INSERT INTO t1 VALUES (B)").unwrap();
        engine.execute_sql("INSERT INTO t2 VALUES (A)").unwrap();
        engine.execute_sql("INSERT INTO t2 VALUES (C)").unwrap();

        assert_eq!(
            select_lines(&engine, "SELECT c1, c2 FROM t1, t2 WHERE c1 = c2"),
            vec!["A,A"]
        );
        // Cartesian product without WHERE, outer table first
        assert_eq!(
            select_lines(&engine, "SELECT c1, c2 FROM t1, t2"),
            vec!["A,A", "A,C", "B,A", "B,C"]
        );
        assert_eq!(
            select_lines(&engine, "SELECT * FROM t1, t2 WHERE t1.c1 = 'B' AND t2_pk = '2'"),
            vec!["2,B,2,C"]
        );
    }

    #[test]
    fn test_join_with_empty_table() {
        let dir = TempDir::new().unwrap();
        let engine = create_engine(&dir);
        engine.execute_sql("INSERT INTO t1 VALUES (A)").unwrap();

        assert!(select_lines(&engine, "SELECT c1 FROM t1, t2").is_empty());
    }

    #[test]
    fn test_select_unknown_table() {
        let dir = TempDir::new().unwrap();
        let engine = create_engine(&dir);

        let err = engine.execute_sql("SELECT * FROM users, nope").unwrap_err();
        assert!(matches!(err, Error::TableNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_delete_with_where() {
        let dir = TempDir::new().unwrap();
        let engine = create_engine(&dir);
        for (name, city) in [("Ann", "Oslo"), ("Bob", "Rome"), ("Cid", "Oslo")] {
            engine
                .execute_sql(&format!("INSERT INTO users VALUES ('{}', '{}')", name, city))
                .unwrap();
        }

        let result = engine
            .execute_sql("DELETE FROM users WHERE users.city = 'Oslo' AND name = 'Cid'")
            .unwrap();
        assert_eq!(result.affected_rows, 1);
        assert_eq!(result.message.as_deref(), Some("Deleted 1 row(s)"));

        let result = engine.execute_sql("DELETE FROM users WHERE users_pk = 1").unwrap();
        assert_eq!(result.affected_rows, 1);

        assert_eq!(select_lines(&engine, "SELECT name FROM users"), vec!["Bob"]);

        let result = engine.execute_sql("DELETE FROM users").unwrap();
        assert_eq!(result.affected_rows, 1);
        assert!(select_lines(&engine, "SELECT name FROM users").is_empty());
    }

    #[test]
    fn test_insert_errors() {
        let dir = TempDir::new().unwrap();
        let engine = create_engine(&dir);

        assert!(matches!(
            engine.execute_sql("INSERT INTO users VALUES ('only one')"),
            Err(Error::ColumnCountMismatch { .. })
        ));
        assert!(matches!(
            engine.execute_sql("INSERT INTO nope VALUES (1)"),
            Err(Error::TableNotFound(_))
        ));
        assert!(matches!(
            engine.execute_sql("INSERT users VALUES (1, 2)"),
            Err(Error::Syntax(_))
        ));
        assert!(matches!(
            engine.execute_sql("DROP TABLE users"),
            Err(Error::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_result_rendering() {
        let result = QueryResult::with_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec!["x".to_string(), "y".to_string()],
                vec!["p".to_string(), "q".to_string()],
            ],
        );
        assert_eq!(result.to_text(), "x,y\np,q\n");
        assert_eq!(QueryResult::with_message("done").to_text(), "done\n");
        assert_eq!(QueryResult::empty().to_text(), "");
    }
}
