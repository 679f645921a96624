//! csvdb - CLI
//!
//! Opens a database in-process and runs statements typed at the `db> ` prompt.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use csvdb::catalog::Schema;
use csvdb::executor::ExecutionEngine;
use csvdb::storage::Database;

const PROMPT: &str = "db> ";

/// Local csvdb command loop
#[derive(Parser, Debug)]
#[command(name = "csvdb-cli", version, about = "Run csvdb statements against a local database")]
struct Args {
    /// Schema document
    #[arg(short = 's', long, value_name = "FILE", default_value = "schema.json")]
    schema: PathBuf,

    /// Directory that holds the schema directory
    #[arg(short = 'd', long, value_name = "DIR", default_value = ".")]
    data_dir: PathBuf,
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .tables            List all tables
  exit, quit         Leave the shell

Statements:
  SELECT <cols|*> FROM <table>[, <table>...] [WHERE ...]
  INSERT INTO <table> VALUES (<v1>, <v2>, ...)
  DELETE FROM <table> [WHERE ...]

Examples:
  INSERT INTO users VALUES ('Alice', 30)
  SELECT users.name, orders.item FROM users, orders WHERE users_pk = orders.user_id
  DELETE FROM users WHERE name = 'Alice' OR age = 30
"#
    );
}

/// Execute one statement and print its result
fn execute_sql(sql: &str, engine: &ExecutionEngine) {
    match engine.execute_sql(sql) {
        Ok(result) => print!("{}", result.to_text()),
        Err(e) => eprintln!("Error: {}", e),
    }
}

/// Main REPL loop
fn run_repl(engine: &ExecutionEngine) -> Result<()> {
    let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = editor.add_history_entry(line);

                match line {
                    "exit" | "quit" => break,
                    ".help" => print_help(),
                    ".tables" => println!("{}", engine.database().table_names().join(", ")),
                    _ => execute_sql(line, engine),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read input"),
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let schema = Schema::load_from_file(&args.schema)
        .with_context(|| format!("Failed to load schema {}", args.schema.display()))?;
    let db = Database::open(schema, &args.data_dir).context("Failed to open database")?;
    let engine = ExecutionEngine::new(Arc::new(db));

    println!("Database: {}", engine.database().schema_name());
    println!("Tables: {}", engine.database().table_names().join(", "));
    println!("Type '.help' for help, 'exit' to quit");

    let outcome = run_repl(&engine);

    engine.database().close().context("Failed to release database lock")?;
    println!("Goodbye!");

    outcome
}
