//! Error types for csvdb
//!
//! This module defines all error types used throughout the storage and query engines.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for csvdb
#[derive(Error, Debug)]
pub enum Error {
    // ========== Configuration Errors ==========
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config error: invalid schema document: {0}")]
    Json(#[from] serde_json::Error),

    // ========== Lexer / Parser Errors ==========
    #[error("Syntax error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Unknown command: {0}. Available commands: SELECT, INSERT, DELETE")]
    UnknownCommand(String),

    // ========== Catalog Errors ==========
    #[error("Table {0} not found")]
    TableNotFound(String),

    // ========== Validation Errors ==========
    #[error("Column count mismatch. Expected {expected} values, got {found}")]
    ColumnCountMismatch { expected: usize, found: usize },

    #[error("Invalid value '{0}': values cannot contain ',' or line breaks")]
    InvalidValue(String),

    // ========== Lock Errors ==========
    #[error("Table lock timeout: {}", .0.display())]
    LockTimeout(PathBuf),

    #[error("Database locked by another process: {}", .0.display())]
    DatabaseLocked(PathBuf),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for building a syntax error
    pub fn syntax(message: impl Into<String>) -> Self {
        Error::Syntax(message.into())
    }
}

/// Result type alias for csvdb operations
pub type Result<T> = std::result::Result<T, Error>;
