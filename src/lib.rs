//! csvdb - a small file-backed table store with a SQL-like query engine
//!
//! This library provides the core components:
//! - Schema loading (catalog)
//! - Paginated CSV page-file storage with advisory locking
//! - Statement tokenizing and parsing (SELECT / INSERT / DELETE)
//! - Query execution (nested-scan joins, WHERE evaluation)
//! - TCP server

pub mod catalog;
pub mod collections;
pub mod error;
pub mod executor;
pub mod server;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
