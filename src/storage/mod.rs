//! Storage engine module
//!
//! This module contains the storage engine components:
//! - Advisory file locks
//! - Page files
//! - Tables (primary keys, paging, scan/insert/delete)
//! - The database (table registry and schema-wide lock)

pub mod database;
pub mod lock;
pub mod page;
pub mod table;

pub use database::{Database, DB_LOCK_FILE};
pub use lock::{FileLock, LockPolicy};
pub use page::PageFile;
pub use table::Table;
