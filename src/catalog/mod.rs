//! Catalog module
//!
//! This module contains the schema definition and the per-table storage configuration.

pub mod schema;

pub use schema::{pk_column_name, Schema, TableConfig, PK_SUFFIX};
