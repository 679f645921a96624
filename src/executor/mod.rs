//! Query execution module
//!
//! This module contains the statement executor and the combined-row evaluation.

pub mod executor;
pub mod row;

pub use executor::{ExecutionEngine, QueryResult, NULL_TEXT};
pub use row::{bind_row, evaluate, Row};
