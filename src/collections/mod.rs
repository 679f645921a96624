//! Collections module
//!
//! Generic containers shared by the catalog, storage and executor layers.
//! Ordered sequences are plain `Vec<T>`; the associative map lives here.

pub mod chained_map;

pub use chained_map::ChainedHashMap;
