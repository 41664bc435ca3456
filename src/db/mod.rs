//! Database module: view models and SQL repositories.
//!
//! - `model`: view models returned by repositories.
//! - `repo`: SQL-only functions over the SQLite pool.
//!
//! The repository API is re-exported at `crate::db::*`.

pub mod model;
pub mod repo;

pub use model::TableCounts;
pub use repo::*;
