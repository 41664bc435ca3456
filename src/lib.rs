//! Import a Telegram relay bot's legacy JSON state into its SQLite database.

pub mod config;
pub mod db;
pub mod error;
pub mod legacy;
pub mod migrator;
pub mod model;
pub mod prompt;
pub mod store;
