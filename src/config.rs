//! Configuration loader and validator for the migration tool.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub migration: Migration,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Folder holding the bot database (`bot.db`).
    pub data_dir: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
        }
    }
}

impl App {
    /// `data_dir` with a leading `~` expanded.
    pub fn resolved_data_dir(&self) -> String {
        crate::prompt::expand_home(self.data_dir.trim())
            .to_string_lossy()
            .into_owned()
    }
}

/// Migration report settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Migration {
    /// How many recorded errors the final report lists.
    pub max_displayed_errors: usize,
}

impl Default for Migration {
    fn default() -> Self {
        Self {
            max_displayed_errors: 10,
        }
    }
}

impl Config {
    /// `DATABASE_URL` wins, otherwise `bot.db` inside the data dir.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/bot.db", self.app.resolved_data_dir()))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory,
///   falling back to built-in defaults when that file does not exist.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg = match path {
        Some(path) => parse(&fs::read_to_string(path)?)?,
        None => match fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(content) => parse(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(err) => return Err(err.into()),
        },
    };
    validate(&cfg)?;
    Ok(cfg)
}

fn parse(content: &str) -> Result<Config, ConfigError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.migration.max_displayed_errors == 0 {
        return Err(ConfigError::Invalid("migration.max_displayed_errors must be > 0"));
    }
    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

migration:
  max_displayed_errors: 10
"#
}
