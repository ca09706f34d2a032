//! Runtime configuration
//!
//! Read from the environment (a `.env` file is loaded first by `run`).

use std::env;

use crate::error::{EngineError, EngineResult};

pub const DATABASE_URL_VAR: &str = "PATHFORGE_DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "PATHFORGE_MAX_CONNECTIONS";
pub const OWNER_VAR: &str = "PATHFORGE_OWNER";
pub const LOG_VAR: &str = "PATHFORGE_LOG";

/// Database URL that selects the in-process store (nothing survives the run)
pub const MEMORY_DATABASE_URL: &str = "memory";

const DEFAULT_DATABASE_URL: &str = "sqlite://pathforge.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_OWNER: &str = "local";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
  pub database_url: String,
  pub max_connections: u32,
  /// Owner used by the CLI when `--owner` is not given
  pub default_owner: String,
  /// `tracing-subscriber` env-filter directive
  pub log_filter: String,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      max_connections: DEFAULT_MAX_CONNECTIONS,
      default_owner: DEFAULT_OWNER.to_string(),
      log_filter: DEFAULT_LOG_FILTER.to_string(),
    }
  }
}

impl AppConfig {
  pub fn from_env() -> EngineResult<Self> {
    let defaults = Self::default();

    let max_connections = match env::var(MAX_CONNECTIONS_VAR) {
      Ok(raw) => raw
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
          EngineError::Config(format!("{} must be a positive integer, got '{}'", MAX_CONNECTIONS_VAR, raw))
        })?,
      Err(_) => defaults.max_connections,
    };

    Ok(Self {
      database_url: env::var(DATABASE_URL_VAR).unwrap_or(defaults.database_url),
      max_connections,
      default_owner: env::var(OWNER_VAR).unwrap_or(defaults.default_owner),
      log_filter: env::var(LOG_VAR).unwrap_or(defaults.log_filter),
    })
  }

  pub fn uses_memory_store(&self) -> bool {
    self.database_url == MEMORY_DATABASE_URL
  }
}
