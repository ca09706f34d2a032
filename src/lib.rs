pub mod commands;
pub mod completion;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod paths;
pub mod progression;
pub mod quests;
pub mod registry;
pub mod store;
pub mod tier;

#[cfg(test)]
pub mod test_utils;

use clap::Parser;

use commands::{Cli, Commands};
use config::AppConfig;
use engine::Engine;
use registry::PathLevelRegistry;
use store::{MemoryStore, ProgressStore, SqliteStore};

/// Entry point for the `pathforge` binary. Returns the process exit code.
pub async fn run() -> i32 {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let cli = Cli::parse();

  let config = match AppConfig::from_env() {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{}", e);
      return 2;
    }
  };

  // A second init (tests, embedding hosts) keeps the existing subscriber
  let _ = tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .try_init();

  let owner = cli.owner.clone().unwrap_or_else(|| config.default_owner.clone());
  let now = commands::resolve_now(cli.today);
  let registry = PathLevelRegistry::with_builtin_paths();

  let result = if config.uses_memory_store() {
    tracing::warn!("using in-memory store, nothing will be saved");
    execute(Engine::new(registry, MemoryStore::new()), &owner, now, &cli.command).await
  } else {
    match db::initialize_db(&config).await {
      Ok(pool) => {
        let engine = Engine::new(registry, SqliteStore::new(pool.clone()));
        let result = execute(engine, &owner, now, &cli.command).await;
        pool.close().await;
        result
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to initialize database");
        Err(e.to_string())
      }
    }
  };

  match result {
    Ok(output) => {
      println!("{}", output);
      0
    }
    Err(message) => {
      eprintln!("{}", message);
      1
    }
  }
}

async fn execute<S: ProgressStore>(
  engine: Engine<S>,
  owner: &str,
  now: chrono::DateTime<chrono::Utc>,
  command: &Commands,
) -> Result<String, String> {
  tracing::debug!(owner, %now, ?command, "dispatching");
  commands::dispatch(&engine, owner, now, command).await
}
