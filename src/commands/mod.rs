//! Command-line surface
//!
//! Each subcommand maps onto one engine call and renders a short text
//! result. Errors come back as strings, ready to print.

pub mod progression;
pub mod quests;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};

use crate::engine::Engine;
use crate::models::Difficulty;
use crate::store::ProgressStore;

#[derive(Parser, Debug)]
#[command(name = "pathforge")]
#[command(version, about = "Daily habit paths with levels, tiers and quests")]
pub struct Cli {
  /// Owner id (defaults to PATHFORGE_OWNER)
  #[arg(long, global = true)]
  pub owner: Option<String>,

  /// Treat this date as today (YYYY-MM-DD)
  #[arg(long, global = true)]
  pub today: Option<NaiveDate>,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
  /// List the registered paths
  Paths,

  /// Start tracking a path
  Create { path: String },

  /// Mark today's work on a path as done
  Complete { path: String },

  /// Take back today's completion on a path
  Reverse { path: String },

  /// Add a quest for today (or the backlog)
  QuestAdd {
    title: String,
    /// easy, moderate, difficult, hard or hell
    #[arg(long)]
    difficulty: Option<Difficulty>,
    /// Comes back every day
    #[arg(long)]
    recurring: bool,
    /// Park the quest in the backlog instead of today
    #[arg(long)]
    backlog: bool,
    /// Subtask title (repeatable)
    #[arg(long = "subtask")]
    subtasks: Vec<String>,
  },

  /// Complete a quest and collect its coins
  QuestDone { id: i64 },

  /// Roll quests and daily flags over to today
  Rollover,

  /// Show tracked paths, coins and today's quests
  Status {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },
}

/// Current instant, or midnight UTC on `today` when one is given
pub fn resolve_now(today: Option<NaiveDate>) -> DateTime<Utc> {
  match today {
    Some(day) => day.and_time(NaiveTime::MIN).and_utc(),
    None => Utc::now(),
  }
}

/// Run one command for `owner_id` at `now`
pub async fn dispatch<S: ProgressStore>(
  engine: &Engine<S>,
  owner_id: &str,
  now: DateTime<Utc>,
  command: &Commands,
) -> Result<String, String> {
  match command {
    Commands::Paths => Ok(progression::list_paths(engine)),
    Commands::Create { path } => progression::create(engine, owner_id, path, now).await,
    Commands::Complete { path } => progression::complete(engine, owner_id, path, now).await,
    Commands::Reverse { path } => progression::reverse(engine, owner_id, path, now).await,
    Commands::QuestAdd {
      title,
      difficulty,
      recurring,
      backlog,
      subtasks,
    } => {
      quests::add(
        engine,
        quests::QuestDraft {
          owner_id,
          title,
          difficulty: *difficulty,
          recurring: *recurring,
          backlog: *backlog,
          subtasks,
        },
        now,
      )
      .await
    }
    Commands::QuestDone { id } => quests::done(engine, *id, now).await,
    Commands::Rollover => quests::rollover(engine, owner_id, now).await,
    Commands::Status { json } => progression::status(engine, owner_id, now, *json).await,
  }
}
