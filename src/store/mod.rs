//! Storage port
//!
//! The engine reads and writes plain records through `ProgressStore`.
//! Adapters:
//! - `SqliteStore`: local SQLite database via sqlx
//! - `MemoryStore`: in-process key-value fallback
//!
//! Multi-record writes (`commit_transition`, `commit_quest_completion`)
//! are all-or-nothing: either every record lands or none does.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::EngineResult;
use crate::models::{
  DailyPathProgress, DaySnapshot, NewEntity, NewQuest, Profile, Quest, QuestPatch, TaskLogEntry,
  TrackedEntity,
};
use crate::progression::LevelRewards;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Everything an accepted complete/reverse writes
#[derive(Debug, Clone)]
pub struct TransitionCommit {
  pub entity: TrackedEntity,
  pub log: TaskLogEntry,
  /// Credited to the owner's profile
  pub rewards: LevelRewards,
  /// Day progress row that triggered the transition, if any
  pub daily: Option<DailyPathProgress>,
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
  // Entities
  async fn get_entity(&self, id: i64) -> EngineResult<TrackedEntity>;
  async fn list_entities(&self, owner_id: &str) -> EngineResult<Vec<TrackedEntity>>;
  async fn insert_entity(&self, entity: NewEntity) -> EngineResult<TrackedEntity>;
  /// Full replace
  async fn update_entity(&self, entity: &TrackedEntity) -> EngineResult<TrackedEntity>;
  /// Removes the entity with its task log and daily progress rows
  async fn delete_entity(&self, id: i64) -> EngineResult<()>;
  async fn commit_transition(&self, commit: TransitionCommit) -> EngineResult<TrackedEntity>;

  // Quests
  async fn get_quest(&self, id: i64) -> EngineResult<Quest>;
  async fn get_quests_for_owner(&self, owner_id: &str) -> EngineResult<Vec<Quest>>;
  async fn insert_quest(&self, quest: NewQuest) -> EngineResult<Quest>;
  async fn update_quest(&self, id: i64, patch: &QuestPatch) -> EngineResult<Quest>;
  /// Quest update and coin credit in one write
  async fn commit_quest_completion(
    &self,
    id: i64,
    patch: &QuestPatch,
    coins: i64,
  ) -> EngineResult<(Quest, Profile)>;

  // Daily progress
  async fn get_daily_path_progress(
    &self,
    owner_id: &str,
    path_id: &str,
    date: NaiveDate,
  ) -> EngineResult<Option<DailyPathProgress>>;
  async fn upsert_daily_path_progress(
    &self,
    record: &DailyPathProgress,
  ) -> EngineResult<DailyPathProgress>;

  // Profile
  /// Empty profile when the owner has none yet
  async fn get_profile(&self, owner_id: &str) -> EngineResult<Profile>;

  // History
  async fn record_day_snapshot(&self, snapshot: &DaySnapshot) -> EngineResult<()>;
  async fn list_day_snapshots(&self, owner_id: &str) -> EngineResult<Vec<DaySnapshot>>;
  async fn list_task_log(&self, entity_id: i64) -> EngineResult<Vec<TaskLogEntry>>;
}
