//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Engine and store fixtures
//! - Mock data factories
//! - Fixed-calendar time helpers

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::engine::Engine;
use crate::models::{NewEntity, NewQuest, QuestStatus, TrackedEntity};
use crate::registry::PathLevelRegistry;
use crate::store::{MemoryStore, ProgressStore, SqliteStore};
use crate::tier::Tier;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// ---------------------------------------------------------------------------
/// Engine Fixtures
/// ---------------------------------------------------------------------------

/// Engine over the built-in paths and a fresh in-memory store
pub fn memory_engine() -> Engine<MemoryStore> {
  Engine::new(PathLevelRegistry::with_builtin_paths(), MemoryStore::new())
}

/// Engine over the built-in paths and a migrated SQLite pool
pub fn sqlite_engine(pool: SqlitePool) -> Engine<SqliteStore> {
  Engine::new(PathLevelRegistry::with_builtin_paths(), SqliteStore::new(pool))
}

/// Insert a fresh level 1 D entity for each path, created on `d`
pub async fn seed_entities<S: ProgressStore>(
  store: &S,
  owner_id: &str,
  paths: &[&str],
  d: u32,
) -> Vec<TrackedEntity> {
  let mut entities = Vec::new();
  for path in paths {
    let entity = store
      .insert_entity(NewEntity {
        owner_id: owner_id.to_string(),
        path_type: path.to_string(),
        tier: Tier::D,
        level: 1,
        progress_required_for_level: 3,
        created_at: datetime_on(d),
      })
      .await
      .expect("Failed to seed entity");
    entities.push(entity);
  }
  entities
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Active level 1 D entity last touched at `last_updated`
pub fn mock_entity(path: &str, last_updated: DateTime<Utc>) -> TrackedEntity {
  TrackedEntity {
    id: 1,
    owner_id: "u1".to_string(),
    path_type: path.to_string(),
    tier: Tier::D,
    level: 1,
    accumulated_progress: 0,
    progress_required_for_level: 3,
    completed_today: false,
    last_updated,
    is_active: true,
    streak_days: 0,
    created_at: last_updated,
  }
}

/// Easy quest for `owner_id` on `date` with two subtasks
pub fn new_quest(owner_id: &str, date: NaiveDate, is_recurring: bool) -> NewQuest {
  NewQuest {
    owner_id: owner_id.to_string(),
    title: if is_recurring { "Daily review" } else { "Clean the desk" }.to_string(),
    date,
    status: QuestStatus::Today,
    difficulty: None,
    is_recurring,
    subtasks: vec!["Start".to_string(), "Finish".to_string()],
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// January `d`, 2024
pub fn day(d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(2024, 1, d).expect("valid test day")
}

/// Noon UTC on January `d`, 2024
pub fn datetime_on(d: u32) -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(2024, 1, d, 12, 0, 0)
    .single()
    .expect("valid test datetime")
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('tracked_entities', 'quests', 'daily_path_progress', 'profiles', 'day_snapshots', 'task_log')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 6, "Expected 6 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_entities_returns_one_per_path() {
    let store = MemoryStore::new();
    let entities = seed_entities(&store, "u1", &["athlete", "monk"], 1).await;

    assert_eq!(entities.len(), 2);
    assert_eq!(store.list_entities("u1").await.unwrap().len(), 2);
  }

  #[test]
  fn test_time_helpers_line_up() {
    assert_eq!(datetime_on(5).date_naive(), day(5));
    assert_eq!(mock_entity("monk", datetime_on(2)).days_since_update(day(4)), 2);
  }
}
