//! SQLite adapter for the storage port
//!
//! Dates are stored as `YYYY-MM-DD`, timestamps as RFC 3339 text, and id
//! sets / subtasks as JSON columns.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::BTreeSet;

use super::{ProgressStore, TransitionCommit};
use crate::completion::CompletionAction;
use crate::error::{EngineError, EngineResult};
use crate::models::{
  DailyPathProgress, DayStatus, DaySnapshot, Difficulty, NewEntity, NewQuest, Profile, Quest,
  QuestPatch, QuestStatus, Subtask, TaskLogEntry, TrackedEntity,
};
use crate::tier::Tier;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }
}

/// ---------------------------------------------------------------------------
/// Column Conversions
/// ---------------------------------------------------------------------------

fn parse_timestamp(value: &str) -> EngineResult<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(value)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| EngineError::Persistence(format!("Bad timestamp '{}': {}", value, e)))
}

fn parse_date(value: &str) -> EngineResult<NaiveDate> {
  NaiveDate::parse_from_str(value, DATE_FORMAT)
    .map_err(|e| EngineError::Persistence(format!("Bad date '{}': {}", value, e)))
}

fn format_date(date: NaiveDate) -> String {
  date.format(DATE_FORMAT).to_string()
}

fn parse_column<T: std::str::FromStr<Err = String>>(value: &str) -> EngineResult<T> {
  value.parse().map_err(EngineError::Persistence)
}

fn to_u32(value: i64) -> u32 {
  u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn entity_from_row(row: &SqliteRow) -> EngineResult<TrackedEntity> {
  let tier: String = row.try_get("tier")?;
  let last_updated: String = row.try_get("last_updated")?;
  let created_at: String = row.try_get("created_at")?;

  Ok(TrackedEntity {
    id: row.try_get("id")?,
    owner_id: row.try_get("owner_id")?,
    path_type: row.try_get("path_type")?,
    tier: parse_column::<Tier>(&tier)?,
    level: to_u32(row.try_get("level")?),
    accumulated_progress: to_u32(row.try_get("accumulated_progress")?),
    progress_required_for_level: to_u32(row.try_get("progress_required_for_level")?),
    completed_today: row.try_get("completed_today")?,
    last_updated: parse_timestamp(&last_updated)?,
    is_active: row.try_get("is_active")?,
    streak_days: to_u32(row.try_get("streak_days")?),
    created_at: parse_timestamp(&created_at)?,
  })
}

fn quest_from_row(row: &SqliteRow) -> EngineResult<Quest> {
  let date: String = row.try_get("date")?;
  let status: String = row.try_get("status")?;
  let difficulty: String = row.try_get("difficulty")?;
  let base_difficulty: String = row.try_get("base_difficulty")?;
  let subtasks_json: String = row.try_get("subtasks_json")?;
  let completed_at: Option<String> = row.try_get("completed_at")?;

  Ok(Quest {
    id: row.try_get("id")?,
    owner_id: row.try_get("owner_id")?,
    title: row.try_get("title")?,
    date: parse_date(&date)?,
    status: parse_column::<QuestStatus>(&status)?,
    difficulty: parse_column::<Difficulty>(&difficulty)?,
    base_difficulty: parse_column::<Difficulty>(&base_difficulty)?,
    days_not_completed: to_u32(row.try_get("days_not_completed")?),
    is_recurring: row.try_get("is_recurring")?,
    subtasks: serde_json::from_str::<Vec<Subtask>>(&subtasks_json)?,
    completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
  })
}

fn daily_from_row(row: &SqliteRow) -> EngineResult<DailyPathProgress> {
  let date: String = row.try_get("date")?;
  let status: String = row.try_get("status")?;
  let tasks_json: String = row.try_get("completed_task_ids_json")?;
  let subtasks_json: String = row.try_get("completed_subtask_ids_json")?;

  Ok(DailyPathProgress {
    owner_id: row.try_get("owner_id")?,
    path_id: row.try_get("path_id")?,
    date: parse_date(&date)?,
    tasks_total: to_u32(row.try_get("tasks_total")?),
    tasks_completed: to_u32(row.try_get("tasks_completed")?),
    percentage: to_u32(row.try_get("percentage")?),
    status: parse_column::<DayStatus>(&status)?,
    completed_task_ids: serde_json::from_str::<BTreeSet<String>>(&tasks_json)?,
    completed_subtask_ids: serde_json::from_str::<BTreeSet<String>>(&subtasks_json)?,
  })
}

fn snapshot_from_row(row: &SqliteRow) -> EngineResult<DaySnapshot> {
  let date: String = row.try_get("date")?;
  let ids_json: String = row.try_get("completed_quest_ids_json")?;

  Ok(DaySnapshot {
    owner_id: row.try_get("owner_id")?,
    date: parse_date(&date)?,
    quests_total: to_u32(row.try_get("quests_total")?),
    quests_completed: to_u32(row.try_get("quests_completed")?),
    completed_quest_ids: serde_json::from_str(&ids_json)?,
  })
}

fn log_from_row(row: &SqliteRow) -> EngineResult<TaskLogEntry> {
  let action: String = row.try_get("action")?;
  let logged_at: String = row.try_get("logged_at")?;
  let tier_after: String = row.try_get("tier_after")?;

  Ok(TaskLogEntry {
    entity_id: row.try_get("entity_id")?,
    action: parse_column::<CompletionAction>(&action)?,
    logged_at: parse_timestamp(&logged_at)?,
    level_after: to_u32(row.try_get("level_after")?),
    tier_after: parse_column::<Tier>(&tier_after)?,
    progress_after: to_u32(row.try_get("progress_after")?),
  })
}

/// ---------------------------------------------------------------------------
/// Statements shared by single writes and transactions
/// ---------------------------------------------------------------------------

async fn write_entity(conn: &mut SqliteConnection, entity: &TrackedEntity) -> EngineResult<()> {
  let result = sqlx::query(
    r#"
    UPDATE tracked_entities
    SET tier = ?,
        level = ?,
        accumulated_progress = ?,
        progress_required_for_level = ?,
        completed_today = ?,
        last_updated = ?,
        is_active = ?,
        streak_days = ?
    WHERE id = ?
    "#,
  )
  .bind(entity.tier.to_string())
  .bind(i64::from(entity.level))
  .bind(i64::from(entity.accumulated_progress))
  .bind(i64::from(entity.progress_required_for_level))
  .bind(entity.completed_today)
  .bind(entity.last_updated.to_rfc3339())
  .bind(entity.is_active)
  .bind(i64::from(entity.streak_days))
  .bind(entity.id)
  .execute(&mut *conn)
  .await?;

  if result.rows_affected() == 0 {
    return Err(EngineError::not_found("entity", entity.id));
  }
  Ok(())
}

async fn fetch_quest(conn: &mut SqliteConnection, id: i64) -> EngineResult<Quest> {
  let row = sqlx::query("SELECT * FROM quests WHERE id = ?")
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| EngineError::not_found("quest", id))?;
  quest_from_row(&row)
}

async fn write_quest(conn: &mut SqliteConnection, quest: &Quest) -> EngineResult<()> {
  let subtasks_json = serde_json::to_string(&quest.subtasks)?;
  sqlx::query(
    r#"
    UPDATE quests
    SET title = ?,
        date = ?,
        status = ?,
        difficulty = ?,
        base_difficulty = ?,
        days_not_completed = ?,
        is_recurring = ?,
        subtasks_json = ?,
        completed_at = ?
    WHERE id = ?
    "#,
  )
  .bind(&quest.title)
  .bind(format_date(quest.date))
  .bind(quest.status.to_string())
  .bind(quest.difficulty.to_string())
  .bind(quest.base_difficulty.to_string())
  .bind(i64::from(quest.days_not_completed))
  .bind(quest.is_recurring)
  .bind(subtasks_json)
  .bind(quest.completed_at.map(|d| d.to_rfc3339()))
  .bind(quest.id)
  .execute(&mut *conn)
  .await?;
  Ok(())
}

async fn credit_profile(
  conn: &mut SqliteConnection,
  owner_id: &str,
  coins: i64,
  stat_points: i64,
) -> EngineResult<Profile> {
  sqlx::query(
    r#"
    INSERT INTO profiles (owner_id, coins, stat_points)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(owner_id) DO UPDATE SET
      coins = coins + excluded.coins,
      stat_points = stat_points + excluded.stat_points
    "#,
  )
  .bind(owner_id)
  .bind(coins)
  .bind(stat_points)
  .execute(&mut *conn)
  .await?;

  fetch_profile(conn, owner_id).await
}

async fn fetch_profile(conn: &mut SqliteConnection, owner_id: &str) -> EngineResult<Profile> {
  let row: Option<(String, i64, i64)> =
    sqlx::query_as("SELECT owner_id, coins, stat_points FROM profiles WHERE owner_id = ?")
      .bind(owner_id)
      .fetch_optional(&mut *conn)
      .await?;

  Ok(match row {
    Some((owner_id, coins, stat_points)) => Profile {
      owner_id,
      coins,
      stat_points,
    },
    None => Profile::empty(owner_id),
  })
}

async fn write_daily(conn: &mut SqliteConnection, record: &DailyPathProgress) -> EngineResult<()> {
  let tasks_json = serde_json::to_string(&record.completed_task_ids)?;
  let subtasks_json = serde_json::to_string(&record.completed_subtask_ids)?;

  sqlx::query(
    r#"
    INSERT INTO daily_path_progress (
      owner_id, path_id, date, tasks_total, tasks_completed, percentage,
      status, completed_task_ids_json, completed_subtask_ids_json
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(owner_id, path_id, date) DO UPDATE SET
      tasks_total = excluded.tasks_total,
      tasks_completed = excluded.tasks_completed,
      percentage = excluded.percentage,
      status = excluded.status,
      completed_task_ids_json = excluded.completed_task_ids_json,
      completed_subtask_ids_json = excluded.completed_subtask_ids_json
    "#,
  )
  .bind(&record.owner_id)
  .bind(&record.path_id)
  .bind(format_date(record.date))
  .bind(i64::from(record.tasks_total))
  .bind(i64::from(record.tasks_completed))
  .bind(i64::from(record.percentage))
  .bind(record.status.to_string())
  .bind(tasks_json)
  .bind(subtasks_json)
  .execute(&mut *conn)
  .await?;
  Ok(())
}

async fn write_log(conn: &mut SqliteConnection, entry: &TaskLogEntry) -> EngineResult<()> {
  sqlx::query(
    r#"
    INSERT INTO task_log
      (entity_id, action, logged_at, level_after, tier_after, progress_after)
    VALUES (?, ?, ?, ?, ?, ?)
    "#,
  )
  .bind(entry.entity_id)
  .bind(entry.action.to_string())
  .bind(entry.logged_at.to_rfc3339())
  .bind(i64::from(entry.level_after))
  .bind(entry.tier_after.to_string())
  .bind(i64::from(entry.progress_after))
  .execute(&mut *conn)
  .await?;
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Port Implementation
/// ---------------------------------------------------------------------------

#[async_trait]
impl ProgressStore for SqliteStore {
  async fn get_entity(&self, id: i64) -> EngineResult<TrackedEntity> {
    let row = sqlx::query("SELECT * FROM tracked_entities WHERE id = ?")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| EngineError::not_found("entity", id))?;
    entity_from_row(&row)
  }

  async fn list_entities(&self, owner_id: &str) -> EngineResult<Vec<TrackedEntity>> {
    let rows = sqlx::query("SELECT * FROM tracked_entities WHERE owner_id = ? ORDER BY id")
      .bind(owner_id)
      .fetch_all(&self.pool)
      .await?;
    rows.iter().map(entity_from_row).collect()
  }

  async fn insert_entity(&self, entity: NewEntity) -> EngineResult<TrackedEntity> {
    let created_at = entity.created_at.to_rfc3339();
    let result = sqlx::query(
      r#"
      INSERT INTO tracked_entities (
        owner_id, path_type, tier, level, accumulated_progress,
        progress_required_for_level, completed_today, last_updated,
        is_active, streak_days, created_at
      )
      VALUES (?1, ?2, ?3, ?4, 0, ?5, 0, ?6, 1, 0, ?6)
      "#,
    )
    .bind(&entity.owner_id)
    .bind(&entity.path_type)
    .bind(entity.tier.to_string())
    .bind(i64::from(entity.level))
    .bind(i64::from(entity.progress_required_for_level))
    .bind(&created_at)
    .execute(&self.pool)
    .await?;

    Ok(entity.into_entity(result.last_insert_rowid()))
  }

  async fn update_entity(&self, entity: &TrackedEntity) -> EngineResult<TrackedEntity> {
    let mut conn = self.pool.acquire().await?;
    write_entity(&mut conn, entity).await?;
    Ok(entity.clone())
  }

  async fn delete_entity(&self, id: i64) -> EngineResult<()> {
    let entity = self.get_entity(id).await?;
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM task_log WHERE entity_id = ?")
      .bind(id)
      .execute(&mut *tx)
      .await?;
    sqlx::query("DELETE FROM daily_path_progress WHERE owner_id = ? AND path_id = ?")
      .bind(&entity.owner_id)
      .bind(&entity.path_type)
      .execute(&mut *tx)
      .await?;
    sqlx::query("DELETE FROM tracked_entities WHERE id = ?")
      .bind(id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(())
  }

  async fn commit_transition(&self, commit: TransitionCommit) -> EngineResult<TrackedEntity> {
    let mut tx = self.pool.begin().await?;

    write_entity(&mut tx, &commit.entity).await?;
    write_log(&mut tx, &commit.log).await?;
    if let Some(daily) = &commit.daily {
      write_daily(&mut tx, daily).await?;
    }
    if !commit.rewards.is_empty() {
      credit_profile(
        &mut tx,
        &commit.entity.owner_id,
        i64::from(commit.rewards.coins),
        i64::from(commit.rewards.stat_points),
      )
      .await?;
    }

    tx.commit().await?;
    Ok(commit.entity)
  }

  async fn get_quest(&self, id: i64) -> EngineResult<Quest> {
    let mut conn = self.pool.acquire().await?;
    fetch_quest(&mut conn, id).await
  }

  async fn get_quests_for_owner(&self, owner_id: &str) -> EngineResult<Vec<Quest>> {
    let rows = sqlx::query("SELECT * FROM quests WHERE owner_id = ? ORDER BY id")
      .bind(owner_id)
      .fetch_all(&self.pool)
      .await?;
    rows.iter().map(quest_from_row).collect()
  }

  async fn insert_quest(&self, quest: NewQuest) -> EngineResult<Quest> {
    let mut tx = self.pool.begin().await?;

    // Insert first for the id, then write the full row with generated subtask ids
    let result = sqlx::query(
      r#"
      INSERT INTO quests (owner_id, title, date, status, difficulty, base_difficulty)
      VALUES (?1, ?2, ?3, ?4, ?5, ?5)
      "#,
    )
    .bind(&quest.owner_id)
    .bind(&quest.title)
    .bind(format_date(quest.date))
    .bind(quest.status.to_string())
    .bind(quest.difficulty.unwrap_or_default().to_string())
    .execute(&mut *tx)
    .await?;

    let stored = quest.into_quest(result.last_insert_rowid());
    write_quest(&mut tx, &stored).await?;
    tx.commit().await?;
    Ok(stored)
  }

  async fn update_quest(&self, id: i64, patch: &QuestPatch) -> EngineResult<Quest> {
    let mut tx = self.pool.begin().await?;
    let mut quest = fetch_quest(&mut tx, id).await?;
    patch.apply_to(&mut quest);
    write_quest(&mut tx, &quest).await?;
    tx.commit().await?;
    Ok(quest)
  }

  async fn commit_quest_completion(
    &self,
    id: i64,
    patch: &QuestPatch,
    coins: i64,
  ) -> EngineResult<(Quest, Profile)> {
    let mut tx = self.pool.begin().await?;
    let mut quest = fetch_quest(&mut tx, id).await?;
    patch.apply_to(&mut quest);
    write_quest(&mut tx, &quest).await?;
    let profile = credit_profile(&mut tx, &quest.owner_id, coins, 0).await?;
    tx.commit().await?;
    Ok((quest, profile))
  }

  async fn get_daily_path_progress(
    &self,
    owner_id: &str,
    path_id: &str,
    date: NaiveDate,
  ) -> EngineResult<Option<DailyPathProgress>> {
    let row = sqlx::query(
      "SELECT * FROM daily_path_progress WHERE owner_id = ? AND path_id = ? AND date = ?",
    )
    .bind(owner_id)
    .bind(path_id)
    .bind(format_date(date))
    .fetch_optional(&self.pool)
    .await?;
    row.as_ref().map(daily_from_row).transpose()
  }

  async fn upsert_daily_path_progress(
    &self,
    record: &DailyPathProgress,
  ) -> EngineResult<DailyPathProgress> {
    let mut conn = self.pool.acquire().await?;
    write_daily(&mut conn, record).await?;
    Ok(record.clone())
  }

  async fn get_profile(&self, owner_id: &str) -> EngineResult<Profile> {
    let mut conn = self.pool.acquire().await?;
    fetch_profile(&mut conn, owner_id).await
  }

  async fn record_day_snapshot(&self, snapshot: &DaySnapshot) -> EngineResult<()> {
    let ids_json = serde_json::to_string(&snapshot.completed_quest_ids)?;
    sqlx::query(
      r#"
      INSERT INTO day_snapshots
        (owner_id, date, quests_total, quests_completed, completed_quest_ids_json)
      VALUES (?1, ?2, ?3, ?4, ?5)
      ON CONFLICT(owner_id, date) DO UPDATE SET
        quests_total = excluded.quests_total,
        quests_completed = excluded.quests_completed,
        completed_quest_ids_json = excluded.completed_quest_ids_json
      "#,
    )
    .bind(&snapshot.owner_id)
    .bind(format_date(snapshot.date))
    .bind(i64::from(snapshot.quests_total))
    .bind(i64::from(snapshot.quests_completed))
    .bind(ids_json)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn list_day_snapshots(&self, owner_id: &str) -> EngineResult<Vec<DaySnapshot>> {
    let rows = sqlx::query("SELECT * FROM day_snapshots WHERE owner_id = ? ORDER BY date")
      .bind(owner_id)
      .fetch_all(&self.pool)
      .await?;
    rows.iter().map(snapshot_from_row).collect()
  }

  async fn list_task_log(&self, entity_id: i64) -> EngineResult<Vec<TaskLogEntry>> {
    let rows = sqlx::query("SELECT * FROM task_log WHERE entity_id = ? ORDER BY id")
      .bind(entity_id)
      .fetch_all(&self.pool)
      .await?;
    rows.iter().map(log_from_row).collect()
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
