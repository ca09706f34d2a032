//! In-process key-value store
//!
//! Fallback when no database is configured, and the fixture store for
//! engine tests. `set_fail_writes(true)` makes every write fail with a
//! persistence error without touching state.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{ProgressStore, TransitionCommit};
use crate::error::{EngineError, EngineResult};
use crate::models::{
  DailyPathProgress, DaySnapshot, NewEntity, NewQuest, Profile, Quest, QuestPatch, TaskLogEntry,
  TrackedEntity,
};

#[derive(Debug, Default)]
struct MemoryState {
  next_entity_id: i64,
  next_quest_id: i64,
  entities: BTreeMap<i64, TrackedEntity>,
  quests: BTreeMap<i64, Quest>,
  daily: HashMap<(String, String, NaiveDate), DailyPathProgress>,
  profiles: HashMap<String, Profile>,
  snapshots: BTreeMap<(String, NaiveDate), DaySnapshot>,
  task_log: Vec<TaskLogEntry>,
}

impl MemoryState {
  fn credit(&mut self, owner_id: &str, coins: i64, stat_points: i64) -> Profile {
    let profile = self
      .profiles
      .entry(owner_id.to_string())
      .or_insert_with(|| Profile::empty(owner_id));
    profile.coins += coins;
    profile.stat_points += stat_points;
    profile.clone()
  }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  state: Mutex<MemoryState>,
  fail_writes: AtomicBool,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reject every subsequent write until switched off again
  pub fn set_fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }

  fn lock(&self) -> EngineResult<MutexGuard<'_, MemoryState>> {
    self
      .state
      .lock()
      .map_err(|_| EngineError::Persistence("memory store lock poisoned".into()))
  }

  /// Lock for a write, failing first if writes are switched off
  fn lock_for_write(&self) -> EngineResult<MutexGuard<'_, MemoryState>> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(EngineError::Persistence("write rejected by store".into()));
    }
    self.lock()
  }
}

#[async_trait]
impl ProgressStore for MemoryStore {
  async fn get_entity(&self, id: i64) -> EngineResult<TrackedEntity> {
    self
      .lock()?
      .entities
      .get(&id)
      .cloned()
      .ok_or_else(|| EngineError::not_found("entity", id))
  }

  async fn list_entities(&self, owner_id: &str) -> EngineResult<Vec<TrackedEntity>> {
    Ok(
      self
        .lock()?
        .entities
        .values()
        .filter(|e| e.owner_id == owner_id)
        .cloned()
        .collect(),
    )
  }

  async fn insert_entity(&self, entity: NewEntity) -> EngineResult<TrackedEntity> {
    let mut state = self.lock_for_write()?;
    let duplicate = state
      .entities
      .values()
      .any(|e| e.owner_id == entity.owner_id && e.path_type == entity.path_type);
    if duplicate {
      return Err(EngineError::Persistence(format!(
        "entity for {} already stored",
        entity.path_type
      )));
    }

    state.next_entity_id += 1;
    let stored = entity.into_entity(state.next_entity_id);
    state.entities.insert(stored.id, stored.clone());
    Ok(stored)
  }

  async fn update_entity(&self, entity: &TrackedEntity) -> EngineResult<TrackedEntity> {
    let mut state = self.lock_for_write()?;
    if !state.entities.contains_key(&entity.id) {
      return Err(EngineError::not_found("entity", entity.id));
    }
    state.entities.insert(entity.id, entity.clone());
    Ok(entity.clone())
  }

  async fn delete_entity(&self, id: i64) -> EngineResult<()> {
    let mut state = self.lock_for_write()?;
    let entity = state
      .entities
      .remove(&id)
      .ok_or_else(|| EngineError::not_found("entity", id))?;
    state.task_log.retain(|l| l.entity_id != id);
    state
      .daily
      .retain(|(owner, path, _), _| !(owner == &entity.owner_id && path == &entity.path_type));
    Ok(())
  }

  async fn commit_transition(&self, commit: TransitionCommit) -> EngineResult<TrackedEntity> {
    let mut state = self.lock_for_write()?;
    if !state.entities.contains_key(&commit.entity.id) {
      return Err(EngineError::not_found("entity", commit.entity.id));
    }

    let entity = commit.entity;
    if !commit.rewards.is_empty() {
      state.credit(
        &entity.owner_id,
        i64::from(commit.rewards.coins),
        i64::from(commit.rewards.stat_points),
      );
    }
    if let Some(daily) = commit.daily {
      state.daily.insert(
        (daily.owner_id.clone(), daily.path_id.clone(), daily.date),
        daily,
      );
    }
    state.task_log.push(commit.log);
    state.entities.insert(entity.id, entity.clone());
    Ok(entity)
  }

  async fn get_quest(&self, id: i64) -> EngineResult<Quest> {
    self
      .lock()?
      .quests
      .get(&id)
      .cloned()
      .ok_or_else(|| EngineError::not_found("quest", id))
  }

  async fn get_quests_for_owner(&self, owner_id: &str) -> EngineResult<Vec<Quest>> {
    Ok(
      self
        .lock()?
        .quests
        .values()
        .filter(|q| q.owner_id == owner_id)
        .cloned()
        .collect(),
    )
  }

  async fn insert_quest(&self, quest: NewQuest) -> EngineResult<Quest> {
    let mut state = self.lock_for_write()?;
    state.next_quest_id += 1;
    let stored = quest.into_quest(state.next_quest_id);
    state.quests.insert(stored.id, stored.clone());
    Ok(stored)
  }

  async fn update_quest(&self, id: i64, patch: &QuestPatch) -> EngineResult<Quest> {
    let mut state = self.lock_for_write()?;
    let quest = state
      .quests
      .get_mut(&id)
      .ok_or_else(|| EngineError::not_found("quest", id))?;
    patch.apply_to(quest);
    Ok(quest.clone())
  }

  async fn commit_quest_completion(
    &self,
    id: i64,
    patch: &QuestPatch,
    coins: i64,
  ) -> EngineResult<(Quest, Profile)> {
    let mut state = self.lock_for_write()?;
    let quest = state
      .quests
      .get_mut(&id)
      .ok_or_else(|| EngineError::not_found("quest", id))?;
    patch.apply_to(quest);
    let quest = quest.clone();
    let profile = state.credit(&quest.owner_id, coins, 0);
    Ok((quest, profile))
  }

  async fn get_daily_path_progress(
    &self,
    owner_id: &str,
    path_id: &str,
    date: NaiveDate,
  ) -> EngineResult<Option<DailyPathProgress>> {
    Ok(
      self
        .lock()?
        .daily
        .get(&(owner_id.to_string(), path_id.to_string(), date))
        .cloned(),
    )
  }

  async fn upsert_daily_path_progress(
    &self,
    record: &DailyPathProgress,
  ) -> EngineResult<DailyPathProgress> {
    let mut state = self.lock_for_write()?;
    state.daily.insert(
      (record.owner_id.clone(), record.path_id.clone(), record.date),
      record.clone(),
    );
    Ok(record.clone())
  }

  async fn get_profile(&self, owner_id: &str) -> EngineResult<Profile> {
    Ok(
      self
        .lock()?
        .profiles
        .get(owner_id)
        .cloned()
        .unwrap_or_else(|| Profile::empty(owner_id)),
    )
  }

  async fn record_day_snapshot(&self, snapshot: &DaySnapshot) -> EngineResult<()> {
    let mut state = self.lock_for_write()?;
    state.snapshots.insert(
      (snapshot.owner_id.clone(), snapshot.date),
      snapshot.clone(),
    );
    Ok(())
  }

  async fn list_day_snapshots(&self, owner_id: &str) -> EngineResult<Vec<DaySnapshot>> {
    Ok(
      self
        .lock()?
        .snapshots
        .values()
        .filter(|s| s.owner_id == owner_id)
        .cloned()
        .collect(),
    )
  }

  async fn list_task_log(&self, entity_id: i64) -> EngineResult<Vec<TaskLogEntry>> {
    Ok(
      self
        .lock()?
        .task_log
        .iter()
        .filter(|l| l.entity_id == entity_id)
        .cloned()
        .collect(),
    )
  }
}
