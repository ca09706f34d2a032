//! Progression Engine: the public API
//!
//! Every operation takes the current time explicitly; nothing reads the wall
//! clock. State changes are computed first and handed to the store in one
//! write, so a rejected write leaves nothing half-applied.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::completion::{transition, CompletionAction, Transition};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    DailyPathProgress, NewEntity, NewQuest, Profile, Quest, QuestPatch, QuestStatus, TaskLogEntry,
    TrackedEntity,
};
use crate::progression::LevelRewards;
use crate::quests::{plan_rollover, RolloverPlan};
use crate::registry::PathLevelRegistry;
use crate::store::{ProgressStore, TransitionCommit};
use crate::tier::Tier;

// ---------------------------------------------------------------------------
/// Requests and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRequest {
    pub entity_id: i64,
    pub action: CompletionAction,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressResult {
    pub entity: TrackedEntity,
    pub action: CompletionAction,
    pub leveled_up: bool,
    pub evolved: bool,
    /// Units lost to inactivity before this completion
    pub decayed: u32,
    pub rewards: LevelRewards,
    /// User-facing summary
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskToggle {
    pub owner_id: String,
    pub path_id: String,
    pub task_id: String,
    /// Tasks scheduled for the path today
    pub tasks_total: u32,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskToggleResult {
    pub progress: DailyPathProgress,
    /// Set when the toggle crossed the day's completion boundary
    pub completion: Option<ProgressResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestCompletion {
    pub quest: Quest,
    pub profile: Profile,
    pub reward_coins: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAdvance {
    pub rollover: RolloverPlan,
    /// Entities whose daily flags were cleared
    pub entities_reset: u32,
}

// ---------------------------------------------------------------------------
/// Engine
// ---------------------------------------------------------------------------

pub struct Engine<S: ProgressStore> {
    registry: PathLevelRegistry,
    store: S,
}

impl<S: ProgressStore> Engine<S> {
    pub fn new(registry: PathLevelRegistry, store: S) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &PathLevelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Start tracking a path for `owner_id`. One entity per path per owner.
    pub async fn create_entity(
        &self,
        owner_id: &str,
        path_type: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<TrackedEntity> {
        if !self.registry.contains(path_type) {
            return Err(EngineError::not_found("path", path_type));
        }

        let existing = self.store.list_entities(owner_id).await?;
        if existing.iter().any(|e| e.path_type == path_type) {
            return Err(EngineError::invalid(format!(
                "{} is already being tracked",
                path_type
            )));
        }

        let entity = self
            .store
            .insert_entity(NewEntity {
                owner_id: owner_id.to_string(),
                path_type: path_type.to_string(),
                tier: Tier::D,
                level: 1,
                progress_required_for_level: self.registry.required_for(path_type, Tier::D, 1),
                created_at: now,
            })
            .await?;

        tracing::info!(owner = owner_id, path = path_type, id = entity.id, "entity created");
        Ok(entity)
    }

    pub async fn delete_entity(&self, id: i64) -> EngineResult<()> {
        self.store.delete_entity(id).await?;
        tracing::info!(id, "entity deleted");
        Ok(())
    }

    pub async fn entities(&self, owner_id: &str) -> EngineResult<Vec<TrackedEntity>> {
        self.store.list_entities(owner_id).await
    }

    /// The owner's entity on `path_id`
    pub async fn entity_for_path(
        &self,
        owner_id: &str,
        path_id: &str,
    ) -> EngineResult<TrackedEntity> {
        self.store
            .list_entities(owner_id)
            .await?
            .into_iter()
            .find(|e| e.path_type == path_id)
            .ok_or_else(|| EngineError::not_found("entity", format!("{}/{}", owner_id, path_id)))
    }

    // -----------------------------------------------------------------------
    // Daily completion
    // -----------------------------------------------------------------------

    /// Run a complete/reverse transition on one entity
    pub async fn update_progress(&self, request: ProgressRequest) -> EngineResult<ProgressResult> {
        let entity = self.store.get_entity(request.entity_id).await?;
        let accepted = transition(&self.registry, &entity, request.action, request.now)?;
        self.commit(accepted, request.now, None).await
    }

    /// Toggle one of today's tasks for a path.
    ///
    /// Finishing the day's last task completes the entity for the day;
    /// un-toggling a task of a finished day reverses that completion.
    pub async fn toggle_task(&self, toggle: TaskToggle) -> EngineResult<TaskToggleResult> {
        let today = toggle.now.date_naive();
        let entity = self.entity_for_path(&toggle.owner_id, &toggle.path_id).await?;

        let mut progress = self
            .store
            .get_daily_path_progress(&toggle.owner_id, &toggle.path_id, today)
            .await?
            .unwrap_or_else(|| {
                DailyPathProgress::new(&toggle.owner_id, &toggle.path_id, today, toggle.tasks_total)
            });
        let was_complete = progress.is_complete();
        progress.tasks_total = toggle.tasks_total;
        progress.toggle_task(&toggle.task_id);

        // The entity may already have been completed or reversed directly
        let completed_today = entity.completed_on(today);
        let action = match (was_complete, progress.is_complete()) {
            (false, true) if !completed_today => Some(CompletionAction::Complete),
            (true, false) if completed_today => Some(CompletionAction::Reverse),
            _ => None,
        };

        let completion = match action {
            Some(action) => {
                let accepted = transition(&self.registry, &entity, action, toggle.now)?;
                Some(self.commit(accepted, toggle.now, Some(progress.clone())).await?)
            }
            None => {
                self.store.upsert_daily_path_progress(&progress).await?;
                None
            }
        };

        Ok(TaskToggleResult {
            progress,
            completion,
        })
    }

    /// Toggle a subtask on today's path progress. Never changes completion.
    pub async fn toggle_subtask_progress(
        &self,
        owner_id: &str,
        path_id: &str,
        subtask_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<DailyPathProgress> {
        let today = now.date_naive();
        let mut progress = match self
            .store
            .get_daily_path_progress(owner_id, path_id, today)
            .await?
        {
            Some(progress) => progress,
            None => {
                // First toggle of the day needs a tracked path to attach to
                let entity = self.entity_for_path(owner_id, path_id).await?;
                DailyPathProgress::new(&entity.owner_id, &entity.path_type, today, 0)
            }
        };
        progress.toggle_subtask(subtask_id);
        self.store.upsert_daily_path_progress(&progress).await
    }

    async fn commit(
        &self,
        accepted: Transition,
        now: DateTime<Utc>,
        daily: Option<DailyPathProgress>,
    ) -> EngineResult<ProgressResult> {
        let rewards = accepted.level.map(|l| l.rewards).unwrap_or_default();
        let decayed = accepted.decay.map(|d| d.decayed).unwrap_or(0);
        let log = TaskLogEntry {
            entity_id: accepted.entity.id,
            action: accepted.action,
            logged_at: now,
            level_after: accepted.entity.level,
            tier_after: accepted.entity.tier,
            progress_after: accepted.entity.accumulated_progress,
        };

        let entity = self
            .store
            .commit_transition(TransitionCommit {
                entity: accepted.entity.clone(),
                log,
                rewards,
                daily,
            })
            .await?;

        let message = describe(&accepted, decayed);
        tracing::info!(
            id = entity.id,
            action = %accepted.action,
            level = entity.level,
            tier = %entity.tier,
            progress = entity.accumulated_progress,
            "{}",
            message
        );

        Ok(ProgressResult {
            leveled_up: accepted.leveled_up(),
            evolved: accepted.evolved(),
            action: accepted.action,
            entity,
            decayed,
            rewards,
            message,
        })
    }

    // -----------------------------------------------------------------------
    // Quests
    // -----------------------------------------------------------------------

    pub async fn create_quest(&self, quest: NewQuest) -> EngineResult<Quest> {
        let quest = self.store.insert_quest(quest).await?;
        tracing::info!(id = quest.id, owner = %quest.owner_id, "quest created");
        Ok(quest)
    }

    pub async fn quests(&self, owner_id: &str) -> EngineResult<Vec<Quest>> {
        self.store.get_quests_for_owner(owner_id).await
    }

    /// Complete a quest and pay out its difficulty reward in one write
    pub async fn complete_quest(
        &self,
        quest_id: i64,
        now: DateTime<Utc>,
    ) -> EngineResult<QuestCompletion> {
        let quest = self.store.get_quest(quest_id).await?;
        if quest.is_completed() {
            return Err(EngineError::invalid("quest already completed"));
        }

        let reward_coins = quest.difficulty.reward_coins();
        let patch = QuestPatch {
            date: Some(now.date_naive()),
            status: Some(QuestStatus::Completed),
            completed_at: Some(Some(now)),
            ..Default::default()
        };
        let (quest, profile) = self
            .store
            .commit_quest_completion(quest_id, &patch, i64::from(reward_coins))
            .await?;

        tracing::info!(
            id = quest.id,
            difficulty = %quest.difficulty,
            reward_coins,
            coins = profile.coins,
            "quest completed"
        );
        Ok(QuestCompletion {
            quest,
            profile,
            reward_coins,
        })
    }

    pub async fn toggle_quest_subtask(&self, quest_id: i64, subtask_id: &str) -> EngineResult<Quest> {
        let quest = self.store.get_quest(quest_id).await?;
        let mut subtasks = quest.subtasks.clone();
        let subtask = subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| EngineError::not_found("subtask", subtask_id))?;
        subtask.completed = !subtask.completed;

        self.store
            .update_quest(
                quest_id,
                &QuestPatch {
                    subtasks: Some(subtasks),
                    ..Default::default()
                },
            )
            .await
    }

    // -----------------------------------------------------------------------
    // Day rollover
    // -----------------------------------------------------------------------

    /// Move `owner_id`'s quests into `new_date`.
    ///
    /// Snapshots are written before quests move, and a day already snapshotted
    /// is never rewritten. A failure part-way leaves some quests moved;
    /// running again for the same date finishes the rest.
    pub async fn batch_update_quests_for_new_day(
        &self,
        owner_id: &str,
        new_date: NaiveDate,
    ) -> EngineResult<RolloverPlan> {
        let quests = self.store.get_quests_for_owner(owner_id).await?;
        let recorded: BTreeSet<NaiveDate> = self
            .store
            .list_day_snapshots(owner_id)
            .await?
            .into_iter()
            .map(|s| s.date)
            .collect();
        let plan = plan_rollover(owner_id, &quests, &recorded, new_date);

        if plan.is_empty() {
            tracing::debug!(owner = owner_id, date = %new_date, "rollover: nothing to do");
            return Ok(plan);
        }

        for snapshot in &plan.snapshots {
            self.store.record_day_snapshot(snapshot).await?;
        }
        for update in &plan.updates {
            self.store.update_quest(update.quest_id, &update.patch).await?;
        }

        tracing::info!(
            owner = owner_id,
            date = %new_date,
            carried = plan.carried,
            recurring_reset = plan.recurring_reset,
            snapshots = plan.snapshots.len(),
            "rollover applied"
        );
        Ok(plan)
    }

    /// Full day-boundary pass: quest rollover plus clearing each entity's
    /// daily flag and breaking streaks that skipped a day.
    pub async fn advance_day(&self, owner_id: &str, today: NaiveDate) -> EngineResult<DayAdvance> {
        let rollover = self.batch_update_quests_for_new_day(owner_id, today).await?;

        let mut entities_reset = 0;
        for entity in self.store.list_entities(owner_id).await? {
            let days = entity.days_since_update(today);
            if days == 0 {
                continue;
            }

            let mut updated = entity.clone();
            updated.completed_today = false;
            if days > 1 {
                updated.streak_days = 0;
            }
            if updated != entity {
                self.store.update_entity(&updated).await?;
                entities_reset += 1;
            }
        }

        Ok(DayAdvance {
            rollover,
            entities_reset,
        })
    }
}

fn describe(accepted: &Transition, decayed: u32) -> String {
    let entity = &accepted.entity;
    let mut parts = Vec::new();

    if decayed > 0 {
        parts.push(format!("Lost {} progress to inactivity", decayed));
    }
    match accepted.action {
        CompletionAction::Complete => {
            if accepted.evolved() {
                parts.push(format!(
                    "Evolved! {} is now tier {} level {}",
                    entity.path_type, entity.tier, entity.level
                ));
            } else if accepted.leveled_up() {
                parts.push(format!(
                    "Level up! {} reached level {} ({})",
                    entity.path_type, entity.level, entity.tier
                ));
            } else {
                parts.push(format!(
                    "{} progress {}/{}",
                    entity.path_type,
                    entity.accumulated_progress,
                    entity.progress_required_for_level
                ));
            }
        }
        CompletionAction::Reverse => {
            parts.push(format!("Reversed today's completion for {}", entity.path_type));
        }
    }
    parts.join(". ")
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
