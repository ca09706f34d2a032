//! Quest escalation and daily rollover
//!
//! Escalation maps consecutive missed days onto a harder difficulty (and so
//! a bigger reward). Rollover runs when "today" has moved past a quest's
//! date: stale open quests follow the user into today, recurring quests
//! restart their cycle, and each closed-out day is snapshotted for history.
//!
//! Planning is pure. The engine applies the plan through the storage port.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{DaySnapshot, Difficulty, Quest, QuestPatch, QuestStatus, Subtask};

pub const DIFFICULT_AFTER_DAYS: u32 = 3;
pub const HARD_AFTER_DAYS: u32 = 10;
pub const HELL_AFTER_DAYS: u32 = 20;

// ---------------------------------------------------------------------------
/// Escalation
// ---------------------------------------------------------------------------

/// Difficulty after `days_not_completed` missed days. Never lower than
/// `current` (unset counts as Easy).
pub fn escalate(current: Option<Difficulty>, days_not_completed: u32) -> Difficulty {
    let floor = current.unwrap_or_default();
    let threshold = match days_not_completed {
        d if d >= HELL_AFTER_DAYS => Some(Difficulty::Hell),
        d if d >= HARD_AFTER_DAYS => Some(Difficulty::Hard),
        d if d >= DIFFICULT_AFTER_DAYS => Some(Difficulty::Difficult),
        _ => None,
    };
    threshold.map_or(floor, |t| t.max(floor))
}

// ---------------------------------------------------------------------------
/// Rollover plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestUpdate {
    pub quest_id: i64,
    pub patch: QuestPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverPlan {
    pub owner_id: String,
    pub today: NaiveDate,
    pub updates: Vec<QuestUpdate>,
    pub snapshots: Vec<DaySnapshot>,
    /// Open one-off quests carried into today
    pub carried: u32,
    /// Recurring quests restarted
    pub recurring_reset: u32,
}

impl RolloverPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.snapshots.is_empty()
    }
}

/// Plan the rollover of `quests` into `today`.
///
/// Only quests dated strictly before `today` are moved, and only days missing
/// from `recorded_days` get a snapshot, so planning again after the plan was
/// applied and its snapshots stored yields an empty plan.
pub fn plan_rollover(
    owner_id: &str,
    quests: &[Quest],
    recorded_days: &BTreeSet<NaiveDate>,
    today: NaiveDate,
) -> RolloverPlan {
    let mut plan = RolloverPlan {
        owner_id: owner_id.to_string(),
        today,
        updates: Vec::new(),
        snapshots: Vec::new(),
        carried: 0,
        recurring_reset: 0,
    };
    let mut stale_days = BTreeSet::new();

    for quest in quests.iter().filter(|q| q.date < today) {
        if quest.status != QuestStatus::Backlog {
            stale_days.insert(quest.date);
        }

        let patch = if quest.is_recurring {
            plan.recurring_reset += 1;
            restart_recurring(quest, today)
        } else if quest.is_completed() {
            // Stays on its completion date
            continue;
        } else {
            plan.carried += 1;
            carry_forward(quest, today)
        };

        plan.updates.push(QuestUpdate {
            quest_id: quest.id,
            patch,
        });
    }

    plan.snapshots = stale_days
        .into_iter()
        .filter(|day| !recorded_days.contains(day))
        .map(|day| snapshot_day(owner_id, quests, day))
        .collect();

    plan
}

fn carry_forward(quest: &Quest, today: NaiveDate) -> QuestPatch {
    let days = quest.days_not_completed + 1;
    QuestPatch {
        date: Some(today),
        status: Some(QuestStatus::Today),
        difficulty: Some(escalate(Some(quest.difficulty), days)),
        days_not_completed: Some(days),
        ..Default::default()
    }
}

fn restart_recurring(quest: &Quest, today: NaiveDate) -> QuestPatch {
    // A completed cycle resets the miss counter and banked difficulty
    let (start, days) = if quest.is_completed() || quest.completed_at.is_some() {
        (quest.base_difficulty, 0)
    } else {
        (quest.difficulty, quest.days_not_completed + 1)
    };

    QuestPatch {
        date: Some(today),
        status: Some(QuestStatus::Today),
        difficulty: Some(escalate(Some(start), days)),
        days_not_completed: Some(days),
        subtasks: Some(
            quest
                .subtasks
                .iter()
                .map(|s| Subtask {
                    completed: false,
                    ..s.clone()
                })
                .collect(),
        ),
        completed_at: Some(None),
    }
}

fn snapshot_day(owner_id: &str, quests: &[Quest], day: NaiveDate) -> DaySnapshot {
    let on_day: Vec<&Quest> = quests
        .iter()
        .filter(|q| q.date == day && q.status != QuestStatus::Backlog)
        .collect();
    let completed_quest_ids: Vec<i64> = on_day
        .iter()
        .filter(|q| q.is_completed())
        .map(|q| q.id)
        .collect();

    DaySnapshot {
        owner_id: owner_id.to_string(),
        date: day,
        quests_total: on_day.len() as u32,
        quests_completed: completed_quest_ids.len() as u32,
        completed_quest_ids,
    }
}

/// Apply a plan to quests held in memory
pub fn apply_plan(quests: &mut [Quest], plan: &RolloverPlan) {
    for update in &plan.updates {
        if let Some(quest) = quests.iter_mut().find(|q| q.id == update.quest_id) {
            update.patch.apply_to(quest);
        }
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
