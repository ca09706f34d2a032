use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum DayStatus {
  #[default]
  NotStarted,
  InProgress,
  Completed,
}

impl std::fmt::Display for DayStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::NotStarted => write!(f, "not_started"),
      Self::InProgress => write!(f, "in_progress"),
      Self::Completed => write!(f, "completed"),
    }
  }
}

impl std::str::FromStr for DayStatus {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "not_started" => Ok(Self::NotStarted),
      "in_progress" => Ok(Self::InProgress),
      "completed" => Ok(Self::Completed),
      _ => Err(format!("Unknown day status: {}", s)),
    }
  }
}

/// Per-path task progress for one day. Upsert key: (owner_id, path_id, date)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPathProgress {
  pub owner_id: String,
  pub path_id: String,
  pub date: NaiveDate,
  pub tasks_total: u32,
  pub tasks_completed: u32,
  /// 0-100, rounded down
  pub percentage: u32,
  pub status: DayStatus,
  pub completed_task_ids: BTreeSet<String>,
  pub completed_subtask_ids: BTreeSet<String>,
}

impl DailyPathProgress {
  pub fn new(owner_id: &str, path_id: &str, date: NaiveDate, tasks_total: u32) -> Self {
    Self {
      owner_id: owner_id.to_string(),
      path_id: path_id.to_string(),
      date,
      tasks_total,
      tasks_completed: 0,
      percentage: 0,
      status: DayStatus::NotStarted,
      completed_task_ids: BTreeSet::new(),
      completed_subtask_ids: BTreeSet::new(),
    }
  }

  /// Flip a task's completion. Returns true if the task is now completed.
  pub fn toggle_task(&mut self, task_id: &str) -> bool {
    let now_done = if self.completed_task_ids.remove(task_id) {
      false
    } else {
      self.completed_task_ids.insert(task_id.to_string());
      true
    };
    self.recompute();
    now_done
  }

  /// Flip a subtask's completion. Subtasks do not count toward the day's total.
  pub fn toggle_subtask(&mut self, subtask_id: &str) -> bool {
    if self.completed_subtask_ids.remove(subtask_id) {
      false
    } else {
      self.completed_subtask_ids.insert(subtask_id.to_string());
      true
    }
  }

  pub fn is_complete(&self) -> bool {
    self.status == DayStatus::Completed
  }

  /// Refresh derived counters after the task set or total changed
  pub fn recompute(&mut self) {
    self.tasks_completed = self.completed_task_ids.len() as u32;
    self.percentage = if self.tasks_total == 0 {
      0
    } else {
      (self.tasks_completed.min(self.tasks_total) * 100) / self.tasks_total
    };
    self.status = if self.tasks_total > 0 && self.tasks_completed >= self.tasks_total {
      DayStatus::Completed
    } else if self.tasks_completed > 0 {
      DayStatus::InProgress
    } else {
      DayStatus::NotStarted
    };
  }
}

/// Closed-out day of quests, written by rollover. Upsert key: (owner_id, date)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySnapshot {
  pub owner_id: String,
  pub date: NaiveDate,
  pub quests_total: u32,
  pub quests_completed: u32,
  pub completed_quest_ids: Vec<i64>,
}
