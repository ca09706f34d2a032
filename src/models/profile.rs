use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completion::CompletionAction;
use crate::tier::Tier;

/// Owner-level currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub owner_id: String,
  pub coins: i64,
  pub stat_points: i64,
}

impl Profile {
  pub fn empty(owner_id: &str) -> Self {
    Self {
      owner_id: owner_id.to_string(),
      coins: 0,
      stat_points: 0,
    }
  }
}

/// History row for an accepted complete/reverse transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLogEntry {
  pub entity_id: i64,
  pub action: CompletionAction,
  pub logged_at: DateTime<Utc>,
  pub level_after: u32,
  pub tier_after: Tier,
  pub progress_after: u32,
}
