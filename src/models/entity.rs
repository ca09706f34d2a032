use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::tier::Tier;

/// One identity/path instance owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntity {
  pub id: i64,
  pub owner_id: String,
  pub path_type: String,
  pub tier: Tier,
  pub level: u32,
  /// Always below `progress_required_for_level` outside a level-up
  pub accumulated_progress: u32,
  pub progress_required_for_level: u32,
  pub completed_today: bool,
  pub last_updated: DateTime<Utc>,
  pub is_active: bool,
  /// Consecutive days with a completion
  pub streak_days: u32,
  pub created_at: DateTime<Utc>,
}

impl TrackedEntity {
  /// Whether the entity already holds a completion for `day`
  pub fn completed_on(&self, day: NaiveDate) -> bool {
    self.completed_today && self.last_updated.date_naive() == day
  }

  /// Calendar days between the last update and `day` (0 when same day or earlier)
  pub fn days_since_update(&self, day: NaiveDate) -> i64 {
    (day - self.last_updated.date_naive()).num_days().max(0)
  }
}

/// For inserting new entities (without id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntity {
  pub owner_id: String,
  pub path_type: String,
  pub tier: Tier,
  pub level: u32,
  pub progress_required_for_level: u32,
  pub created_at: DateTime<Utc>,
}

impl NewEntity {
  pub fn into_entity(self, id: i64) -> TrackedEntity {
    TrackedEntity {
      id,
      owner_id: self.owner_id,
      path_type: self.path_type,
      tier: self.tier,
      level: self.level,
      accumulated_progress: 0,
      progress_required_for_level: self.progress_required_for_level,
      completed_today: false,
      last_updated: self.created_at,
      is_active: true,
      streak_days: 0,
      created_at: self.created_at,
    }
  }
}
