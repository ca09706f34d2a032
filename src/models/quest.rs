use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
  Today,
  Backlog,
  Completed,
}

impl std::fmt::Display for QuestStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Today => write!(f, "today"),
      Self::Backlog => write!(f, "backlog"),
      Self::Completed => write!(f, "completed"),
    }
  }
}

impl std::str::FromStr for QuestStatus {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "today" => Ok(Self::Today),
      "backlog" => Ok(Self::Backlog),
      "completed" => Ok(Self::Completed),
      _ => Err(format!("Unknown quest status: {}", s)),
    }
  }
}

/// Quest difficulty, ordered from easiest to hardest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Difficulty {
  #[default]
  Easy,
  Moderate,
  Difficult,
  Hard,
  Hell,
}

impl Difficulty {
  /// Fixed coin payout on completion
  pub fn reward_coins(self) -> u32 {
    match self {
      Difficulty::Easy => 10,
      Difficulty::Moderate => 20,
      Difficulty::Difficult => 30,
      Difficulty::Hard => 40,
      Difficulty::Hell => 50,
    }
  }
}

impl std::fmt::Display for Difficulty {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = match self {
      Difficulty::Easy => "Easy",
      Difficulty::Moderate => "Moderate",
      Difficulty::Difficult => "Difficult",
      Difficulty::Hard => "Hard",
      Difficulty::Hell => "Hell",
    };
    f.write_str(label)
  }
}

impl std::str::FromStr for Difficulty {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "easy" => Ok(Self::Easy),
      "moderate" => Ok(Self::Moderate),
      "difficult" => Ok(Self::Difficult),
      "hard" => Ok(Self::Hard),
      "hell" => Ok(Self::Hell),
      _ => Err(format!("Unknown difficulty: {}", s)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
  pub id: String,
  pub title: String,
  pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
  pub id: i64,
  pub owner_id: String,
  pub title: String,
  /// Day the quest is attached to
  pub date: NaiveDate,
  pub status: QuestStatus,
  pub difficulty: Difficulty,
  /// Difficulty chosen at creation; a recurring cycle resets back to it
  pub base_difficulty: Difficulty,
  pub days_not_completed: u32,
  pub is_recurring: bool,
  pub subtasks: Vec<Subtask>,
  pub completed_at: Option<DateTime<Utc>>,
}

impl Quest {
  pub fn is_completed(&self) -> bool {
    self.status == QuestStatus::Completed
  }
}

/// For inserting new quests (without id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuest {
  pub owner_id: String,
  pub title: String,
  pub date: NaiveDate,
  pub status: QuestStatus,
  pub difficulty: Option<Difficulty>,
  pub is_recurring: bool,
  pub subtasks: Vec<String>,
}

impl NewQuest {
  pub fn into_quest(self, id: i64) -> Quest {
    let difficulty = self.difficulty.unwrap_or_default();
    Quest {
      id,
      owner_id: self.owner_id,
      title: self.title,
      date: self.date,
      status: self.status,
      difficulty,
      base_difficulty: difficulty,
      days_not_completed: 0,
      is_recurring: self.is_recurring,
      subtasks: self
        .subtasks
        .into_iter()
        .enumerate()
        .map(|(i, title)| Subtask {
          id: format!("{}-{}", id, i + 1),
          title,
          completed: false,
        })
        .collect(),
      completed_at: None,
    }
  }
}

/// Partial update for a quest; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestPatch {
  pub date: Option<NaiveDate>,
  pub status: Option<QuestStatus>,
  pub difficulty: Option<Difficulty>,
  pub days_not_completed: Option<u32>,
  pub subtasks: Option<Vec<Subtask>>,
  /// `Some(None)` clears the completion timestamp
  pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl QuestPatch {
  pub fn is_empty(&self) -> bool {
    *self == Self::default()
  }

  pub fn apply_to(&self, quest: &mut Quest) {
    if let Some(date) = self.date {
      quest.date = date;
    }
    if let Some(status) = self.status {
      quest.status = status;
    }
    if let Some(difficulty) = self.difficulty {
      quest.difficulty = difficulty;
    }
    if let Some(days) = self.days_not_completed {
      quest.days_not_completed = days;
    }
    if let Some(subtasks) = &self.subtasks {
      quest.subtasks = subtasks.clone();
    }
    if let Some(completed_at) = self.completed_at {
      quest.completed_at = completed_at;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_quest(subtasks: Vec<&str>) -> NewQuest {
    NewQuest {
      owner_id: "u1".into(),
      title: "Clean desk".into(),
      date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
      status: QuestStatus::Today,
      difficulty: None,
      is_recurring: false,
      subtasks: subtasks.into_iter().map(String::from).collect(),
    }
  }

  #[test]
  fn test_reward_table() {
    assert_eq!(Difficulty::Easy.reward_coins(), 10);
    assert_eq!(Difficulty::Moderate.reward_coins(), 20);
    assert_eq!(Difficulty::Difficult.reward_coins(), 30);
    assert_eq!(Difficulty::Hard.reward_coins(), 40);
    assert_eq!(Difficulty::Hell.reward_coins(), 50);
  }

  #[test]
  fn test_new_quest_defaults_to_easy() {
    let quest = new_quest(vec!["a", "b"]).into_quest(7);
    assert_eq!(quest.difficulty, Difficulty::Easy);
    assert_eq!(quest.base_difficulty, Difficulty::Easy);
    assert_eq!(quest.subtasks.len(), 2);
    assert_eq!(quest.subtasks[1].id, "7-2");
    assert!(quest.subtasks.iter().all(|s| !s.completed));
  }

  #[test]
  fn test_patch_clears_completed_at() {
    let mut quest = new_quest(vec![]).into_quest(1);
    quest.completed_at = Some(Utc::now());

    let patch = QuestPatch {
      completed_at: Some(None),
      days_not_completed: Some(4),
      ..Default::default()
    };
    patch.apply_to(&mut quest);

    assert!(quest.completed_at.is_none());
    assert_eq!(quest.days_not_completed, 4);
    assert_eq!(quest.status, QuestStatus::Today);
    assert!(!patch.is_empty());
    assert!(QuestPatch::default().is_empty());
  }

  #[test]
  fn test_status_and_difficulty_parse() {
    assert_eq!("backlog".parse::<QuestStatus>().unwrap(), QuestStatus::Backlog);
    assert_eq!("Hell".parse::<Difficulty>().unwrap(), Difficulty::Hell);
    assert!("legendary".parse::<Difficulty>().is_err());
  }
}
