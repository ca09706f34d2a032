pub mod daily;
pub mod entity;
pub mod profile;
pub mod quest;

pub use daily::{DailyPathProgress, DayStatus, DaySnapshot};
pub use entity::{NewEntity, TrackedEntity};
pub use profile::{Profile, TaskLogEntry};
pub use quest::{Difficulty, NewQuest, Quest, QuestPatch, QuestStatus, Subtask};
