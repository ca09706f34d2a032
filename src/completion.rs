//! Daily completion state machine
//!
//! Per entity per calendar day:
//!
//! ```text
//! NotCompleted --Complete--> Completed
//! Completed    --Reverse---> NotCompleted   (same day only)
//! ```
//!
//! Transitions are computed on a copy; the caller persists the result.
//! Reversal only takes back the unit of progress. A level-up or evolution
//! produced by the completion being reversed stays in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::TrackedEntity;
use crate::progression::{advance, apply_decay, DecayOutcome, LevelOutcome, LevelState};
use crate::registry::PathLevelRegistry;

pub const ALREADY_COMPLETED: &str = "already completed today";
pub const STALE_REVERSE: &str = "cannot reverse task from previous days";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionAction {
    Complete,
    Reverse,
}

impl std::fmt::Display for CompletionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Reverse => write!(f, "reverse"),
        }
    }
}

impl std::str::FromStr for CompletionAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(Self::Complete),
            "reverse" => Ok(Self::Reverse),
            _ => Err(format!("Unknown completion action: {}", s)),
        }
    }
}

/// Accepted transition, ready to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub action: CompletionAction,
    pub entity: TrackedEntity,
    /// Decay applied before the new unit (Complete only)
    pub decay: Option<DecayOutcome>,
    /// Level computation (Complete only)
    pub level: Option<LevelOutcome>,
}

impl Transition {
    pub fn leveled_up(&self) -> bool {
        self.level.is_some_and(|l| l.leveled_up)
    }

    pub fn evolved(&self) -> bool {
        self.level.is_some_and(|l| l.evolved)
    }
}

/// Apply `action` to `entity` at `now`
pub fn transition(
    registry: &PathLevelRegistry,
    entity: &TrackedEntity,
    action: CompletionAction,
    now: DateTime<Utc>,
) -> EngineResult<Transition> {
    if !entity.is_active {
        return Err(EngineError::invalid(format!(
            "{} is inactive",
            entity.path_type
        )));
    }

    match action {
        CompletionAction::Complete => complete(registry, entity, now),
        CompletionAction::Reverse => reverse(entity, now),
    }
}

fn complete(
    registry: &PathLevelRegistry,
    entity: &TrackedEntity,
    now: DateTime<Utc>,
) -> EngineResult<Transition> {
    let today = now.date_naive();
    if entity.completed_on(today) {
        return Err(EngineError::invalid(ALREADY_COMPLETED));
    }

    let decay = apply_decay(entity.accumulated_progress, entity.last_updated, now);
    let level = advance(
        registry,
        &entity.path_type,
        LevelState {
            tier: entity.tier,
            level: entity.level,
            progress: decay.progress,
            required: entity.progress_required_for_level,
        },
        1,
    );

    // Day 0 covers re-completion after a same-day reverse
    let streak_days = match entity.days_since_update(today) {
        0 | 1 if entity.streak_days > 0 => entity.streak_days + 1,
        _ => 1,
    };

    let mut updated = entity.clone();
    updated.tier = level.tier;
    updated.level = level.level;
    updated.accumulated_progress = level.remainder;
    updated.progress_required_for_level = level.required;
    updated.completed_today = true;
    updated.last_updated = now;
    updated.streak_days = streak_days;

    Ok(Transition {
        action: CompletionAction::Complete,
        entity: updated,
        decay: Some(decay),
        level: Some(level),
    })
}

fn reverse(entity: &TrackedEntity, now: DateTime<Utc>) -> EngineResult<Transition> {
    if !entity.completed_on(now.date_naive()) {
        return Err(EngineError::invalid(STALE_REVERSE));
    }

    let mut updated = entity.clone();
    updated.accumulated_progress = entity.accumulated_progress.saturating_sub(1);
    updated.completed_today = false;
    updated.streak_days = entity.streak_days.saturating_sub(1);

    Ok(Transition {
        action: CompletionAction::Reverse,
        entity: updated,
        decay: None,
        level: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_entity;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 18, 0, 0).unwrap()
    }

    fn entity(last_updated: DateTime<Utc>) -> TrackedEntity {
        mock_entity("athlete", last_updated)
    }

    #[test]
    fn test_complete_adds_one_unit() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let t = transition(&registry, &entity(day(1)), CompletionAction::Complete, day(2)).unwrap();

        assert_eq!(t.entity.accumulated_progress, 1);
        assert!(t.entity.completed_today);
        assert_eq!(t.entity.last_updated, day(2));
        assert_eq!(t.entity.streak_days, 1);
        assert!(!t.leveled_up());
    }

    #[test]
    fn test_double_complete_rejected() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let first = transition(&registry, &entity(day(1)), CompletionAction::Complete, day(2)).unwrap();

        let second = transition(
            &registry,
            &first.entity,
            CompletionAction::Complete,
            day(2) + Duration::hours(2),
        );
        assert_eq!(second, Err(EngineError::invalid(ALREADY_COMPLETED)));
    }

    #[test]
    fn test_reverse_same_day() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let done = transition(&registry, &entity(day(1)), CompletionAction::Complete, day(2)).unwrap();
        let undone = transition(&registry, &done.entity, CompletionAction::Reverse, day(2)).unwrap();

        assert_eq!(undone.entity.accumulated_progress, 0);
        assert!(!undone.entity.completed_today);

        // Completing again the same day is allowed after a reverse
        let again = transition(&registry, &undone.entity, CompletionAction::Complete, day(2)).unwrap();
        assert_eq!(again.entity.accumulated_progress, 1);
    }

    #[test]
    fn test_reverse_previous_day_rejected() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let mut e = entity(day(1));
        e.completed_today = true;
        e.accumulated_progress = 2;

        let result = transition(&registry, &e, CompletionAction::Reverse, day(2));
        assert_eq!(result, Err(EngineError::invalid(STALE_REVERSE)));
    }

    #[test]
    fn test_reverse_without_completion_rejected() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let result = transition(&registry, &entity(day(2)), CompletionAction::Reverse, day(2));
        assert!(result.unwrap_err().is_invalid_transition());
    }

    #[test]
    fn test_reverse_keeps_level_up() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let mut e = entity(day(1));
        e.accumulated_progress = 2;

        let done = transition(&registry, &e, CompletionAction::Complete, day(2)).unwrap();
        assert!(done.leveled_up());
        assert_eq!(done.entity.level, 2);

        let undone = transition(&registry, &done.entity, CompletionAction::Reverse, day(2)).unwrap();
        assert_eq!(undone.entity.level, 2);
        assert_eq!(undone.entity.accumulated_progress, 0);
    }

    #[test]
    fn test_decay_applied_before_new_unit() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let mut e = entity(day(1));
        e.accumulated_progress = 2;
        e.streak_days = 4;

        let t = transition(&registry, &e, CompletionAction::Complete, day(5)).unwrap();
        let decay = t.decay.unwrap();
        assert_eq!(decay.days_elapsed, 4);
        assert_eq!(decay.decayed, 2);
        assert_eq!(t.entity.accumulated_progress, 1);
        // Gap breaks the streak
        assert_eq!(t.entity.streak_days, 1);
    }

    #[test]
    fn test_streak_grows_on_consecutive_days() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let d1 = transition(&registry, &entity(day(1)), CompletionAction::Complete, day(1)).unwrap();
        let d2 = transition(&registry, &d1.entity, CompletionAction::Complete, day(2)).unwrap();
        assert_eq!(d2.entity.streak_days, 2);
    }

    #[test]
    fn test_inactive_entity_rejected() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let mut e = entity(day(1));
        e.is_active = false;
        let result = transition(&registry, &e, CompletionAction::Complete, day(2));
        assert!(result.unwrap_err().is_invalid_transition());
    }

    #[test]
    fn test_three_day_scenario_levels_up() {
        let registry = PathLevelRegistry::with_builtin_paths();
        let mut e = entity(day(1) - Duration::days(1));

        let mut last = None;
        for d in 1..=3 {
            let t = transition(&registry, &e, CompletionAction::Complete, day(d)).unwrap();
            e = t.entity.clone();
            last = Some(t);
        }

        let last = last.unwrap();
        assert_eq!(e.level, 2);
        assert_eq!(e.accumulated_progress, 0);
        assert!(last.leveled_up());
        assert_eq!(e.streak_days, 3);
    }
}
