//! Level Progression Engine
//!
//! Converts earned progress into levels and tiers:
//! - progress accumulates toward the current level's requirement
//! - clearing the last level of a tier evolves to the next rung of the
//!   path's tier ladder and restarts at level 1
//! - the top tier saturates; evolution there still resets the level
//!
//! Decay models inactivity: after `DECAY_THRESHOLD_DAYS` without an update,
//! one unit is lost per elapsed day, never more than what is banked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::PathLevelRegistry;
use crate::tier::{next_on_ladder, Tier};

/// Days of inactivity before decay applies
pub const DECAY_THRESHOLD_DAYS: i64 = 3;

const SECONDS_PER_DAY: i64 = 86_400;

// ---------------------------------------------------------------------------
/// Level State: where an entity sits before a progress award
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelState {
    pub tier: Tier,
    pub level: u32,
    pub progress: u32,
    pub required: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRewards {
    pub coins: u32,
    pub stat_points: u32,
}

impl LevelRewards {
    pub fn is_empty(&self) -> bool {
        self.coins == 0 && self.stat_points == 0
    }
}

// ---------------------------------------------------------------------------
/// Level Outcome: result of one progress award
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelOutcome {
    pub level: u32,
    pub tier: Tier,
    /// Requirement of the level the entity ends on
    pub required: u32,
    /// Progress carried into that level
    pub remainder: u32,
    pub leveled_up: bool,
    pub evolved: bool,
    pub levels_gained: u32,
    pub evolutions: u32,
    /// Summed rewards of every level cleared
    pub rewards: LevelRewards,
}

/// Apply `earned` progress to `state`.
///
/// Loops so one large award can clear several levels and cross several tier
/// boundaries. Each pass removes at least one unit from the pool (requirements
/// never drop below 1), so the loop is bounded by the award size.
pub fn advance(
    registry: &PathLevelRegistry,
    path_id: &str,
    state: LevelState,
    earned: u32,
) -> LevelOutcome {
    let levels_per_tier = registry.levels_per_tier(path_id);
    let ladder = registry.tier_ladder(path_id);

    let mut remaining = state.progress.saturating_add(earned);
    let mut required = state.required.max(1);
    let mut level = state.level.max(1);
    let mut tier = state.tier;

    let mut outcome = LevelOutcome {
        level,
        tier,
        required,
        remainder: remaining,
        leveled_up: false,
        evolved: false,
        levels_gained: 0,
        evolutions: 0,
        rewards: LevelRewards::default(),
    };

    while remaining >= required {
        if let Some(config) = registry.level_config(path_id, level) {
            outcome.rewards.coins = outcome.rewards.coins.saturating_add(config.reward_coins);
            outcome.rewards.stat_points = outcome
                .rewards
                .stat_points
                .saturating_add(config.reward_stat_points);
        }

        remaining -= required;
        level += 1;
        outcome.leveled_up = true;
        outcome.levels_gained += 1;

        if level > levels_per_tier {
            let from = tier;
            level = 1;
            tier = next_on_ladder(ladder, tier);
            outcome.evolved = true;
            outcome.evolutions += 1;
            tracing::info!(path = path_id, from = %from, to = %tier, "tier evolution");
        }

        required = registry.required_for(path_id, tier, level);
    }

    outcome.level = level;
    outcome.tier = tier;
    outcome.required = required;
    outcome.remainder = remaining;
    outcome
}

// ---------------------------------------------------------------------------
/// Decay: inactivity penalty
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayOutcome {
    pub days_elapsed: i64,
    /// Units removed (reported to the user)
    pub decayed: u32,
    pub progress: u32,
}

/// Whole days since `last`, rounded up. Zero if `now` is not after `last`.
pub fn days_elapsed(last: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (now - last).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

/// Decay `progress` for the time since `last`. Below the threshold nothing
/// changes; at or above it `min(days, progress)` units are removed.
pub fn apply_decay(progress: u32, last: DateTime<Utc>, now: DateTime<Utc>) -> DecayOutcome {
    let days = days_elapsed(last, now);
    if days < DECAY_THRESHOLD_DAYS {
        return DecayOutcome {
            days_elapsed: days,
            decayed: 0,
            progress,
        };
    }

    let decayed = u32::try_from(days).unwrap_or(u32::MAX).min(progress);
    if decayed > 0 {
        tracing::debug!(days, decayed, "inactivity decay");
    }
    DecayOutcome {
        days_elapsed: days,
        decayed,
        progress: progress - decayed,
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{LevelConfig, PathConfig, TrialConfig};
    use chrono::{Duration, TimeZone};

    fn flat_registry(days: u32) -> PathLevelRegistry {
        let levels = (1..=10)
            .map(|level| LevelConfig {
                level,
                days_required: days,
                reward_coins: 5,
                reward_stat_points: 1,
                xp_to_level_up: days * 100,
                trial: TrialConfig {
                    title: format!("L{}", level),
                    description: String::new(),
                    target_days: days,
                },
            })
            .collect();
        let mut registry = PathLevelRegistry::new();
        registry.register(PathConfig::new("flat", "Flat", levels));
        registry
    }

    fn state(tier: Tier, level: u32, progress: u32, required: u32) -> LevelState {
        LevelState {
            tier,
            level,
            progress,
            required,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_multi_level_jump_keeps_remainder() {
        let registry = flat_registry(3);
        let out = advance(&registry, "flat", state(Tier::D, 1, 0, 3), 7);

        assert_eq!(out.level, 3);
        assert_eq!(out.remainder, 1);
        assert_eq!(out.tier, Tier::D);
        assert!(out.leveled_up);
        assert!(!out.evolved);
        assert_eq!(out.levels_gained, 2);
        assert_eq!(out.rewards.coins, 10);
    }

    #[test]
    fn test_no_level_up_below_requirement() {
        let registry = flat_registry(3);
        let out = advance(&registry, "flat", state(Tier::D, 4, 1, 3), 1);

        assert_eq!(out.level, 4);
        assert_eq!(out.remainder, 2);
        assert!(!out.leveled_up);
        assert!(out.rewards.is_empty());
    }

    #[test]
    fn test_evolution_at_tier_cap() {
        let registry = flat_registry(3);
        let out = advance(&registry, "flat", state(Tier::D, 10, 0, 3), 3);

        assert_eq!(out.level, 1);
        assert_eq!(out.tier, Tier::C);
        assert!(out.evolved);
        assert_eq!(out.remainder, 0);
    }

    #[test]
    fn test_saturates_at_max_tier() {
        let registry = flat_registry(3);
        let out = advance(&registry, "flat", state(Tier::SSS, 10, 2, 3), 1);

        assert_eq!(out.tier, Tier::SSS);
        assert_eq!(out.level, 1);
        assert!(out.evolved);
    }

    #[test]
    fn test_crosses_several_tiers_in_one_award() {
        let registry = flat_registry(1);
        // 10 to finish D, 10 more to finish C, 2 into B
        let out = advance(&registry, "flat", state(Tier::D, 1, 0, 1), 22);

        assert_eq!(out.tier, Tier::B);
        assert_eq!(out.level, 3);
        assert_eq!(out.evolutions, 2);
        assert_eq!(out.levels_gained, 22);
    }

    #[test]
    fn test_full_ladder_path_evolves_into_plus_tier() {
        let mut registry = flat_registry(1);
        let path = registry
            .path("flat")
            .cloned()
            .unwrap()
            .with_tier_ladder(Tier::ALL.to_vec());
        registry.register(path);

        let out = advance(&registry, "flat", state(Tier::D, 10, 0, 1), 1);
        assert_eq!(out.tier, Tier::DPlus);
    }

    #[test]
    fn test_short_tier_evolves_early() {
        let mut registry = flat_registry(1);
        let path = registry
            .path("flat")
            .cloned()
            .unwrap()
            .with_levels_per_tier(3);
        registry.register(path);

        let out = advance(&registry, "flat", state(Tier::D, 3, 0, 1), 1);
        assert_eq!((out.tier, out.level), (Tier::C, 1));
        assert!(out.evolved);
    }

    #[test]
    fn test_huge_rewards_saturate() {
        let mut registry = flat_registry(1);
        let mut path = registry.path("flat").cloned().unwrap();
        for level in &mut path.levels {
            level.reward_coins = u32::MAX;
            level.reward_stat_points = u32::MAX;
        }
        registry.register(path);

        let out = advance(&registry, "flat", state(Tier::D, 1, 0, 1), 30);
        assert_eq!(out.levels_gained, 30);
        assert_eq!(out.rewards.coins, u32::MAX);
        assert_eq!(out.rewards.stat_points, u32::MAX);
    }

    #[test]
    fn test_unknown_path_uses_tier_defaults() {
        let registry = PathLevelRegistry::new();
        let out = advance(&registry, "missing", state(Tier::D, 1, 0, 3), 3);

        assert_eq!(out.level, 2);
        assert_eq!(out.required, Tier::D.default_days_required());
        assert!(out.rewards.is_empty());
    }

    #[test]
    fn test_zero_requirement_is_clamped() {
        let registry = flat_registry(3);
        let out = advance(&registry, "flat", state(Tier::D, 1, 0, 0), 1);
        assert_eq!(out.level, 2);
        assert_eq!(out.remainder, 0);
    }

    #[test]
    fn test_days_elapsed_rounds_up() {
        assert_eq!(days_elapsed(at(1, 9), at(1, 9)), 0);
        assert_eq!(days_elapsed(at(1, 9), at(2, 9)), 1);
        assert_eq!(days_elapsed(at(1, 9), at(2, 10)), 2);
        assert_eq!(days_elapsed(at(5, 9), at(1, 9)), 0);
    }

    #[test]
    fn test_no_decay_below_threshold() {
        let last = at(1, 12);
        for days in 0..DECAY_THRESHOLD_DAYS {
            let out = apply_decay(5, last, last + Duration::days(days));
            assert_eq!(out.progress, 5);
            assert_eq!(out.decayed, 0);
        }
    }

    #[test]
    fn test_decay_is_min_of_days_and_progress() {
        let last = at(1, 12);

        let out = apply_decay(5, last, last + Duration::days(3));
        assert_eq!(out.decayed, 3);
        assert_eq!(out.progress, 2);

        let out = apply_decay(2, last, last + Duration::days(9));
        assert_eq!(out.decayed, 2);
        assert_eq!(out.progress, 0);

        let out = apply_decay(0, last, last + Duration::days(9));
        assert_eq!(out.decayed, 0);
        assert_eq!(out.progress, 0);
    }
}
