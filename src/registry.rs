//! Path Level Registry
//!
//! Static lookup of `(path id, level) -> LevelConfig`. Paths contribute pure
//! data; the registry is an explicit object handed to the engine, populated
//! in a deterministic order by whoever builds it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tier::Tier;

/// Levels per tier in every shipped path
pub const DEFAULT_LEVELS_PER_TIER: u32 = 10;

// ---------------------------------------------------------------------------
/// Level configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub title: String,
    pub description: String,
    pub target_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub level: u32,
    /// Completed days needed to clear this level
    pub days_required: u32,
    pub reward_coins: u32,
    pub reward_stat_points: u32,
    pub xp_to_level_up: u32,
    pub trial: TrialConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub id: String,
    pub display_name: String,
    pub levels_per_tier: u32,
    /// Tiers visited by evolution, ascending
    pub tier_ladder: Vec<Tier>,
    pub levels: Vec<LevelConfig>,
}

impl PathConfig {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, levels: Vec<LevelConfig>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            levels_per_tier: DEFAULT_LEVELS_PER_TIER,
            tier_ladder: Tier::MAJOR.to_vec(),
            levels,
        }
    }

    pub fn with_tier_ladder(mut self, ladder: Vec<Tier>) -> Self {
        self.tier_ladder = ladder;
        self
    }

    pub fn with_levels_per_tier(mut self, levels_per_tier: u32) -> Self {
        self.levels_per_tier = levels_per_tier.max(1);
        self
    }

    pub fn level(&self, level: u32) -> Option<&LevelConfig> {
        self.levels.iter().find(|l| l.level == level)
    }
}

// ---------------------------------------------------------------------------
/// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct PathLevelRegistry {
    paths: HashMap<String, PathConfig>,
    /// Registration order, for listing
    order: Vec<String>,
}

impl PathLevelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the shipped path tables
    pub fn with_builtin_paths() -> Self {
        let mut registry = Self::new();
        for path in crate::paths::builtin_paths() {
            registry.register(path);
        }
        registry
    }

    /// Register a path. An existing path with the same id is replaced
    /// wholesale and returned; levels are never merged.
    pub fn register(&mut self, mut path: PathConfig) -> Option<PathConfig> {
        path.levels.sort_by_key(|l| l.level);
        path.tier_ladder.sort();
        path.tier_ladder.dedup();

        let id = path.id.clone();
        let replaced = self.paths.insert(id.clone(), path);
        if replaced.is_some() {
            tracing::warn!(path = %id, "path re-registered, previous levels replaced");
        } else {
            self.order.push(id);
        }
        replaced
    }

    pub fn path(&self, path_id: &str) -> Option<&PathConfig> {
        self.paths.get(path_id)
    }

    pub fn contains(&self, path_id: &str) -> bool {
        self.paths.contains_key(path_id)
    }

    /// Paths in registration order
    pub fn paths(&self) -> impl Iterator<Item = &PathConfig> {
        self.order.iter().filter_map(|id| self.paths.get(id))
    }

    pub fn level_config(&self, path_id: &str, level: u32) -> Option<&LevelConfig> {
        self.paths.get(path_id).and_then(|p| p.level(level))
    }

    /// Days required for `level`, falling back to the tier default when the
    /// path or level is unknown. Never below 1.
    pub fn required_for(&self, path_id: &str, tier: Tier, level: u32) -> u32 {
        match self.level_config(path_id, level) {
            Some(config) => config.days_required.max(1),
            None => {
                tracing::warn!(
                    path = path_id,
                    level,
                    tier = %tier,
                    "no level config, using tier default"
                );
                tier.default_days_required()
            }
        }
    }

    pub fn levels_per_tier(&self, path_id: &str) -> u32 {
        self.paths
            .get(path_id)
            .map(|p| p.levels_per_tier)
            .unwrap_or(DEFAULT_LEVELS_PER_TIER)
    }

    pub fn tier_ladder(&self, path_id: &str) -> &[Tier] {
        self.paths
            .get(path_id)
            .map(|p| p.tier_ladder.as_slice())
            .unwrap_or(&Tier::MAJOR[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(level: u32, days: u32) -> LevelConfig {
        LevelConfig {
            level,
            days_required: days,
            reward_coins: level * 10,
            reward_stat_points: 1,
            xp_to_level_up: days * 100,
            trial: TrialConfig {
                title: format!("Trial {}", level),
                description: String::new(),
                target_days: days,
            },
        }
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let mut registry = PathLevelRegistry::new();
        registry.register(PathConfig::new("runner", "Runner", vec![level(1, 3), level(2, 4)]));

        assert_eq!(registry.level_config("runner", 2).map(|l| l.days_required), Some(4));
        assert!(registry.level_config("runner", 3).is_none());
        assert!(registry.level_config("reader", 1).is_none());
    }

    #[test]
    fn test_reregister_overwrites() {
        let mut registry = PathLevelRegistry::new();
        registry.register(PathConfig::new("runner", "Runner", vec![level(1, 3), level(2, 4)]));
        let replaced = registry.register(PathConfig::new("runner", "Runner v2", vec![level(1, 9)]));

        assert_eq!(replaced.map(|p| p.levels.len()), Some(2));
        assert_eq!(registry.required_for("runner", Tier::D, 1), 9);
        // Level 2 is gone, not merged
        assert!(registry.level_config("runner", 2).is_none());
        assert_eq!(registry.paths().count(), 1);
    }

    #[test]
    fn test_required_falls_back_to_tier_default() {
        let registry = PathLevelRegistry::new();
        assert_eq!(registry.required_for("ghost", Tier::B, 4), Tier::B.default_days_required());
    }

    #[test]
    fn test_required_never_zero() {
        let mut registry = PathLevelRegistry::new();
        registry.register(PathConfig::new("lazy", "Lazy", vec![level(1, 0)]));
        assert_eq!(registry.required_for("lazy", Tier::D, 1), 1);
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = PathLevelRegistry::new();
        registry.register(PathConfig::new("b", "B", vec![]));
        registry.register(PathConfig::new("a", "A", vec![]));
        let ids: Vec<&str> = registry.paths().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_builtin_paths_have_full_tier() {
        let registry = PathLevelRegistry::with_builtin_paths();
        assert!(registry.paths().count() >= 3);
        for path in registry.paths() {
            assert_eq!(path.levels_per_tier, DEFAULT_LEVELS_PER_TIER);
            for lvl in 1..=path.levels_per_tier {
                assert!(path.level(lvl).is_some(), "{} missing level {}", path.id, lvl);
            }
        }
    }
}
