//! Tier ordering
//!
//! Total order over rank labels, lowest to highest:
//! `D < D+ < C < C+ < B < B+ < A < A+ < S < S+ < SS < SS+ < SSS`.
//! Successor and predecessor lookups saturate at the ends.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Tier {
    #[default]
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "S")]
    S,
    #[serde(rename = "S+")]
    SPlus,
    #[serde(rename = "SS")]
    SS,
    #[serde(rename = "SS+")]
    SSPlus,
    #[serde(rename = "SSS")]
    SSS,
}

impl Tier {
    /// Every tier in ascending order
    pub const ALL: [Tier; 13] = [
        Tier::D,
        Tier::DPlus,
        Tier::C,
        Tier::CPlus,
        Tier::B,
        Tier::BPlus,
        Tier::A,
        Tier::APlus,
        Tier::S,
        Tier::SPlus,
        Tier::SS,
        Tier::SSPlus,
        Tier::SSS,
    ];

    /// The unsuffixed rungs, used as the default evolution ladder
    pub const MAJOR: [Tier; 7] = [
        Tier::D,
        Tier::C,
        Tier::B,
        Tier::A,
        Tier::S,
        Tier::SS,
        Tier::SSS,
    ];

    pub const MAX: Tier = Tier::SSS;

    /// Integer score used for comparisons (D = 0, SSS = 12)
    pub fn score(self) -> i32 {
        self as i32
    }

    pub fn from_score(score: i32) -> Option<Self> {
        usize::try_from(score).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Next tier up; stays put at SSS
    pub fn next(self) -> Self {
        Self::from_score(self.score() + 1).unwrap_or(Self::MAX)
    }

    /// Previous tier; stays put at D
    pub fn prev(self) -> Self {
        Self::from_score(self.score() - 1).unwrap_or(Tier::D)
    }

    pub fn is_max(self) -> bool {
        self == Self::MAX
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::D => "D",
            Tier::DPlus => "D+",
            Tier::C => "C",
            Tier::CPlus => "C+",
            Tier::B => "B",
            Tier::BPlus => "B+",
            Tier::A => "A",
            Tier::APlus => "A+",
            Tier::S => "S",
            Tier::SPlus => "S+",
            Tier::SS => "SS",
            Tier::SSPlus => "SS+",
            Tier::SSS => "SSS",
        }
    }

    /// Days per level when a path has no level config for the current level
    pub fn default_days_required(self) -> u32 {
        match self {
            Tier::D | Tier::DPlus => 3,
            Tier::C | Tier::CPlus => 4,
            Tier::B | Tier::BPlus => 5,
            Tier::A | Tier::APlus => 6,
            Tier::S | Tier::SPlus => 7,
            Tier::SS | Tier::SSPlus => 8,
            Tier::SSS => 10,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown tier: {}", s))
    }
}

/// Next rung on an evolution ladder strictly above `current`.
///
/// Saturates at the ladder's top. An empty ladder falls back to the full
/// tier order.
pub fn next_on_ladder(ladder: &[Tier], current: Tier) -> Tier {
    if ladder.is_empty() {
        return current.next();
    }
    ladder
        .iter()
        .copied()
        .filter(|t| *t > current)
        .min()
        .unwrap_or_else(|| ladder.iter().copied().max().unwrap_or(current).max(current))
}
