/// Difficulty levels and the fixed timing parameters each one selects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseDifficultyError;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Timing triple driving the spawn scheduler.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DifficultyParams {
    pub spawn_interval_ms: u64,
    pub target_lifetime_ms: u64,
    pub max_concurrent_targets: usize,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn params(self) -> DifficultyParams {
        match self {
            Difficulty::Easy => DifficultyParams {
                spawn_interval_ms: 1500,
                target_lifetime_ms: 1200,
                max_concurrent_targets: 1,
            },
            Difficulty::Medium => DifficultyParams {
                spawn_interval_ms: 1200,
                target_lifetime_ms: 1000,
                max_concurrent_targets: 2,
            },
            Difficulty::Hard => DifficultyParams {
                spawn_interval_ms: 900,
                target_lifetime_ms: 800,
                max_concurrent_targets: 3,
            },
        }
    }

    /// Persistence key and display name.
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Cycle to the next level, wrapping (used by shoulder buttons).
    pub fn next(self) -> Difficulty {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }

    pub fn prev(self) -> Difficulty {
        match self {
            Difficulty::Easy => Difficulty::Hard,
            Difficulty::Medium => Difficulty::Easy,
            Difficulty::Hard => Difficulty::Medium,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}
