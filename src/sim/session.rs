/// Session: the complete mutable state of one game attempt.
///
/// Mutated only by `GameEngine`. Presentation code reads it through
/// `GameSnapshot`, a plain copy with target identities stripped.

use crate::domain::difficulty::{Difficulty, DifficultyParams};
use crate::domain::grid::{Grid, GRID_COLS, GRID_ROWS};
use crate::domain::target::TargetKind;

/// Length of a game.
pub const SESSION_SECONDS: u32 = 60;

/// At or below this many seconds the clock shows a warning.
pub const LOW_TIME_SECONDS: u32 = 10;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameStatus {
    Ready,
    Playing,
    Paused,
    Ended,
}

impl GameStatus {
    /// Ready and Ended are idle: difficulty may change only here.
    pub fn is_idle(self) -> bool {
        matches!(self, GameStatus::Ready | GameStatus::Ended)
    }

    pub fn label(self) -> &'static str {
        match self {
            GameStatus::Ready => "ready",
            GameStatus::Playing => "playing",
            GameStatus::Paused => "paused",
            GameStatus::Ended => "ended",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    pub status: GameStatus,
    pub score: u32,
    pub time_remaining_secs: u32,
    pub grid: Grid,
    pub difficulty: Difficulty,
    pub high_score: u32,
}

impl Session {
    pub fn new(difficulty: Difficulty, high_score: u32) -> Self {
        Session {
            status: GameStatus::Ready,
            score: 0,
            time_remaining_secs: SESSION_SECONDS,
            grid: Grid::new(),
            difficulty,
            high_score,
        }
    }

    /// Back to Ready with score, clock and grid at their defaults.
    /// Difficulty and high score survive.
    pub fn reset(&mut self) {
        self.status = GameStatus::Ready;
        self.score = 0;
        self.time_remaining_secs = SESSION_SECONDS;
        self.grid.clear();
    }

    pub fn params(&self) -> DifficultyParams {
        self.difficulty.params()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            status: self.status,
            score: self.score,
            time_remaining_secs: self.time_remaining_secs,
            grid: self.grid.kinds(),
            difficulty: self.difficulty,
            high_score: self.high_score,
        }
    }
}

/// Read-only view handed to presentation layers.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GameSnapshot {
    pub status: GameStatus,
    pub score: u32,
    pub time_remaining_secs: u32,
    pub grid: [[Option<TargetKind>; GRID_COLS]; GRID_ROWS],
    pub difficulty: Difficulty,
    pub high_score: u32,
}

impl GameSnapshot {
    pub fn is_low_time(&self) -> bool {
        self.status == GameStatus::Playing && self.time_remaining_secs <= LOW_TIME_SECONDS
    }

    /// Remaining time as `MM:SS`.
    pub fn clock(&self) -> String {
        format_clock(self.time_remaining_secs)
    }

    /// Remaining share of the session in [0, 1], for progress bars.
    pub fn time_fraction(&self) -> f32 {
        (self.time_remaining_secs as f32 / SESSION_SECONDS as f32).clamp(0.0, 1.0)
    }
}

pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
