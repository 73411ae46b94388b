//! Grid Strike: a timed whack-a-target game on a 3×3 board.
//!
//! `sim::engine::GameEngine` owns all game state and timing; the host
//! feeds it player actions and elapsed time, then reads snapshots and
//! drained events. `ui` is the crossterm front end used by the binary.

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod sim;
pub mod ui;

pub use domain::difficulty::{Difficulty, DifficultyParams};
pub use domain::target::TargetKind;
pub use sim::engine::{GameEngine, SelectOutcome};
pub use sim::event::GameEvent;
pub use sim::highscore::{FileHighScoreStore, HighScoreStore, MemoryHighScoreStore};
pub use sim::session::{GameSnapshot, GameStatus};
