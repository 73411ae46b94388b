/// Events emitted by the engine.
/// The presentation layer consumes these for animation/sound.

use crate::domain::difficulty::Difficulty;
use crate::domain::target::TargetKind;
use super::session::GameStatus;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    StatusChanged { from: GameStatus, to: GameStatus },
    TargetSpawned { row: usize, col: usize, kind: TargetKind },
    TargetExpired { row: usize, col: usize, kind: TargetKind },
    TargetHit { row: usize, col: usize, kind: TargetKind, score: u32 },
    /// Selection while Playing on a cell that was already empty.
    MissedEmpty { row: usize, col: usize },
    Tick { remaining: u32 },
    GameEnded { score: u32, high_score: u32, new_record: bool },
    DifficultyChanged { difficulty: Difficulty, high_score: u32 },
}
