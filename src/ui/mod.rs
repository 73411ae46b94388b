/// Terminal front end: keyboard, gamepad, sound and screen.
///
/// Input devices translate raw presses into `Action`s; `apply_action`
/// maps those onto engine controls. Nothing here touches game state
/// except through `GameEngine`'s public operations.

pub mod gamepad;
pub mod input;
pub mod renderer;
pub mod sound;

use crate::domain::difficulty::Difficulty;
use crate::domain::grid::{GRID_COLS, GRID_ROWS};
use crate::sim::engine::{GameEngine, SelectOutcome};
use crate::sim::highscore::HighScoreStore;
use crate::sim::session::GameStatus;

/// One player intent, independent of the device it came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    /// Select a cell directly (number keys).
    Hit { row: usize, col: usize },
    /// Select the cell under the cursor.
    HitCursor,
    MoveCursor { d_row: i8, d_col: i8 },
    Start,
    Pause,
    /// Start when idle or paused, pause when playing.
    StartOrPause,
    Restart,
    SetDifficulty(Difficulty),
    NextDifficulty,
    PrevDifficulty,
    Quit,
}

/// Highlighted cell for arrow-key / D-pad play. Clamped to the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor { row: GRID_ROWS / 2, col: GRID_COLS / 2 }
    }
}

impl Cursor {
    pub fn shift(&mut self, d_row: i8, d_col: i8) {
        self.row = step(self.row, d_row, GRID_ROWS);
        self.col = step(self.col, d_col, GRID_COLS);
    }
}

fn step(v: usize, d: i8, len: usize) -> usize {
    let next = v as isize + d as isize;
    next.clamp(0, len as isize - 1) as usize
}

/// Result of applying one action, for the caller's bookkeeping.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Applied {
    Select(SelectOutcome),
    Quit,
    Other,
}

pub fn apply_action<S: HighScoreStore>(
    engine: &mut GameEngine<S>,
    cursor: &mut Cursor,
    action: Action,
) -> Applied {
    match action {
        Action::Hit { row, col } => {
            *cursor = Cursor { row, col };
            return Applied::Select(engine.select_cell(row, col));
        }
        Action::HitCursor => {
            return Applied::Select(engine.select_cell(cursor.row, cursor.col));
        }
        Action::MoveCursor { d_row, d_col } => cursor.shift(d_row, d_col),
        Action::Start => engine.start(),
        Action::Pause => engine.pause(),
        Action::StartOrPause => {
            if engine.status() == GameStatus::Playing {
                engine.pause();
            } else {
                engine.start();
            }
        }
        Action::Restart => engine.restart(),
        Action::SetDifficulty(d) => {
            engine.set_difficulty(d);
        }
        Action::NextDifficulty => {
            engine.set_difficulty(engine.difficulty().next());
        }
        Action::PrevDifficulty => {
            engine.set_difficulty(engine.difficulty().prev());
        }
        Action::Quit => return Applied::Quit,
    }
    Applied::Other
}
