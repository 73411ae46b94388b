/// Keyboard input tracker.
///
/// Every game action is one-shot, so only the transition from "not held"
/// to "held" counts.
///
/// When the renderer enabled crossterm's keyboard enhancement, Release
/// events mark the end of a hold and Repeat events never count, so a held
/// key hits once. Otherwise a key counts as released after `HOLD_TIMEOUT`
/// without events. That swallows the fast repeat stream but not always the
/// terminal's initial repeat delay, so a long hold can register twice.
///
/// Key map:
///   7 8 9 / 4 5 6 / 1 2 3   →  Hit cell (numeric keypad layout)
///   Arrows                  →  Move cursor
///   Space / Enter           →  Hit cursor cell
///   S  Start / resume    P  Pause    R  Restart
///   E / M / H               →  Difficulty
///   Q / Esc / Ctrl+C        →  Quit

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::Action;
use crate::domain::difficulty::Difficulty;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from released to held during the last drain, in order.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for modifier checks.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before advancing the engine.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        // Fallback for terminals without Release
        if !self.honor_release {
            let now = Instant::now();
            self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        }
    }

    fn record(&mut self, key: KeyEvent, at: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            KeyEventKind::Repeat if self.honor_release => {
                self.last_active.insert(key.code, at);
            }
            _ => {
                let was_held = self
                    .last_active
                    .get(&key.code)
                    .is_some_and(|t| at.duration_since(*t) < HOLD_TIMEOUT);
                self.last_active.insert(key.code, at);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// This frame's presses as actions, in arrival order.
    pub fn actions(&self) -> Vec<Action> {
        let mut out: Vec<Action> = self.fresh_presses.iter().filter_map(|&c| key_action(c)).collect();
        if self.ctrl_c_pressed() {
            out.push(Action::Quit);
        }
        out
    }
}

/// Keypad digit → (row, col). Top row is 7 8 9.
pub fn keypad_cell(c: char) -> Option<(usize, usize)> {
    let d = c.to_digit(10)?;
    if d == 0 {
        return None;
    }
    let i = (d - 1) as usize;
    Some((2 - i / 3, i % 3))
}

pub fn key_action(code: KeyCode) -> Option<Action> {
    let action = match code {
        KeyCode::Char(c) if c.is_ascii_digit() => {
            let (row, col) = keypad_cell(c)?;
            Action::Hit { row, col }
        }
        KeyCode::Up => Action::MoveCursor { d_row: -1, d_col: 0 },
        KeyCode::Down => Action::MoveCursor { d_row: 1, d_col: 0 },
        KeyCode::Left => Action::MoveCursor { d_row: 0, d_col: -1 },
        KeyCode::Right => Action::MoveCursor { d_row: 0, d_col: 1 },
        KeyCode::Enter | KeyCode::Char(' ') => Action::HitCursor,
        KeyCode::Esc => Action::Quit,
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            's' => Action::Start,
            'p' => Action::Pause,
            'r' => Action::Restart,
            'e' => Action::SetDifficulty(Difficulty::Easy),
            'm' => Action::SetDifficulty(Difficulty::Medium),
            'h' => Action::SetDifficulty(Difficulty::Hard),
            'q' => Action::Quit,
            _ => return None,
        },
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn keypad_layout() {
        assert_eq!(keypad_cell('7'), Some((0, 0)));
        assert_eq!(keypad_cell('9'), Some((0, 2)));
        assert_eq!(keypad_cell('5'), Some((1, 1)));
        assert_eq!(keypad_cell('1'), Some((2, 0)));
        assert_eq!(keypad_cell('3'), Some((2, 2)));
        assert_eq!(keypad_cell('0'), None);
    }

    #[test]
    fn control_keys_map() {
        assert_eq!(key_action(KeyCode::Char('S')), Some(Action::Start));
        assert_eq!(key_action(KeyCode::Char('p')), Some(Action::Pause));
        assert_eq!(key_action(KeyCode::Char('h')), Some(Action::SetDifficulty(Difficulty::Hard)));
        assert_eq!(key_action(KeyCode::Enter), Some(Action::HitCursor));
        assert_eq!(key_action(KeyCode::Char('0')), None);
        assert_eq!(key_action(KeyCode::Char('z')), None);
    }

    #[test]
    fn auto_repeat_is_one_press() {
        let mut input = InputState::new();
        let t = Instant::now();
        input.record(press(KeyCode::Char('5')), t);
        input.record(press(KeyCode::Char('5')), t + Duration::from_millis(30));
        assert_eq!(input.actions(), vec![Action::Hit { row: 1, col: 1 }]);
    }

    #[test]
    fn release_rearms_when_honored() {
        let mut input = InputState::new();
        input.honor_release = true;
        let t = Instant::now();
        input.record(press(KeyCode::Char('5')), t);
        let mut up = press(KeyCode::Char('5'));
        up.kind = KeyEventKind::Release;
        input.record(up, t);
        input.record(press(KeyCode::Char('5')), t);
        assert_eq!(input.actions().len(), 2);
    }

    #[test]
    fn long_hold_hits_once_with_release_events() {
        let mut input = InputState::new();
        input.honor_release = true;
        let t = Instant::now();
        input.record(press(KeyCode::Char('5')), t);
        for ms in [500, 533, 566] {
            let mut rep = press(KeyCode::Char('5'));
            rep.kind = KeyEventKind::Repeat;
            input.record(rep, t + Duration::from_millis(ms));
        }
        assert_eq!(input.actions(), vec![Action::Hit { row: 1, col: 1 }]);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut input = InputState::new();
        input.record(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(input.ctrl_c_pressed());
        assert!(input.actions().contains(&Action::Quit));
    }
}
