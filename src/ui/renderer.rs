/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws.
///
/// Composition is pure (snapshot in, FrameBuffer out) and separate from
/// terminal I/O, so screens can be checked without a terminal.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use super::Cursor;
use crate::domain::difficulty::Difficulty;
use crate::domain::grid::{GRID_COLS, GRID_ROWS};
use crate::domain::target::TargetKind;
use crate::sim::session::{GameSnapshot, GameStatus};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells.
    ///
    /// Using the same RGB for `Clear(ClearType::All)` and every cell's
    /// background keeps VTE inter-row gaps the same color as the cells.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg: Self::norm_bg(bg) }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    fn fill(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, Cell::from_char(' ', Color::White, bg));
            }
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Layout ──

const LEFT: usize = 2;
const TITLE_ROW: usize = 0;
const SCORE_ROW: usize = 1;
const TIME_ROW: usize = 2;
const BOARD_ROW: usize = 4;

/// Interior size of one board cell, borders excluded.
const CELL_W: usize = 9;
const CELL_H: usize = 3;
const BOARD_W: usize = GRID_COLS * (CELL_W + 1) + 1;
const BOARD_H: usize = GRID_ROWS * (CELL_H + 1) + 1;

const DIFF_ROW: usize = BOARD_ROW + BOARD_H + 1;
const STATUS_ROW: usize = DIFF_ROW + 1;
const HELP_ROW: usize = STATUS_ROW + 2;

const TIME_BAR_W: usize = 20;

const DIM: Color = Color::Rgb { r: 90, g: 90, b: 110 };
const GOLD: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const GREEN: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const RED: Color = Color::Rgb { r: 255, g: 60, b: 60 };
const CURSOR_BG: Color = Color::Rgb { r: 50, g: 60, b: 95 };
const PANEL_BG: Color = Color::Rgb { r: 40, g: 40, b: 40 };

/// Everything a frame shows besides the snapshot itself.
#[derive(Clone, Copy, Debug)]
pub struct View<'a> {
    pub snapshot: &'a GameSnapshot,
    pub cursor: Cursor,
    /// Set when the game that just ended beat the stored best.
    pub new_record: bool,
    /// Frame counter for blinking.
    pub anim_tick: u32,
}

fn target_glyph(kind: TargetKind) -> (&'static str, Color) {
    let color = if kind.is_hazard() {
        RED
    } else if kind == TargetKind::Special {
        GOLD
    } else {
        GREEN
    };
    let glyph = match kind {
        TargetKind::Normal => "( o )",
        TargetKind::Special => "<<*>>",
        TargetKind::Bomb => "[ X ]",
    };
    (glyph, color)
}

/// Number key that hits this cell (keypad layout, 7 at top-left).
fn keypad_digit(row: usize, col: usize) -> char {
    let d = (GRID_ROWS - 1 - row) * GRID_COLS + col + 1;
    char::from_digit(d as u32, 10).unwrap_or(' ')
}

fn border_char(row_line: usize, col_line: usize) -> char {
    let top = row_line == 0;
    let bottom = row_line == GRID_ROWS;
    let left = col_line == 0;
    let right = col_line == GRID_COLS;
    match (top, bottom, left, right) {
        (true, _, true, _) => '┌',
        (true, _, _, true) => '┐',
        (_, true, true, _) => '└',
        (_, true, _, true) => '┘',
        (true, _, _, _) => '┬',
        (_, true, _, _) => '┴',
        (_, _, true, _) => '├',
        (_, _, _, true) => '┤',
        _ => '┼',
    }
}

// ── Compose: build front buffer content ──

fn compose(fb: &mut FrameBuffer, v: &View) {
    let s = v.snapshot;
    compose_hud(fb, s);
    compose_board(fb, v);
    compose_footer(fb, s);
    match s.status {
        GameStatus::Paused => compose_pause_overlay(fb, v),
        GameStatus::Ended => compose_game_over(fb, v),
        GameStatus::Ready | GameStatus::Playing => {}
    }
}

fn compose_hud(fb: &mut FrameBuffer, s: &GameSnapshot) {
    fb.put_str(LEFT, TITLE_ROW, "GRID STRIKE", GOLD, Color::Reset);
    let status = format!("[{}]", s.status.label().to_uppercase());
    fb.put_str(LEFT + BOARD_W - status.chars().count(), TITLE_ROW, &status, DIM, Color::Reset);

    let score = format!("Score {:<6}", s.score);
    fb.put_str(LEFT, SCORE_ROW, &score, Color::White, Color::Reset);
    let best = format!("Best {}", s.high_score);
    fb.put_str(LEFT + 16, SCORE_ROW, &best, GOLD, Color::Reset);

    let low = s.is_low_time();
    let clock_color = if low { RED } else { Color::White };
    let clock = format!("Time {}", s.clock());
    fb.put_str(LEFT, TIME_ROW, &clock, clock_color, Color::Reset);

    let filled = (s.time_fraction() * TIME_BAR_W as f32).round() as usize;
    let bar: String = (0..TIME_BAR_W).map(|i| if i < filled { '█' } else { '░' }).collect();
    let bar_color = if low { RED } else { GREEN };
    fb.put_str(LEFT + 11, TIME_ROW, &bar, bar_color, Color::Reset);
}

fn compose_board(fb: &mut FrameBuffer, v: &View) {
    let s = v.snapshot;
    let line_color = if s.status == GameStatus::Playing { Color::White } else { DIM };

    // Grid lines
    for r in 0..=GRID_ROWS {
        let y = BOARD_ROW + r * (CELL_H + 1);
        for x in 0..BOARD_W {
            let ch = if x % (CELL_W + 1) == 0 { border_char(r, x / (CELL_W + 1)) } else { '─' };
            fb.set(LEFT + x, y, Cell::from_char(ch, line_color, Color::Reset));
        }
    }
    for c in 0..=GRID_COLS {
        let x = LEFT + c * (CELL_W + 1);
        for r in 0..GRID_ROWS {
            for dy in 1..=CELL_H {
                let y = BOARD_ROW + r * (CELL_H + 1) + dy;
                fb.set(x, y, Cell::from_char('│', line_color, Color::Reset));
            }
        }
    }

    // Cell interiors
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            let x = LEFT + col * (CELL_W + 1) + 1;
            let y = BOARD_ROW + row * (CELL_H + 1) + 1;
            let under_cursor = v.cursor.row == row && v.cursor.col == col;
            let bg = if under_cursor { CURSOR_BG } else { Color::Reset };
            fb.fill(x, y, CELL_W, CELL_H, bg);

            fb.set(x, y, Cell::from_char(keypad_digit(row, col), DIM, bg));

            if let Some(kind) = s.grid[row][col] {
                let (glyph, color) = target_glyph(kind);
                let color = if s.status == GameStatus::Playing { color } else { DIM };
                let gx = x + (CELL_W - glyph.chars().count()) / 2;
                fb.put_str(gx, y + CELL_H / 2, glyph, color, bg);
            }
        }
    }
}

fn compose_footer(fb: &mut FrameBuffer, s: &GameSnapshot) {
    fb.put_str(LEFT, DIFF_ROW, "Difficulty:", Color::White, Color::Reset);
    let mut x = LEFT + 12;
    let locked = !s.status.is_idle();
    for d in Difficulty::ALL {
        let label = format!(" {} ", d.name());
        let (fg, bg) = match (d == s.difficulty, locked) {
            (true, false) => (Color::Black, GOLD),
            (true, true) => (Color::White, PANEL_BG),
            (false, _) => (DIM, Color::Reset),
        };
        fb.put_str(x, DIFF_ROW, &label, fg, bg);
        x += label.chars().count() + 1;
    }

    let (hint, color) = match s.status {
        GameStatus::Ready => ("Press S to start", GREEN),
        GameStatus::Playing => ("Hit the targets! Avoid [ X ] bombs", Color::White),
        GameStatus::Paused => ("Paused: S resume, R restart", GOLD),
        GameStatus::Ended => ("Time's up: R to play again", RED),
    };
    fb.put_str(LEFT, STATUS_ROW, hint, color, Color::Reset);

    let help = "7-9/4-6/1-3 hit  Arrows+Space aim  S start  P pause  R restart  E/M/H level  Q quit";
    fb.put_str(LEFT, HELP_ROW, help, DIM, Color::Reset);
}

fn centered_panel(fb: &mut FrameBuffer, lines: &[(&str, Color)]) {
    let w = 25;
    let h = lines.len() + 2;
    let x = LEFT + (BOARD_W - w) / 2;
    let y = BOARD_ROW + (BOARD_H - h) / 2;
    fb.fill(x, y, w, h, PANEL_BG);
    for (i, (text, color)) in lines.iter().enumerate() {
        let tx = x + (w.saturating_sub(text.chars().count())) / 2;
        fb.put_str(tx, y + 1 + i, text, *color, PANEL_BG);
    }
}

fn compose_pause_overlay(fb: &mut FrameBuffer, v: &View) {
    let blink = (v.anim_tick / 30) % 2 == 0;
    let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
    centered_panel(fb, &[(label, GOLD), ("", Color::White), ("S  Resume", Color::White)]);
}

fn compose_game_over(fb: &mut FrameBuffer, v: &View) {
    let s = v.snapshot;
    let score = format!("Final Score: {}", s.score);
    let best = format!("Best: {}", s.high_score);
    let mut lines = vec![("TIME'S UP", RED), ("", Color::White), (score.as_str(), Color::White)];
    if v.new_record {
        let banner = if (v.anim_tick / 15) % 2 == 0 { "★ NEW RECORD! ★" } else { "  NEW RECORD!  " };
        lines.push((banner, GOLD));
    } else {
        lines.push((best.as_str(), GOLD));
    }
    lines.push(("", Color::White));
    lines.push(("R  Play again", GREEN));
    centered_panel(fb, &lines);
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_status: Option<GameStatus>,
    /// Terminal accepted REPORT_EVENT_TYPES and will send key releases.
    keyboard_enhanced: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_status: None,
            keyboard_enhanced: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.keyboard_enhanced = true;
        }

        Ok(())
    }

    /// Whether key Release events will arrive after `init`.
    pub fn reports_key_release(&self) -> bool {
        self.keyboard_enhanced
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
            self.keyboard_enhanced = false;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, view: &View) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.invalidate()?;
        }

        // Status change → clear for clean transition
        if self.last_status != Some(view.snapshot.status) {
            self.invalidate()?;
            self.last_status = Some(view.snapshot.status);
        }

        self.front.clear();
        compose(&mut self.front, view);

        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn invalidate(&mut self) -> io::Result<()> {
        self.back.cells.fill(Cell::INVALID);
        queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors, not ResetColor: the terminal default may
        // differ from BASE_BG and leave line artifacts.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}
