/// The 3×3 board.
///
/// Cells hold at most one `Target`. Each target carries a `TargetId` that is
/// unique for the lifetime of the engine, so an expiry scheduled for one
/// target can never clear a later target that reused the same cell.
///
/// All mutations go through `place()` / `take()` / `clear_if()` / `clear()`.

use super::target::TargetKind;

pub const GRID_ROWS: usize = 3;
pub const GRID_COLS: usize = 3;
pub const GRID_CELLS: usize = GRID_ROWS * GRID_COLS;

/// Identity of one spawned target instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TargetId(pub u64);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Target {
    pub id: TargetId,
    pub kind: TargetKind,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(Target),
}

impl Cell {
    pub fn target(self) -> Option<Target> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(t) => Some(t),
        }
    }

    pub fn kind(self) -> Option<TargetKind> {
        self.target().map(|t| t.kind)
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Grid {
    cells: [[Cell; GRID_COLS]; GRID_ROWS],
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn in_bounds(row: usize, col: usize) -> bool {
        row < GRID_ROWS && col < GRID_COLS
    }

    /// Cell at (row, col). Out of bounds reads as Empty.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Cell {
        if Self::in_bounds(row, col) {
            self.cells[row][col]
        } else {
            Cell::Empty
        }
    }

    /// Put a target into an empty cell. Returns false (and writes nothing)
    /// if the cell is occupied or out of bounds.
    pub fn place(&mut self, row: usize, col: usize, target: Target) -> bool {
        if !Self::in_bounds(row, col) || !self.cells[row][col].is_empty() {
            return false;
        }
        self.cells[row][col] = Cell::Occupied(target);
        true
    }

    /// Remove and return whatever target is at (row, col).
    pub fn take(&mut self, row: usize, col: usize) -> Option<Target> {
        if !Self::in_bounds(row, col) {
            return None;
        }
        std::mem::take(&mut self.cells[row][col]).target()
    }

    /// Clear (row, col) only if it still holds the target with `id`.
    pub fn clear_if(&mut self, row: usize, col: usize, id: TargetId) -> bool {
        match self.get(row, col) {
            Cell::Occupied(t) if t.id == id => {
                self.cells[row][col] = Cell::Empty;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.cells = Default::default();
    }

    /// Coordinates of every empty cell, row-major.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(GRID_CELLS);
        for (r, row) in self.cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    out.push((r, c));
                }
            }
        }
        out
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| !c.is_empty()).count()
    }

    /// Presentation view: kinds only, identities stripped.
    pub fn kinds(&self) -> [[Option<TargetKind>; GRID_COLS]; GRID_ROWS] {
        self.cells.map(|row| row.map(Cell::kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(id: u64, kind: TargetKind) -> Target {
        Target { id: TargetId(id), kind }
    }

    #[test]
    fn new_grid_is_empty() {
        let g = Grid::new();
        assert_eq!(g.occupied_count(), 0);
        assert_eq!(g.empty_cells().len(), GRID_CELLS);
    }

    #[test]
    fn place_refuses_occupied_cell() {
        let mut g = Grid::new();
        assert!(g.place(1, 1, target(1, TargetKind::Normal)));
        assert!(!g.place(1, 1, target(2, TargetKind::Bomb)));
        assert_eq!(g.get(1, 1).target().unwrap().id, TargetId(1));
    }

    #[test]
    fn place_out_of_bounds_is_ignored() {
        let mut g = Grid::new();
        assert!(!g.place(3, 0, target(1, TargetKind::Normal)));
        assert_eq!(g.get(3, 0), Cell::Empty);
        assert_eq!(g.occupied_count(), 0);
    }

    #[test]
    fn take_empties_the_cell() {
        let mut g = Grid::new();
        g.place(0, 2, target(5, TargetKind::Special));
        assert_eq!(g.take(0, 2).map(|t| t.kind), Some(TargetKind::Special));
        assert!(g.get(0, 2).is_empty());
        assert_eq!(g.take(0, 2), None);
    }

    #[test]
    fn clear_if_checks_identity() {
        let mut g = Grid::new();
        g.place(2, 0, target(9, TargetKind::Normal));
        assert!(!g.clear_if(2, 0, TargetId(8)));
        assert!(!g.get(2, 0).is_empty());
        assert!(g.clear_if(2, 0, TargetId(9)));
        assert!(g.get(2, 0).is_empty());
    }

    #[test]
    fn kinds_view_matches_cells() {
        let mut g = Grid::new();
        g.place(0, 0, target(1, TargetKind::Bomb));
        let k = g.kinds();
        assert_eq!(k[0][0], Some(TargetKind::Bomb));
        assert_eq!(k[1][1], None);
    }
}
