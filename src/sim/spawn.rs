/// Spawn cycle: decides which empty cells receive new targets.
///
/// Steps, applied in one pass against the grid passed in:
///   1. Collect empty cells
///   2. Count = max(1, min(max_concurrent, empty))
///   3. For each: uniform empty cell without replacement, then kind by 70/20/10
///   4. Write the target into the grid
///
/// The lower bound of 1 means a cycle places a target whenever any cell is
/// free, even when `max_concurrent` targets are already showing.
/// Expiry scheduling is left to the caller.

use rand::Rng;

use crate::domain::grid::{Grid, Target, TargetId};
use crate::domain::target::TargetKind;

/// Hands out unique target identities.
#[derive(Clone, Debug, Default)]
pub struct TargetIdGen {
    next: u64,
}

impl TargetIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> TargetId {
        let id = TargetId(self.next);
        self.next += 1;
        id
    }
}

/// One target written by a spawn cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Placement {
    pub row: usize,
    pub col: usize,
    pub target: Target,
}

/// How many targets a cycle should try to place.
pub fn spawn_count(max_concurrent: usize, empty: usize) -> usize {
    max_concurrent.min(empty).max(1)
}

pub fn spawn_cycle<R: Rng + ?Sized>(
    grid: &mut Grid,
    max_concurrent: usize,
    ids: &mut TargetIdGen,
    rng: &mut R,
) -> Vec<Placement> {
    let mut empty = grid.empty_cells();
    let wanted = spawn_count(max_concurrent, empty.len());
    let mut placed = Vec::with_capacity(wanted);

    for _ in 0..wanted {
        if empty.is_empty() {
            break;
        }
        let (row, col) = empty.swap_remove(rng.gen_range(0..empty.len()));
        let target = Target { id: ids.next_id(), kind: TargetKind::draw(rng) };
        if grid.place(row, col, target) {
            placed.push(Placement { row, col, target });
        }
    }

    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::domain::grid::{GRID_CELLS, GRID_COLS};

    fn fill(grid: &mut Grid, ids: &mut TargetIdGen, n: usize) {
        for i in 0..n {
            let t = Target { id: ids.next_id(), kind: TargetKind::Normal };
            assert!(grid.place(i / GRID_COLS, i % GRID_COLS, t));
        }
    }

    #[test]
    fn count_formula() {
        assert_eq!(spawn_count(2, 9), 2);
        assert_eq!(spawn_count(3, 2), 2);
        assert_eq!(spawn_count(1, 9), 1);
        assert_eq!(spawn_count(0, 9), 1);
        assert_eq!(spawn_count(3, 0), 1);
    }

    #[test]
    fn empty_grid_gets_max_concurrent() {
        let mut rng = StdRng::seed_from_u64(1);
        for max in 1..=3 {
            let mut g = Grid::new();
            let mut ids = TargetIdGen::new();
            let placed = spawn_cycle(&mut g, max, &mut ids, &mut rng);
            assert_eq!(placed.len(), max);
            assert_eq!(g.occupied_count(), max);
        }
    }

    #[test]
    fn never_overwrites_occupied_cells() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut g = Grid::new();
        let mut ids = TargetIdGen::new();
        fill(&mut g, &mut ids, 7);
        let before = g.clone();

        let placed = spawn_cycle(&mut g, 3, &mut ids, &mut rng);
        assert_eq!(placed.len(), 2);
        assert_eq!(g.occupied_count(), GRID_CELLS);
        for p in &placed {
            assert!(before.get(p.row, p.col).is_empty());
        }
        for i in 0..7 {
            assert_eq!(g.get(i / GRID_COLS, i % GRID_COLS), before.get(i / GRID_COLS, i % GRID_COLS));
        }
    }

    #[test]
    fn full_grid_places_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut g = Grid::new();
        let mut ids = TargetIdGen::new();
        fill(&mut g, &mut ids, GRID_CELLS);
        assert!(spawn_cycle(&mut g, 3, &mut ids, &mut rng).is_empty());
    }

    #[test]
    fn spawns_even_when_cap_already_reached() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut g = Grid::new();
        let mut ids = TargetIdGen::new();
        fill(&mut g, &mut ids, 1);
        let placed = spawn_cycle(&mut g, 1, &mut ids, &mut rng);
        assert_eq!(placed.len(), 1);
        assert_eq!(g.occupied_count(), 2);
    }

    #[test]
    fn ids_are_unique() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut g = Grid::new();
        let mut ids = TargetIdGen::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..4 {
            for p in spawn_cycle(&mut g, 3, &mut ids, &mut rng) {
                assert!(seen.insert(p.target.id));
            }
            g.clear();
        }
        assert_eq!(seen.len(), 12);
    }

    #[test]
    fn picks_every_cell_eventually() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut ids = TargetIdGen::new();
        let mut hits = [0usize; GRID_CELLS];
        for _ in 0..500 {
            let mut g = Grid::new();
            for p in spawn_cycle(&mut g, 1, &mut ids, &mut rng) {
                hits[p.row * GRID_COLS + p.col] += 1;
            }
        }
        assert!(hits.iter().all(|&h| h > 0));
    }
}
