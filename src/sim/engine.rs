/// GameEngine: lifecycle state machine plus the three timed processes.
///
/// Processes, all driven by one cooperative `Scheduler`:
///   1. Countdown     → every 1000 ms, decrements the clock, ends the game at 0
///   2. Spawn cycle   → one zero-delay kickoff, then every `spawn_interval_ms`
///   3. Expiry        → one-shot per target, after `target_lifetime_ms`
///
/// Every timer callback is dispatched as its own `&mut self` step and
/// re-reads the current status and grid before acting. A callback that was
/// already queued when the game paused, ended or restarted finds a status
/// other than Playing and does nothing. Expiries are never cancelled; they
/// check the target id in their cell instead.
///
/// Transitions:
///
/// ```text
///   Ready   --start-->    Playing
///   Playing --pause-->    Paused
///   Paused  --start-->    Playing   (grid cleared, spawn restarted)
///   Playing --clock 0-->  Ended
///   *       --restart-->  Ready
/// ```

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};

use crate::domain::difficulty::Difficulty;
use crate::domain::grid::{Grid, TargetId};
use crate::domain::target::TargetKind;
use super::event::GameEvent;
use super::highscore::{read_or_zero, HighScoreStore};
use super::session::{GameSnapshot, GameStatus, Session};
use super::spawn::{self, TargetIdGen};
use super::timer::{Scheduler, TimerId};

const COUNTDOWN_PERIOD_MS: u64 = 1000;
const NANOS_PER_MS: u128 = 1_000_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Task {
    Countdown,
    /// Immediate spawn after start/resume; arms the periodic cycle.
    SpawnKickoff,
    SpawnCycle,
    Expire { row: usize, col: usize, id: TargetId },
}

/// Result of `select_cell`, mirrored by the event stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SelectOutcome {
    Hit(TargetKind),
    MissedEmpty,
    /// Not Playing, or coordinates off the board.
    Ignored,
}

pub struct GameEngine<S: HighScoreStore> {
    session: Session,
    scheduler: Scheduler<Task>,
    countdown: Option<TimerId>,
    spawner: Option<TimerId>,
    ids: TargetIdGen,
    rng: StdRng,
    store: S,
    events: Vec<GameEvent>,
    /// Sub-millisecond part of `advance` calls not yet applied to the clock.
    carry_ns: u32,
}

// ── Construction / queries ──

impl<S: HighScoreStore> GameEngine<S> {
    pub fn new(difficulty: Difficulty, store: S) -> Self {
        Self::with_rng(difficulty, store, StdRng::from_entropy())
    }

    /// Deterministic spawns, for tests and replays within one session.
    pub fn with_seed(difficulty: Difficulty, store: S, seed: u64) -> Self {
        Self::with_rng(difficulty, store, StdRng::seed_from_u64(seed))
    }

    fn with_rng(difficulty: Difficulty, store: S, rng: StdRng) -> Self {
        let high_score = read_or_zero(&store, difficulty);
        GameEngine {
            session: Session::new(difficulty, high_score),
            scheduler: Scheduler::new(),
            countdown: None,
            spawner: None,
            ids: TargetIdGen::new(),
            rng,
            store,
            events: Vec::new(),
            carry_ns: 0,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.session.status
    }

    pub fn score(&self) -> u32 {
        self.session.score
    }

    pub fn time_remaining_secs(&self) -> u32 {
        self.session.time_remaining_secs
    }

    pub fn high_score(&self) -> u32 {
        self.session.high_score
    }

    pub fn difficulty(&self) -> Difficulty {
        self.session.difficulty
    }

    pub fn grid(&self) -> &Grid {
        &self.session.grid
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.session.snapshot()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Engine clock in milliseconds since construction.
    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

// ── Lifecycle controls ──

impl<S: HighScoreStore> GameEngine<S> {
    /// Ready → Playing, or resume Paused → Playing. No-op otherwise.
    pub fn start(&mut self) {
        let was_paused = match self.session.status {
            GameStatus::Ready => false,
            GameStatus::Paused => true,
            GameStatus::Playing | GameStatus::Ended => {
                debug!(status = self.session.status.label(), "start ignored");
                return;
            }
        };

        self.set_status(GameStatus::Playing);

        if self.countdown.is_none() {
            self.countdown = Some(self.scheduler.schedule_every(COUNTDOWN_PERIOD_MS, Task::Countdown));
        }

        // Fresh spawn process: drop any half-started one
        self.stop_spawner();
        if was_paused {
            self.session.grid.clear();
        }
        self.spawner = Some(self.scheduler.schedule_once(0, Task::SpawnKickoff));

        let p = self.session.params();
        info!(
            difficulty = %self.session.difficulty,
            resumed = was_paused,
            spawn_interval_ms = p.spawn_interval_ms,
            target_lifetime_ms = p.target_lifetime_ms,
            max_targets = p.max_concurrent_targets,
            "game started"
        );
    }

    /// Playing → Paused. No-op otherwise.
    pub fn pause(&mut self) {
        if self.session.status != GameStatus::Playing {
            debug!(status = self.session.status.label(), "pause ignored");
            return;
        }
        self.stop_countdown();
        self.stop_spawner();
        self.set_status(GameStatus::Paused);
        info!(
            score = self.session.score,
            remaining = self.session.time_remaining_secs,
            "game paused"
        );
    }

    /// Any status → Ready with score, clock and grid reset.
    pub fn restart(&mut self) {
        self.stop_countdown();
        self.stop_spawner();
        self.set_status(GameStatus::Ready);
        self.session.reset();
        info!(difficulty = %self.session.difficulty, "game reset");
    }

    /// Honored only while Ready or Ended. Returns whether it took effect.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if !self.session.status.is_idle() {
            debug!(%difficulty, status = self.session.status.label(), "difficulty change ignored");
            return false;
        }
        self.session.difficulty = difficulty;
        self.session.high_score = read_or_zero(&self.store, difficulty);
        self.events.push(GameEvent::DifficultyChanged {
            difficulty,
            high_score: self.session.high_score,
        });
        info!(%difficulty, high_score = self.session.high_score, "difficulty set");
        true
    }

    /// Player action. Clears the cell before scoring so a repeated
    /// selection of the same cell finds it empty.
    pub fn select_cell(&mut self, row: usize, col: usize) -> SelectOutcome {
        if self.session.status != GameStatus::Playing || !Grid::in_bounds(row, col) {
            return SelectOutcome::Ignored;
        }

        match self.session.grid.take(row, col) {
            Some(target) => {
                self.session.score = target.kind.apply_to(self.session.score);
                self.events.push(GameEvent::TargetHit {
                    row,
                    col,
                    kind: target.kind,
                    score: self.session.score,
                });
                debug!(row, col, kind = target.kind.label(), score = self.session.score, "target hit");
                SelectOutcome::Hit(target.kind)
            }
            None => {
                self.events.push(GameEvent::MissedEmpty { row, col });
                trace!(row, col, "missed empty cell");
                SelectOutcome::MissedEmpty
            }
        }
    }
}

// ── Time ──

impl<S: HighScoreStore> GameEngine<S> {
    /// Move the engine clock forward, firing every timer that comes due,
    /// one at a time and in deadline order.
    /// Fractions of a millisecond carry over to the next call, so frame
    /// deltas add up to the wall time they were measured from.
    pub fn advance(&mut self, elapsed: Duration) {
        let total_ns = elapsed.as_nanos() + u128::from(self.carry_ns);
        let ms = u64::try_from(total_ns / NANOS_PER_MS).unwrap_or(u64::MAX);
        self.carry_ns = (total_ns % NANOS_PER_MS) as u32;
        self.advance_ms(ms);
    }

    pub fn advance_ms(&mut self, ms: u64) {
        let until = self.scheduler.now_ms().saturating_add(ms);
        while let Some((_, task)) = self.scheduler.pop_due(until) {
            self.dispatch(task);
        }
    }

    fn dispatch(&mut self, task: Task) {
        // Every process is inert outside Playing, whenever it was queued.
        if self.session.status != GameStatus::Playing {
            trace!(?task, status = self.session.status.label(), "stale timer ignored");
            return;
        }
        match task {
            Task::Countdown => self.on_countdown(),
            Task::SpawnKickoff => {
                self.run_spawn_cycle();
                let interval = self.session.params().spawn_interval_ms;
                self.spawner = Some(self.scheduler.schedule_every(interval, Task::SpawnCycle));
            }
            Task::SpawnCycle => self.run_spawn_cycle(),
            Task::Expire { row, col, id } => self.on_expire(row, col, id),
        }
    }

    fn on_countdown(&mut self) {
        if self.session.time_remaining_secs <= 1 {
            self.session.time_remaining_secs = 0;
            self.end_game();
            return;
        }
        self.session.time_remaining_secs -= 1;
        let remaining = self.session.time_remaining_secs;
        self.events.push(GameEvent::Tick { remaining });
        trace!(remaining, "tick");
    }

    fn run_spawn_cycle(&mut self) {
        let p = self.session.params();
        let occupied = self.session.grid.occupied_count();
        let placed = spawn::spawn_cycle(
            &mut self.session.grid,
            p.max_concurrent_targets,
            &mut self.ids,
            &mut self.rng,
        );
        debug!(occupied, placed = placed.len(), "spawn cycle");

        for pl in placed {
            self.scheduler.schedule_once(
                p.target_lifetime_ms,
                Task::Expire { row: pl.row, col: pl.col, id: pl.target.id },
            );
            self.events.push(GameEvent::TargetSpawned { row: pl.row, col: pl.col, kind: pl.target.kind });
        }
    }

    fn on_expire(&mut self, row: usize, col: usize, id: TargetId) {
        let Some(kind) = self.session.grid.get(row, col).kind() else { return };
        if self.session.grid.clear_if(row, col, id) {
            self.events.push(GameEvent::TargetExpired { row, col, kind });
            trace!(row, col, "target expired");
        }
    }

    /// Playing → Ended: stop both periodic processes, then settle the
    /// high score. Store failures never block the transition.
    fn end_game(&mut self) {
        self.stop_countdown();
        self.stop_spawner();
        self.set_status(GameStatus::Ended);

        let difficulty = self.session.difficulty;
        let score = self.session.score;
        let best = read_or_zero(&self.store, difficulty);
        let new_record = score > best;
        if new_record {
            if let Err(e) = self.store.write(difficulty, score) {
                warn!(%difficulty, score, error = %e, "high score write failed");
            }
        }
        self.session.high_score = best.max(score);

        self.events.push(GameEvent::GameEnded {
            score,
            high_score: self.session.high_score,
            new_record,
        });
        info!(%difficulty, score, high_score = self.session.high_score, new_record, "game over");
    }
}

// ── Internals ──

impl<S: HighScoreStore> GameEngine<S> {
    fn set_status(&mut self, to: GameStatus) {
        let from = self.session.status;
        if from == to {
            return;
        }
        self.session.status = to;
        self.events.push(GameEvent::StatusChanged { from, to });
    }

    fn stop_countdown(&mut self) {
        if let Some(id) = self.countdown.take() {
            self.scheduler.cancel(id);
        }
    }

    fn stop_spawner(&mut self) {
        if let Some(id) = self.spawner.take() {
            self.scheduler.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::{Target, GRID_CELLS, GRID_COLS};
    use crate::sim::highscore::MemoryHighScoreStore;

    type Engine = GameEngine<MemoryHighScoreStore>;

    fn engine(d: Difficulty) -> Engine {
        GameEngine::with_seed(d, MemoryHighScoreStore::new(), 42)
    }

    fn engine_with(d: Difficulty, store: MemoryHighScoreStore) -> Engine {
        GameEngine::with_seed(d, store, 42)
    }

    /// Playing, kickoff already fired, board wiped, events drained.
    fn playing_clean(d: Difficulty) -> Engine {
        let mut e = engine(d);
        e.start();
        e.advance_ms(0);
        e.session.grid.clear();
        e.drain_events();
        e
    }

    fn plant(e: &mut Engine, row: usize, col: usize, kind: TargetKind) -> TargetId {
        let id = e.ids.next_id();
        assert!(e.session.grid.place(row, col, Target { id, kind }));
        id
    }

    fn run_out_clock(e: &mut Engine) {
        e.session.time_remaining_secs = 1;
        e.advance_ms(COUNTDOWN_PERIOD_MS);
        assert_eq!(e.status(), GameStatus::Ended);
    }

    fn count<F: Fn(&GameEvent) -> bool>(events: &[GameEvent], f: F) -> usize {
        events.iter().filter(|ev| f(ev)).count()
    }

    // ── Construction ──

    #[test]
    fn new_engine_is_ready_with_defaults() {
        let store = MemoryHighScoreStore::new().with_score(Difficulty::Medium, 75);
        let e = engine_with(Difficulty::Medium, store);
        assert_eq!(e.status(), GameStatus::Ready);
        assert_eq!(e.score(), 0);
        assert_eq!(e.time_remaining_secs(), 60);
        assert_eq!(e.grid().occupied_count(), 0);
        assert_eq!(e.high_score(), 75);
    }

    #[test]
    fn failed_read_defaults_high_score_to_zero() {
        let mut store = MemoryHighScoreStore::new().with_score(Difficulty::Hard, 99);
        store.fail_reads = true;
        let e = engine_with(Difficulty::Hard, store);
        assert_eq!(e.high_score(), 0);
    }

    // ── start ──

    #[test]
    fn start_from_ready_schedules_immediate_spawn() {
        let mut e = engine(Difficulty::Medium);
        e.start();
        assert_eq!(e.status(), GameStatus::Playing);
        assert_eq!(e.score(), 0);
        assert_eq!(e.time_remaining_secs(), 60);
        // Deferred: lands on the next advance, after the status flip
        assert_eq!(e.grid().occupied_count(), 0);

        e.advance_ms(0);
        assert_eq!(e.grid().occupied_count(), 2);
        let events = e.drain_events();
        assert_eq!(
            events[0],
            GameEvent::StatusChanged { from: GameStatus::Ready, to: GameStatus::Playing }
        );
        assert_eq!(count(&events, |ev| matches!(ev, GameEvent::TargetSpawned { .. })), 2);
    }

    #[test]
    fn start_twice_is_idempotent() {
        let mut e = engine(Difficulty::Medium);
        e.start();
        e.advance_ms(0);
        e.drain_events();
        let pending = e.scheduler.pending();
        let snap = e.snapshot();

        e.start();
        assert_eq!(e.scheduler.pending(), pending);
        assert_eq!(e.snapshot(), snap);
        assert!(e.drain_events().is_empty());

        // One countdown, not two
        e.advance_ms(1000);
        assert_eq!(e.time_remaining_secs(), 59);
    }

    #[test]
    fn start_from_ended_is_ignored() {
        let mut e = engine(Difficulty::Easy);
        e.start();
        run_out_clock(&mut e);
        e.start();
        assert_eq!(e.status(), GameStatus::Ended);
        assert_eq!(e.time_remaining_secs(), 0);
    }

    // ── Countdown ──

    #[test]
    fn countdown_runs_to_zero_then_ends() {
        let mut e = engine(Difficulty::Hard);
        e.start();
        for i in 1..=59 {
            e.advance_ms(1000);
            assert_eq!(e.time_remaining_secs(), 60 - i);
            assert_eq!(e.status(), GameStatus::Playing);
        }
        e.advance_ms(1000);
        assert_eq!(e.time_remaining_secs(), 0);
        assert_eq!(e.status(), GameStatus::Ended);

        e.drain_events();
        e.advance_ms(10_000);
        assert_eq!(e.time_remaining_secs(), 0);
        let events = e.drain_events();
        assert!(events.is_empty(), "no activity after end: {events:?}");
    }

    #[test]
    fn last_tick_ends_game_and_stale_timers_are_inert() {
        let mut e = engine(Difficulty::Medium);
        e.start();
        e.advance_ms(0);
        e.session.time_remaining_secs = 1;
        e.advance_ms(1000);

        assert_eq!(e.time_remaining_secs(), 0);
        assert_eq!(e.status(), GameStatus::Ended);
        assert!(e.countdown.is_none());
        assert!(e.spawner.is_none());
        // The countdown fired before the same-instant expiries: targets stay visible
        assert_eq!(e.grid().occupied_count(), 2);

        let grid = e.grid().clone();
        e.drain_events();
        // Fires that were already queued when the game ended
        e.dispatch(Task::Countdown);
        e.dispatch(Task::SpawnCycle);
        e.dispatch(Task::SpawnKickoff);
        e.advance_ms(5000);
        assert_eq!(e.time_remaining_secs(), 0);
        assert_eq!(e.grid(), &grid);
        assert!(e.drain_events().is_empty());
    }

    // ── Spawn / expiry ──

    #[test]
    fn medium_targets_expire_after_lifetime() {
        let mut e = engine(Difficulty::Medium);
        e.start();
        e.advance_ms(0);
        assert_eq!(e.grid().occupied_count(), 2);

        e.advance_ms(999);
        assert_eq!(e.grid().occupied_count(), 2);
        e.advance_ms(1);
        assert_eq!(e.grid().occupied_count(), 0);
        let events = e.drain_events();
        assert_eq!(count(&events, |ev| matches!(ev, GameEvent::TargetExpired { .. })), 2);
    }

    #[test]
    fn periodic_cycle_follows_interval() {
        let mut e = engine(Difficulty::Easy);
        e.start();
        e.advance_ms(0);
        e.drain_events();
        // Easy spawns every 1500 ms
        e.advance_ms(1499);
        let events = e.drain_events();
        assert_eq!(count(&events, |ev| matches!(ev, GameEvent::TargetSpawned { .. })), 0);
        e.advance_ms(1);
        let events = e.drain_events();
        assert_eq!(count(&events, |ev| matches!(ev, GameEvent::TargetSpawned { .. })), 1);
    }

    #[test]
    fn spawn_cycle_fills_free_cells_without_overwriting() {
        let mut e = playing_clean(Difficulty::Hard);
        let mut planted = vec![];
        for i in 0..7 {
            planted.push((i / GRID_COLS, i % GRID_COLS, plant(&mut e, i / GRID_COLS, i % GRID_COLS, TargetKind::Normal)));
        }
        e.dispatch(Task::SpawnCycle);
        assert_eq!(e.grid().occupied_count(), GRID_CELLS);
        for (r, c, id) in planted {
            assert_eq!(e.grid().get(r, c).target().map(|t| t.id), Some(id));
        }
    }

    #[test]
    fn spawn_goes_past_cap_when_room_remains() {
        let mut e = playing_clean(Difficulty::Easy);
        plant(&mut e, 1, 1, TargetKind::Special);
        e.dispatch(Task::SpawnCycle);
        assert_eq!(e.grid().occupied_count(), 2);
    }

    #[test]
    fn expiry_spares_a_newer_target_in_the_same_cell() {
        let mut e = engine(Difficulty::Medium);
        e.start();
        e.advance_ms(0);
        let (row, col) = (0..GRID_CELLS)
            .map(|i| (i / GRID_COLS, i % GRID_COLS))
            .find(|&(r, c)| !e.grid().get(r, c).is_empty())
            .unwrap();

        assert!(matches!(e.select_cell(row, col), SelectOutcome::Hit(_)));
        let newer = plant(&mut e, row, col, TargetKind::Bomb);

        e.advance_ms(1000);
        assert_eq!(e.grid().get(row, col).target().map(|t| t.id), Some(newer));
    }

    // ── Selection ──

    #[test]
    fn hits_apply_score_deltas() {
        let mut e = playing_clean(Difficulty::Medium);
        plant(&mut e, 0, 0, TargetKind::Normal);
        plant(&mut e, 0, 1, TargetKind::Special);
        plant(&mut e, 0, 2, TargetKind::Bomb);

        assert_eq!(e.select_cell(0, 0), SelectOutcome::Hit(TargetKind::Normal));
        assert_eq!(e.score(), 10);
        assert_eq!(e.select_cell(0, 1), SelectOutcome::Hit(TargetKind::Special));
        assert_eq!(e.score(), 35);
        assert_eq!(e.select_cell(0, 2), SelectOutcome::Hit(TargetKind::Bomb));
        assert_eq!(e.score(), 20);
        assert!(e.grid().get(0, 0).is_empty());
    }

    #[test]
    fn bomb_subtracts_and_clamps() {
        let mut e = playing_clean(Difficulty::Medium);
        e.session.score = 30;
        plant(&mut e, 2, 2, TargetKind::Bomb);
        e.select_cell(2, 2);
        assert_eq!(e.score(), 15);

        e.session.score = 10;
        plant(&mut e, 2, 2, TargetKind::Bomb);
        e.select_cell(2, 2);
        assert_eq!(e.score(), 0);
    }

    #[test]
    fn double_selection_scores_once() {
        let mut e = playing_clean(Difficulty::Medium);
        plant(&mut e, 1, 1, TargetKind::Normal);
        assert_eq!(e.select_cell(1, 1), SelectOutcome::Hit(TargetKind::Normal));
        assert_eq!(e.select_cell(1, 1), SelectOutcome::MissedEmpty);
        assert_eq!(e.score(), 10);
        assert_eq!(
            e.drain_events(),
            vec![
                GameEvent::TargetHit { row: 1, col: 1, kind: TargetKind::Normal, score: 10 },
                GameEvent::MissedEmpty { row: 1, col: 1 },
            ]
        );
    }

    #[test]
    fn selection_outside_playing_is_ignored() {
        let mut e = engine(Difficulty::Medium);
        plant(&mut e, 0, 0, TargetKind::Normal);
        assert_eq!(e.select_cell(0, 0), SelectOutcome::Ignored);
        assert_eq!(e.score(), 0);
        assert!(!e.grid().get(0, 0).is_empty());
        assert!(e.drain_events().is_empty());
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut e = playing_clean(Difficulty::Medium);
        assert_eq!(e.select_cell(3, 0), SelectOutcome::Ignored);
        assert_eq!(e.select_cell(0, 9), SelectOutcome::Ignored);
        assert!(e.drain_events().is_empty());
    }

    // ── Pause / resume ──

    #[test]
    fn pause_freezes_clock_and_resume_clears_board() {
        let mut e = playing_clean(Difficulty::Medium);
        plant(&mut e, 0, 0, TargetKind::Normal);
        e.select_cell(0, 0);
        e.advance_ms(2500);
        assert_eq!(e.time_remaining_secs(), 58);

        e.pause();
        assert_eq!(e.status(), GameStatus::Paused);
        e.advance_ms(5000);
        assert_eq!(e.time_remaining_secs(), 58);
        assert_eq!(e.select_cell(1, 1), SelectOutcome::Ignored);

        e.start();
        assert_eq!(e.status(), GameStatus::Playing);
        assert_eq!(e.grid().occupied_count(), 0);
        assert_eq!(e.score(), 10);
        assert_eq!(e.time_remaining_secs(), 58);

        e.advance_ms(0);
        assert_eq!(e.grid().occupied_count(), 2);
        e.advance_ms(1000);
        assert_eq!(e.time_remaining_secs(), 57);
    }

    #[test]
    fn expiries_are_frozen_while_paused() {
        let mut e = engine(Difficulty::Medium);
        e.start();
        e.advance_ms(0);
        assert_eq!(e.grid().occupied_count(), 2);

        e.pause();
        e.advance_ms(5000);
        assert_eq!(e.status(), GameStatus::Paused);
        assert_eq!(e.grid().occupied_count(), 2);
        assert_eq!(count(&e.drain_events(), |ev| matches!(ev, GameEvent::TargetExpired { .. })), 0);

        e.start();
        assert_eq!(e.grid().occupied_count(), 0);
    }

    #[test]
    fn pause_is_noop_unless_playing() {
        let mut e = engine(Difficulty::Medium);
        e.pause();
        assert_eq!(e.status(), GameStatus::Ready);
        assert!(e.drain_events().is_empty());

        e.start();
        run_out_clock(&mut e);
        e.pause();
        assert_eq!(e.status(), GameStatus::Ended);
    }

    #[test]
    fn pause_before_kickoff_prevents_spawn() {
        let mut e = engine(Difficulty::Hard);
        e.start();
        e.pause();
        e.advance_ms(5000);
        assert_eq!(e.grid().occupied_count(), 0);
        assert_eq!(e.time_remaining_secs(), 60);
    }

    // ── Restart ──

    #[test]
    fn restart_resets_from_any_status() {
        let mut e = playing_clean(Difficulty::Medium);
        plant(&mut e, 0, 0, TargetKind::Special);
        e.select_cell(0, 0);
        e.advance_ms(3000);
        e.restart();
        assert_eq!(e.status(), GameStatus::Ready);
        assert_eq!(e.score(), 0);
        assert_eq!(e.time_remaining_secs(), 60);
        assert_eq!(e.grid().occupied_count(), 0);

        e.start();
        e.pause();
        e.restart();
        assert_eq!(e.status(), GameStatus::Ready);

        e.start();
        run_out_clock(&mut e);
        e.restart();
        assert_eq!(e.status(), GameStatus::Ready);
        assert_eq!(e.time_remaining_secs(), 60);

        // Nothing keeps running
        e.advance_ms(10_000);
        assert_eq!(e.time_remaining_secs(), 60);
        assert_eq!(e.grid().occupied_count(), 0);
        assert!(e.countdown.is_none());
        assert!(e.spawner.is_none());
    }

    #[test]
    fn old_expiries_cannot_clear_targets_after_restart() {
        let mut e = engine(Difficulty::Medium);
        e.start();
        e.advance_ms(0);
        e.advance_ms(500);
        e.restart();
        e.start();
        e.advance_ms(0);
        assert_eq!(e.grid().occupied_count(), 2);

        // Old expiries fire at 1000; new ones are due at 1500
        e.advance_ms(500);
        assert_eq!(e.grid().occupied_count(), 2);
        e.advance_ms(499);
        assert_eq!(e.grid().occupied_count(), 2);
        e.advance_ms(1);
        assert_eq!(e.grid().occupied_count(), 0);
    }

    // ── Difficulty ──

    #[test]
    fn difficulty_changes_only_when_idle() {
        let store = MemoryHighScoreStore::new()
            .with_score(Difficulty::Easy, 50)
            .with_score(Difficulty::Hard, 90);
        let mut e = engine_with(Difficulty::Medium, store);
        assert_eq!(e.high_score(), 0);

        assert!(e.set_difficulty(Difficulty::Hard));
        assert_eq!(e.difficulty(), Difficulty::Hard);
        assert_eq!(e.high_score(), 90);

        e.start();
        assert!(!e.set_difficulty(Difficulty::Easy));
        e.pause();
        assert!(!e.set_difficulty(Difficulty::Easy));
        assert_eq!(e.difficulty(), Difficulty::Hard);

        e.start();
        run_out_clock(&mut e);
        assert!(e.set_difficulty(Difficulty::Easy));
        assert_eq!(e.high_score(), 50);
    }

    #[test]
    fn new_difficulty_applies_to_next_game() {
        let mut e = engine(Difficulty::Medium);
        e.set_difficulty(Difficulty::Easy);
        e.start();
        e.advance_ms(0);
        assert_eq!(e.grid().occupied_count(), 1);
    }

    // ── High score ──

    #[test]
    fn beating_the_record_writes_once() {
        let store = MemoryHighScoreStore::new().with_score(Difficulty::Medium, 20);
        let mut e = engine_with(Difficulty::Medium, store);
        e.start();
        e.session.score = 40;
        run_out_clock(&mut e);

        let events = e.drain_events();
        assert!(events.contains(&GameEvent::GameEnded { score: 40, high_score: 40, new_record: true }));
        assert_eq!(e.store().writes, vec![(Difficulty::Medium, 40)]);
        assert_eq!(e.high_score(), 40);

        e.advance_ms(5000);
        assert_eq!(e.store().writes.len(), 1);
    }

    #[test]
    fn matching_the_record_does_not_write() {
        let store = MemoryHighScoreStore::new().with_score(Difficulty::Medium, 40);
        let mut e = engine_with(Difficulty::Medium, store);
        e.start();
        e.session.score = 40;
        run_out_clock(&mut e);

        assert!(e.store().writes.is_empty());
        assert_eq!(e.high_score(), 40);
        let events = e.drain_events();
        assert!(events.contains(&GameEvent::GameEnded { score: 40, high_score: 40, new_record: false }));
    }

    #[test]
    fn write_failure_does_not_block_end() {
        let mut store = MemoryHighScoreStore::new();
        store.fail_writes = true;
        let mut e = engine_with(Difficulty::Hard, store);
        e.start();
        e.session.score = 25;
        run_out_clock(&mut e);
        assert_eq!(e.status(), GameStatus::Ended);
        assert!(e.store().writes.is_empty());
        assert_eq!(e.high_score(), 25);
    }

    #[test]
    fn fractional_frames_add_up_to_wall_time() {
        let mut e = engine(Difficulty::Medium);
        e.start();
        for _ in 0..600 {
            e.advance(Duration::from_micros(16_900));
        }
        assert_eq!(e.now_ms(), 10_140);
        assert_eq!(e.time_remaining_secs(), 50);
    }

    #[test]
    fn advance_accepts_durations() {
        let mut e = engine(Difficulty::Medium);
        e.start();
        e.advance(Duration::from_millis(3000));
        assert_eq!(e.time_remaining_secs(), 57);
        assert_eq!(e.now_ms(), 3000);
    }
}
