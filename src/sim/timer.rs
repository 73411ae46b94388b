/// Cooperative timer scheduler on a virtual millisecond clock.
///
/// Nothing here runs on its own thread. The owner calls `pop_due(until)`
/// repeatedly; each call hands back at most one due timer, already
/// advanced to its deadline, so the owner can apply it as one atomic step
/// against its latest state before asking for the next.
///
/// Ordering:
///   - earlier deadline first
///   - equal deadlines fire in the order they were armed; a periodic
///     timer counts as re-armed at the moment it last fired
///
/// Periodic timers re-arm at `deadline + period` when popped, keeping
/// their id, so a single `cancel(id)` stops them for good. One-shot
/// timers are forgotten once popped.

use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Clone, Debug)]
struct Entry<T> {
    id: TimerId,
    period_ms: Option<u64>,
    task: T,
}

#[derive(Clone, Debug)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_seq: u64,
    /// Keyed by (deadline, seq): iteration order is firing order.
    queue: BTreeMap<(u64, u64), Entry<T>>,
    /// Live timer → its current queue key, for O(log n) cancel.
    index: HashMap<TimerId, (u64, u64)>,
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Scheduler {
            now_ms: 0,
            next_seq: 0,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Fire once, `delay_ms` from now. A zero delay fires on the next pop.
    pub fn schedule_once(&mut self, delay_ms: u64, task: T) -> TimerId {
        self.insert(self.now_ms + delay_ms, None, task)
    }

    /// Fire every `period_ms`, first time one period from now.
    pub fn schedule_every(&mut self, period_ms: u64, task: T) -> TimerId {
        let period = period_ms.max(1);
        self.insert(self.now_ms + period, Some(period), task)
    }

    /// Stop a timer. Unknown or already-fired ids are ignored.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.index.remove(&id) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pop the earliest timer due at or before `until_ms`, moving the clock
    /// to its deadline. Returns None (and moves the clock to `until_ms`)
    /// once nothing else is due.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerId, T)> {
        let key = match self.queue.keys().next() {
            Some(&key) if key.0 <= until_ms => key,
            _ => {
                self.now_ms = self.now_ms.max(until_ms);
                return None;
            }
        };

        let entry = self.queue.remove(&key)?;
        self.index.remove(&entry.id);
        self.now_ms = self.now_ms.max(key.0);

        if let Some(period) = entry.period_ms {
            let seq = self.bump_seq();
            let rearm = (key.0 + period, seq);
            self.index.insert(entry.id, rearm);
            self.queue.insert(rearm, entry.clone());
        }

        Some((entry.id, entry.task))
    }

    fn insert(&mut self, deadline: u64, period_ms: Option<u64>, task: T) -> TimerId {
        let seq = self.bump_seq();
        let id = TimerId(seq);
        self.queue.insert((deadline, seq), Entry { id, period_ms, task });
        self.index.insert(id, (deadline, seq));
        id
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl<T: Clone> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
