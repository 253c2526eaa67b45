//! Open-addressing memo table for the DP states.
//!
//! The table has a fixed number of slots, chosen independently of the
//! instance, and resolves collisions by linear probing with wrap-around.
//! A state is claimed (written with an infeasible placeholder) before its
//! predecessors are evaluated, so every key is computed at most once. Entries
//! are never removed, which keeps slot indices stable for the whole run.

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};
use crate::instance::Time;
use crate::vertex_set::VertexSet;

/// Value standing for "no feasible path", above every real cost or time.
pub const INFEASIBLE: Time = Time::MAX;

/// Default number of slots (prime). Slots are allocated up front, a few
/// hundred MB at this size for timed keys.
pub const DEFAULT_TABLE_SIZE: usize = 6_291_469;

/// Key of a memoized DP state.
pub trait StateKey: Copy + Eq {
    /// Location the partial path ends at.
    fn location(&self) -> usize;

    /// Home slot of the key in a table of `size` slots, for an instance of
    /// `dimension` locations.
    fn home_slot(&self, dimension: usize, size: usize) -> usize;
}

/// State of the travel-time recurrence: `(location, arrival time, visited set)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimedKey {
    pub visited: VertexSet,
    pub time: Time,
    pub location: u8,
}

impl TimedKey {
    pub fn new(location: usize, time: Time, visited: VertexSet) -> Self {
        TimedKey { visited, time, location: location as u8 }
    }
}

impl StateKey for TimedKey {
    fn location(&self) -> usize {
        self.location as usize
    }

    fn home_slot(&self, dimension: usize, size: usize) -> usize {
        // (i + t + (s - 1) * (t + 1) * n) mod size
        let i = self.location as u128;
        let t = self.time as u128;
        let h = i
            .wrapping_add(t)
            .wrapping_add(
                self.visited
                    .bits()
                    .wrapping_sub(1)
                    .wrapping_mul(t.wrapping_add(1))
                    .wrapping_mul(dimension as u128),
            );
        (h % size as u128) as usize
    }
}

/// State of the makespan recurrence: `(location, visited set)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SetKey {
    pub visited: VertexSet,
    pub location: u8,
}

impl SetKey {
    pub fn new(location: usize, visited: VertexSet) -> Self {
        SetKey { visited, location: location as u8 }
    }
}

impl StateKey for SetKey {
    fn location(&self) -> usize {
        self.location as usize
    }

    fn home_slot(&self, dimension: usize, size: usize) -> usize {
        // (i + (s - 1) * n) mod size
        let i = self.location as u128;
        let h = i.wrapping_add(
            self.visited
                .bits()
                .wrapping_sub(1)
                .wrapping_mul(dimension as u128),
        );
        (h % size as u128) as usize
    }
}

/// Cached result of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoEntry {
    /// Best cost (travel-time flavor) or earliest arrival (makespan flavor)
    pub value: Time,
    /// Location visited immediately before, if any candidate was feasible
    pub predecessor: Option<u8>,
    /// Arrival time at the predecessor (travel-time flavor only)
    pub predecessor_time: Time,
}

impl MemoEntry {
    /// Placeholder written when a state is claimed.
    pub const PENDING: MemoEntry = MemoEntry {
        value: INFEASIBLE,
        predecessor: None,
        predecessor_time: INFEASIBLE,
    };

    pub fn is_feasible(&self) -> bool {
        self.value < INFEASIBLE
    }
}

/// Outcome of probing the table for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The key is stored at this slot.
    Hit(usize),
    /// The key is absent; this is the first vacant slot on its probe path.
    Vacant(usize),
}

/// Probe counters of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoStats {
    /// Distinct states memoized
    pub states: u64,
    /// Total probe steps beyond the home slot
    pub collisions: u64,
}

/// Linear-probing table from a state key to its cached entry.
pub struct MemoStore<K: StateKey> {
    slots: Vec<Option<(K, MemoEntry)>>,
    dimension: usize,
    stats: MemoStats,
}

impl<K: StateKey> MemoStore<K> {
    /// Allocate a table of `size` slots for an instance of `dimension` locations.
    pub fn new(size: usize, dimension: usize) -> Self {
        assert!(size > 0, "memo table needs at least one slot");
        MemoStore {
            slots: vec![None; size],
            dimension,
            stats: MemoStats::default(),
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn states(&self) -> u64 {
        self.stats.states
    }

    pub fn collisions(&self) -> u64 {
        self.stats.collisions
    }

    pub fn stats(&self) -> MemoStats {
        self.stats
    }

    /// Walk the probe path of `key` and return the matching or first vacant slot
    /// together with the number of steps taken.
    fn scan(&self, key: &K) -> SolverResult<(Probe, u64)> {
        let size = self.size();
        let mut h = key.home_slot(self.dimension, size);
        for steps in 0..size {
            match &self.slots[h] {
                None => return Ok((Probe::Vacant(h), steps as u64)),
                Some((stored, _)) if stored == key => return Ok((Probe::Hit(h), steps as u64)),
                Some(_) => {
                    h += 1;
                    if h == size {
                        h = 0;
                    }
                }
            }
        }
        Err(SolverError::TableFull {
            size,
            states: self.stats.states,
        })
    }

    /// Locate `key`, adding the probe steps to the collision counter.
    pub fn probe(&mut self, key: &K) -> SolverResult<Probe> {
        let (probe, steps) = self.scan(key)?;
        self.stats.collisions += steps;
        Ok(probe)
    }

    /// Read-only lookup that leaves the counters untouched.
    pub fn find(&self, key: &K) -> SolverResult<Option<MemoEntry>> {
        Ok(match self.scan(key)? {
            (Probe::Hit(slot), _) => self.slots[slot].map(|(_, entry)| entry),
            (Probe::Vacant(_), _) => None,
        })
    }

    /// Store `key` in a vacant slot returned by [`probe`](Self::probe), with an
    /// infeasible placeholder value.
    pub fn claim(&mut self, slot: usize, key: K) {
        debug_assert!(self.slots[slot].is_none(), "slot {} already claimed", slot);
        self.slots[slot] = Some((key, MemoEntry::PENDING));
        self.stats.states += 1;
    }

    /// Entry stored at an occupied slot.
    pub fn entry(&self, slot: usize) -> MemoEntry {
        match &self.slots[slot] {
            Some((_, entry)) => *entry,
            None => MemoEntry::PENDING,
        }
    }

    /// Replace the entry at `slot` when `value` strictly improves on it.
    ///
    /// Returns whether the entry changed. Ties keep the earlier candidate.
    pub fn improve(&mut self, slot: usize, value: Time, predecessor: usize, predecessor_time: Time) -> bool {
        if let Some((_, entry)) = &mut self.slots[slot] {
            if value < entry.value {
                *entry = MemoEntry {
                    value,
                    predecessor: Some(predecessor as u8),
                    predecessor_time,
                };
                return true;
            }
        }
        false
    }

    /// Insert or overwrite the entry of `key`.
    pub fn insert(&mut self, key: K, entry: MemoEntry) -> SolverResult<()> {
        let slot = match self.probe(&key)? {
            Probe::Hit(slot) => slot,
            Probe::Vacant(slot) => {
                self.claim(slot, key);
                slot
            }
        };
        self.slots[slot] = Some((key, entry));
        Ok(())
    }
}
