//! Dynamic-programming recurrences of the TSPTW.
//!
//! Both recurrences describe a partial path that starts at the depot, visits
//! every customer of a set `s` in some order and then ends at customer `i`.
//! They recurse on the customer `j` visited immediately before `i`, taking
//! predecessors in ascending index order and keeping the first best
//! candidate, so results are reproducible.
//!
//! - [`TravelTimeRecurrence`] evaluates `(i, t, s)`: the least travel cost of
//!   such a path that starts service at `i` exactly at time `t`.
//! - [`MakespanRecurrence`] evaluates `(i, s)`: the earliest service start at
//!   `i` over all such paths.
//!
//! [`INFEASIBLE`] is propagated as an ordinary value, so taking a minimum over
//! candidates absorbs it.

use crate::error::SolverResult;
use crate::instance::{Time, TsptwInstance};
use crate::memo::{MemoStore, Probe, SetKey, TimedKey, INFEASIBLE};
use crate::vertex_set::VertexSet;

/// Travel-cost recurrence over `(location, arrival time, visited set)` states.
pub struct TravelTimeRecurrence<'a> {
    instance: &'a TsptwInstance,
    memo: &'a mut MemoStore<TimedKey>,
}

impl<'a> TravelTimeRecurrence<'a> {
    pub fn new(instance: &'a TsptwInstance, memo: &'a mut MemoStore<TimedKey>) -> Self {
        TravelTimeRecurrence { instance, memo }
    }

    /// Least travel cost from the depot to `i` through every customer of
    /// `visited`, starting service at `i` at time `t`.
    pub fn cost(&mut self, i: usize, t: Time, visited: VertexSet) -> SolverResult<Time> {
        let inst = self.instance;
        let window = inst.window(i);

        if visited.is_empty() {
            let direct = inst.travel_time(0, i);
            if t >= inst.depot_departure() + direct && t <= window.latest {
                return Ok(direct);
            }
            return Ok(INFEASIBLE);
        }

        if t < 0 || t > window.latest {
            return Ok(INFEASIBLE);
        }

        let key = TimedKey::new(i, t, visited);
        let slot = match self.memo.probe(&key)? {
            Probe::Hit(slot) => return Ok(self.memo.entry(slot).value),
            Probe::Vacant(slot) => slot,
        };

        // Every customer of `visited` comes before `i`; one that cannot be
        // served in time even when leaving straight for `i` rules out the state.
        let blocked = visited.iter().any(|j| {
            inst.window(j).earliest + inst.service_time(j) + inst.travel_time(j, i) > window.latest
        });
        if blocked {
            return Ok(INFEASIBLE);
        }

        self.memo.claim(slot, key);

        for j in visited {
            let rest = visited.remove(j);
            let leg = inst.travel_time(j, i);
            let last_start = t - leg - inst.service_time(j);
            for tj in inst.window(j).earliest..=last_start {
                let d = self.cost(j, tj, rest)?;
                if d < INFEASIBLE {
                    self.memo.improve(slot, d + leg, j, tj);
                }
            }
        }

        Ok(self.memo.entry(slot).value)
    }
}

/// Earliest-arrival recurrence over `(location, visited set)` states.
pub struct MakespanRecurrence<'a> {
    instance: &'a TsptwInstance,
    memo: &'a mut MemoStore<SetKey>,
}

impl<'a> MakespanRecurrence<'a> {
    pub fn new(instance: &'a TsptwInstance, memo: &'a mut MemoStore<SetKey>) -> Self {
        MakespanRecurrence { instance, memo }
    }

    /// Arrival at `i` coming from time `ready` (already past service and
    /// travel), waiting for the window to open.
    #[inline]
    fn enter(&self, i: usize, ready: Time) -> Time {
        let window = self.instance.window(i);
        let t = ready.max(window.earliest);
        if t > window.latest {
            INFEASIBLE
        } else {
            t
        }
    }

    /// Earliest service start at `i` after visiting every customer of `visited`.
    pub fn arrival(&mut self, i: usize, visited: VertexSet) -> SolverResult<Time> {
        let inst = self.instance;

        if visited.is_empty() {
            return Ok(self.enter(i, inst.depot_departure() + inst.travel_time(0, i)));
        }

        let key = SetKey::new(i, visited);
        let slot = match self.memo.probe(&key)? {
            Probe::Hit(slot) => return Ok(self.memo.entry(slot).value),
            Probe::Vacant(slot) => slot,
        };

        let latest = inst.window(i).latest;
        if visited.iter().any(|j| inst.window(j).earliest > latest) {
            return Ok(INFEASIBLE);
        }

        self.memo.claim(slot, key);

        for j in visited {
            let tj = self.arrival(j, visited.remove(j))?;
            if tj < INFEASIBLE {
                let t = self.enter(i, tj + inst.service_time(j) + inst.travel_time(j, i));
                if t < INFEASIBLE {
                    self.memo.improve(slot, t, j, tj);
                }
            }
        }

        Ok(self.memo.entry(slot).value)
    }
}
