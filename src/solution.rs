//! Solution representation and tour reconstruction for the TSPTW.
//!
//! The DP only stores, for each state, the location visited just before.
//! [`SolutionBuilder`] follows those links from the last customer back to
//! the depot to recover the visiting order.

use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};
use crate::instance::{Time, TsptwInstance};
use crate::memo::{MemoEntry, MemoStore, SetKey, TimedKey};
use crate::vertex_set::VertexSet;

/// Quantity minimized by a run
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Objective {
    /// Time of return to the depot
    Makespan,
    /// Sum of the travel times of the tour
    TravelTime,
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Objective::Makespan => write!(f, "makespan"),
            Objective::TravelTime => write!(f, "travel time"),
        }
    }
}

/// Represents a solution to the TSPTW
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a sequence of location indices (starting and ending at depot 0)
    pub tour: Vec<usize>,
    /// Objective that was optimized
    pub objective: Objective,
    /// Value of the optimized objective
    pub value: Time,
    /// Total travel time of the tour
    pub travel_time: Time,
    /// Return time at the depot
    pub makespan: Time,
    /// Whether the tour respects every time window when replayed
    pub feasible: bool,
    /// Algorithm that generated this solution
    pub algorithm: String,
}

impl Solution {
    /// Create a solution from a tour, replaying it to get both metrics.
    pub fn from_tour(instance: &TsptwInstance, tour: Vec<usize>, objective: Objective, algorithm: &str) -> Self {
        let schedule = instance.simulate(&tour);
        let value = match objective {
            Objective::Makespan => schedule.makespan,
            Objective::TravelTime => schedule.travel_time,
        };
        Solution {
            tour,
            objective,
            value,
            travel_time: schedule.travel_time,
            makespan: schedule.makespan,
            feasible: schedule.feasible,
            algorithm: algorithm.to_string(),
        }
    }

    /// Value of the metric that was not optimized.
    pub fn complementary(&self) -> Time {
        match self.objective {
            Objective::Makespan => self.travel_time,
            Objective::TravelTime => self.makespan,
        }
    }

    /// Check that every customer appears exactly once between two depot visits
    pub fn is_complete(&self, instance: &TsptwInstance) -> bool {
        if self.tour.len() != instance.dimension + 1 {
            return false;
        }
        if self.tour.first() != Some(&0) || self.tour.last() != Some(&0) {
            return false;
        }
        let inner = &self.tour[1..self.tour.len() - 1];
        let visited: VertexSet = inner.iter().copied().filter(|&c| c != 0).collect();
        visited == instance.customers() && inner.iter().all(|&c| c != 0)
    }

    /// Tour as space-separated indices.
    pub fn tour_string(&self) -> String {
        self.tour.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ")
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Tour: {}", self.tour_string())?;
        writeln!(f, "  Best {}: {}", self.objective, self.value)?;
        writeln!(f, "  Travel time: {}", self.travel_time)?;
        writeln!(f, "  Makespan: {}", self.makespan)?;
        writeln!(f, "  Feasible: {}", self.feasible)
    }
}

/// Rebuilds tours by following memoized predecessor links.
pub struct SolutionBuilder<'a> {
    instance: &'a TsptwInstance,
}

impl<'a> SolutionBuilder<'a> {
    pub fn new(instance: &'a TsptwInstance) -> Self {
        SolutionBuilder { instance }
    }

    /// Tour ending with `last`, reached at `arrival`, from the travel-time table.
    pub fn travel_time_tour(&self, memo: &MemoStore<TimedKey>, last: usize, arrival: Time) -> SolverResult<Vec<usize>> {
        self.walk(last, arrival, |i, t, s| memo.find(&TimedKey::new(i, t, s)))
    }

    /// Tour ending with `last` from the makespan table.
    pub fn makespan_tour(&self, memo: &MemoStore<SetKey>, last: usize) -> SolverResult<Vec<usize>> {
        self.walk(last, 0, |i, _, s| memo.find(&SetKey::new(i, s)))
    }

    fn walk<F>(&self, last: usize, arrival: Time, lookup: F) -> SolverResult<Vec<usize>>
    where
        F: Fn(usize, Time, VertexSet) -> SolverResult<Option<MemoEntry>>,
    {
        let mut reversed = Vec::with_capacity(self.instance.dimension + 1);
        reversed.push(0);
        reversed.push(last);

        let mut current = last;
        let mut time = arrival;
        let mut remaining = self.instance.customers().remove(last);

        // the set shrinks by one per step, so the walk cannot cycle
        while !remaining.is_empty() {
            let entry = lookup(current, time, remaining)?
                .ok_or(SolverError::BrokenChain { location: current })?;
            let pred = entry
                .predecessor
                .map(usize::from)
                .filter(|&p| remaining.contains(p))
                .ok_or(SolverError::BrokenChain { location: current })?;
            reversed.push(pred);
            remaining = remaining.remove(pred);
            current = pred;
            time = entry.predecessor_time;
        }

        reversed.push(0);
        reversed.reverse();
        Ok(reversed)
    }
}
