//! Exhaustive search over customer orders.
//!
//! Depth-first enumeration of every permutation, simulated forward from the
//! depot. A branch is cut as soon as a window is missed, which never loses a
//! feasible tour. Orders are tried lexicographically and only a strictly
//! better tour replaces the incumbent. Meant for small instances and for
//! checking the DP.

use crate::error::{SolverError, SolverResult};
use crate::instance::{Time, TsptwInstance};
use crate::solution::{Objective, Solution};
use crate::vertex_set::VertexSet;

/// Exhaustive permutation solver
pub struct BruteForceSolver {
    pub objective: Objective,
    /// Largest number of customers accepted
    pub max_customers: usize,
}

struct Search<'a> {
    instance: &'a TsptwInstance,
    objective: Objective,
    path: Vec<usize>,
    best: Option<(Time, Vec<usize>)>,
    leaves: u64,
}

impl BruteForceSolver {
    pub fn new(objective: Objective) -> Self {
        BruteForceSolver {
            objective,
            max_customers: 10,
        }
    }

    /// Best feasible tour, or `None` if no order respects every window.
    pub fn solve(&self, instance: &TsptwInstance) -> SolverResult<Option<Solution>> {
        if instance.num_customers() > self.max_customers {
            return Err(SolverError::InvalidInstance(format!(
                "brute force is limited to {} customers, instance has {}",
                self.max_customers,
                instance.num_customers()
            )));
        }

        let mut search = Search {
            instance,
            objective: self.objective,
            path: Vec::with_capacity(instance.dimension + 1),
            best: None,
            leaves: 0,
        };
        search.path.push(0);
        search.dfs(instance.customers(), 0, instance.depot_departure(), 0);
        log::debug!("Brute force on {} evaluated {} complete orders", instance.name, search.leaves);

        Ok(search.best.map(|(_, tour)| {
            Solution::from_tour(instance, tour, self.objective, "BruteForce")
        }))
    }
}

impl<'a> Search<'a> {
    fn dfs(&mut self, remaining: VertexSet, prev: usize, ready: Time, travel: Time) {
        let inst = self.instance;

        if remaining.is_empty() {
            self.leaves += 1;
            let back = inst.travel_time(prev, 0);
            let makespan = ready + back;
            if makespan > inst.window(0).latest {
                return;
            }
            let value = match self.objective {
                Objective::Makespan => makespan,
                Objective::TravelTime => travel + back,
            };
            if self.best.as_ref().map_or(true, |(b, _)| value < *b) {
                let mut tour = self.path.clone();
                tour.push(0);
                self.best = Some((value, tour));
            }
            return;
        }

        for next in remaining {
            let leg = inst.travel_time(prev, next);
            let window = inst.window(next);
            let arrival = (ready + leg).max(window.earliest);
            if arrival > window.latest {
                continue;
            }
            self.path.push(next);
            self.dfs(remaining.remove(next), next, arrival + inst.service_time(next), travel + leg);
            self.path.pop();
        }
    }
}
