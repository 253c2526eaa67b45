//! Exact DP solver for the TSPTW.
//!
//! The solver tries every customer as the last stop before the return to the
//! depot, evaluates the recurrence of the chosen objective on the remaining
//! customers, keeps the best feasible completion and rebuilds its tour from
//! the memo table.

use std::time::Instant;
use serde::{Deserialize, Serialize};

use crate::dp::{MakespanRecurrence, TravelTimeRecurrence};
use crate::error::{SolverError, SolverResult};
use crate::instance::{Time, TsptwInstance};
use crate::memo::{MemoStats, MemoStore, SetKey, TimedKey, DEFAULT_TABLE_SIZE, INFEASIBLE};
use crate::solution::{Objective, Solution, SolutionBuilder};

/// DP solver configuration
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Objective to minimize
    pub objective: Objective,
    /// Number of slots of the memo table
    pub table_size: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            objective: Objective::TravelTime,
            table_size: DEFAULT_TABLE_SIZE,
        }
    }
}

/// Result of a DP run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpResult {
    /// Optimal tour, `None` when the instance is infeasible
    pub solution: Option<Solution>,
    /// Objective that was optimized
    pub objective: Objective,
    /// Memo table counters
    pub stats: MemoStats,
    /// Search time in seconds
    pub computation_time: f64,
}

impl DpResult {
    pub fn is_feasible(&self) -> bool {
        self.solution.is_some()
    }
}

impl std::fmt::Display for DpResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.solution {
            Some(sol) => {
                writeln!(f, "Solution = {}", sol.tour_string())?;
                let other = match self.objective {
                    Objective::Makespan => Objective::TravelTime,
                    Objective::TravelTime => Objective::Makespan,
                };
                write!(
                    f,
                    "Best {} = {}; {} = {}; CPU time = {:.3}s; Number of states = {}; Number of collisions = {}",
                    self.objective,
                    sol.value,
                    other,
                    sol.complementary(),
                    self.computation_time,
                    self.stats.states,
                    self.stats.collisions
                )
            }
            None => write!(
                f,
                "No feasible solution; CPU time = {:.3}s; Number of states = {}; Number of collisions = {}",
                self.computation_time, self.stats.states, self.stats.collisions
            ),
        }
    }
}

/// Best completion seen so far by the driver loop.
#[derive(Debug, Clone, Copy)]
struct Terminal {
    last: usize,
    arrival: Time,
    value: Time,
    makespan: Time,
}

/// Exact dynamic-programming solver
pub struct DpSolver {
    pub config: SolverConfig,
}

impl DpSolver {
    pub fn new(config: SolverConfig) -> Self {
        DpSolver { config }
    }

    /// Solve the instance for the configured objective.
    ///
    /// An infeasible instance is an `Ok` result without a solution; errors are
    /// reserved for runs that could not complete.
    pub fn solve(&self, instance: &TsptwInstance) -> SolverResult<DpResult> {
        if self.config.table_size == 0 {
            return Err(SolverError::InvalidConfig("memo table needs at least one slot".to_string()));
        }
        log::info!(
            "Solving {} (n={}) for {} with a table of {} slots",
            instance.name, instance.dimension, self.config.objective, self.config.table_size
        );
        let result = match self.config.objective {
            Objective::TravelTime => self.solve_travel_time(instance),
            Objective::Makespan => self.solve_makespan(instance),
        }?;
        log::info!(
            "Finished {}: feasible={}, states={}, collisions={}, time={:.3}s",
            instance.name,
            result.is_feasible(),
            result.stats.states,
            result.stats.collisions,
            result.computation_time
        );
        Ok(result)
    }

    fn solve_travel_time(&self, instance: &TsptwInstance) -> SolverResult<DpResult> {
        let start = Instant::now();
        let mut memo: MemoStore<TimedKey> = MemoStore::new(self.config.table_size, instance.dimension);
        let all = instance.customers();
        let latest_return = instance.window(0).latest;
        let mut best: Option<Terminal> = None;

        {
            let mut dp = TravelTimeRecurrence::new(instance, &mut memo);
            for j in (1..instance.dimension).rev() {
                let back = instance.travel_time(j, 0);
                let window = instance.window(j);
                let first = window.earliest.max(instance.depot_departure());
                for tj in first..=window.latest {
                    let d = dp.cost(j, tj, all.remove(j))?;
                    if d == INFEASIBLE {
                        continue;
                    }
                    let value = d + back;
                    let makespan = tj + instance.service_time(j) + back;
                    if makespan <= latest_return && best.map_or(true, |b| value < b.value) {
                        log::debug!("Last stop {} at {}: travel time {}", j, tj, value);
                        best = Some(Terminal { last: j, arrival: tj, value, makespan });
                    }
                }
            }
        }

        let computation_time = start.elapsed().as_secs_f64();
        let solution = match best {
            Some(b) => {
                let tour = SolutionBuilder::new(instance).travel_time_tour(&memo, b.last, b.arrival)?;
                let feasible = instance.simulate(&tour).feasible;
                Some(Solution {
                    tour,
                    objective: Objective::TravelTime,
                    value: b.value,
                    travel_time: b.value,
                    makespan: b.makespan,
                    feasible,
                    algorithm: "DP".to_string(),
                })
            }
            None => None,
        };

        Ok(DpResult {
            solution,
            objective: Objective::TravelTime,
            stats: memo.stats(),
            computation_time,
        })
    }

    fn solve_makespan(&self, instance: &TsptwInstance) -> SolverResult<DpResult> {
        let start = Instant::now();
        let mut memo: MemoStore<SetKey> = MemoStore::new(self.config.table_size, instance.dimension);
        let all = instance.customers();
        let latest_return = instance.window(0).latest;
        let mut best: Option<Terminal> = None;

        {
            let mut dp = MakespanRecurrence::new(instance, &mut memo);
            for j in (1..instance.dimension).rev() {
                let arrival = dp.arrival(j, all.remove(j))?;
                if arrival == INFEASIBLE {
                    continue;
                }
                let makespan = arrival + instance.service_time(j) + instance.travel_time(j, 0);
                if makespan <= latest_return && best.map_or(true, |b| makespan < b.value) {
                    log::debug!("Last stop {} at {}: makespan {}", j, arrival, makespan);
                    best = Some(Terminal { last: j, arrival, value: makespan, makespan });
                }
            }
        }

        let computation_time = start.elapsed().as_secs_f64();
        let solution = match best {
            Some(b) => {
                let tour = SolutionBuilder::new(instance).makespan_tour(&memo, b.last)?;
                let travel_time = instance.tour_travel_time(&tour);
                let feasible = instance.simulate(&tour).feasible;
                Some(Solution {
                    tour,
                    objective: Objective::Makespan,
                    value: b.value,
                    travel_time,
                    makespan: b.makespan,
                    feasible,
                    algorithm: "DP".to_string(),
                })
            }
            None => None,
        };

        Ok(DpResult {
            solution,
            objective: Objective::Makespan,
            stats: memo.stats(),
            computation_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brute_force::BruteForceSolver;
    use crate::instance::TimeWindow;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    const TEST_TABLE_SIZE: usize = 98_317;

    fn solver(objective: Objective) -> DpSolver {
        DpSolver::new(SolverConfig { objective, table_size: TEST_TABLE_SIZE })
    }

    fn triangle() -> TsptwInstance {
        let cost = vec![vec![0, 1, 4], vec![1, 0, 2], vec![4, 2, 0]];
        TsptwInstance::new("triangle", cost, vec![TimeWindow::new(0, 100); 3]).unwrap()
    }

    /// Generated instance whose windows are then redrawn at random, so some are infeasible.
    fn scrambled(dimension: usize, seed: u64) -> TsptwInstance {
        let mut inst = TsptwInstance::random(dimension, 30, seed).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
        for w in inst.windows.iter_mut().skip(1) {
            let earliest = rng.gen_range(0..120);
            *w = TimeWindow::new(earliest, earliest + rng.gen_range(5..40));
        }
        inst.windows[0] = TimeWindow::new(0, 250);
        inst
    }

    #[test]
    fn test_three_locations_travel_time() {
        let result = solver(Objective::TravelTime).solve(&triangle()).unwrap();
        let sol = result.solution.unwrap();
        assert_eq!(sol.tour, vec![0, 1, 2, 0]);
        assert_eq!(sol.value, 7);
        assert_eq!(sol.makespan, 7);
        assert!(sol.feasible);
    }

    #[test]
    fn test_three_locations_makespan() {
        let result = solver(Objective::Makespan).solve(&triangle()).unwrap();
        let sol = result.solution.unwrap();
        assert_eq!(sol.tour, vec![0, 1, 2, 0]);
        assert_eq!(sol.value, 7);
        assert_eq!(sol.travel_time, 7);
    }

    #[test]
    fn test_infeasible_single_stop() {
        let cost = vec![vec![0, 5], vec![5, 0]];
        let windows = vec![TimeWindow::new(10, 100), TimeWindow::new(0, 12)];
        let inst = TsptwInstance::new("late", cost, windows).unwrap();
        for objective in [Objective::TravelTime, Objective::Makespan] {
            let result = solver(objective).solve(&inst).unwrap();
            assert!(!result.is_feasible());
            assert!(result.to_string().starts_with("No feasible solution"));
        }
    }

    #[test]
    fn test_late_return_is_infeasible() {
        let cost = vec![vec![0, 5], vec![5, 0]];
        let windows = vec![TimeWindow::new(0, 9), TimeWindow::new(0, 50)];
        let inst = TsptwInstance::new("return", cost, windows).unwrap();
        for objective in [Objective::TravelTime, Objective::Makespan] {
            assert!(!solver(objective).solve(&inst).unwrap().is_feasible());
        }
    }

    #[test]
    fn test_windows_force_order() {
        // 2 must be served first even though 1 is closer
        let cost = vec![vec![0, 1, 3], vec![1, 0, 3], vec![3, 3, 0]];
        let windows = vec![
            TimeWindow::new(0, 100),
            TimeWindow::new(10, 20),
            TimeWindow::new(0, 5),
        ];
        let inst = TsptwInstance::new("forced", cost, windows).unwrap();
        for objective in [Objective::TravelTime, Objective::Makespan] {
            let sol = solver(objective).solve(&inst).unwrap().solution.unwrap();
            assert_eq!(sol.tour, vec![0, 2, 1, 0]);
            assert_eq!(sol.travel_time, 7);
            assert_eq!(sol.makespan, 11);
        }
    }

    #[test]
    fn test_service_times() {
        let cost = vec![vec![0, 2, 2], vec![2, 0, 2], vec![2, 2, 0]];
        let inst = TsptwInstance::new("service", cost, vec![TimeWindow::new(0, 100); 3])
            .unwrap()
            .with_service_times(vec![1, 5, 0])
            .unwrap();
        let sol = solver(Objective::Makespan).solve(&inst).unwrap().solution.unwrap();
        // leave at 1, serve both customers (5 + 0), three legs of 2
        assert_eq!(sol.value, 12);
        assert_eq!(inst.simulate(&sol.tour).makespan, 12);
    }

    #[test]
    fn test_deterministic() {
        let inst = TsptwInstance::random(8, 25, 11).unwrap();
        for objective in [Objective::TravelTime, Objective::Makespan] {
            let a = solver(objective).solve(&inst).unwrap();
            let b = solver(objective).solve(&inst).unwrap();
            let (sa, sb) = (a.solution.unwrap(), b.solution.unwrap());
            assert_eq!(sa.tour, sb.tour);
            assert_eq!(sa.value, sb.value);
            assert_eq!(a.stats, b.stats);
        }
    }

    #[test]
    fn test_generated_instances_solved_soundly() {
        for seed in 0..6 {
            let inst = TsptwInstance::random(9, 20, seed).unwrap();
            for objective in [Objective::TravelTime, Objective::Makespan] {
                let result = solver(objective).solve(&inst).unwrap();
                let sol = result.solution.expect("generated instances are feasible");
                assert!(sol.is_complete(&inst));
                assert!(sol.feasible);

                let schedule = inst.simulate(&sol.tour);
                assert!(schedule.feasible);
                for (k, &c) in sol.tour[1..sol.tour.len() - 1].iter().enumerate() {
                    assert!(schedule.arrivals[k] <= inst.window(c).latest);
                }
                assert_eq!(schedule.travel_time, sol.travel_time);
                assert_eq!(schedule.makespan, sol.makespan);
                if objective == Objective::Makespan {
                    assert_eq!(schedule.makespan, sol.value);
                }
                assert!(result.stats.states > 0);
            }
        }
    }

    #[test]
    fn test_matches_brute_force() {
        for dimension in 3..=8 {
            for seed in 0..5 {
                let inst = scrambled(dimension, seed * 31 + dimension as u64);
                for objective in [Objective::TravelTime, Objective::Makespan] {
                    let dp = solver(objective).solve(&inst).unwrap().solution;
                    let bf = BruteForceSolver::new(objective).solve(&inst).unwrap();
                    match (dp, bf) {
                        (Some(dp), Some(bf)) => {
                            assert_eq!(dp.value, bf.value, "{} on {}", objective, inst.name);
                            assert!(dp.feasible);
                        }
                        (None, None) => {}
                        (dp, bf) => panic!(
                            "{} on {}: dp feasible={} brute force feasible={}",
                            objective,
                            inst.name,
                            dp.is_some(),
                            bf.is_some()
                        ),
                    }
                }
            }
        }
    }

    #[test]
    fn test_zero_table_size_is_error() {
        for objective in [Objective::TravelTime, Objective::Makespan] {
            let solver = DpSolver::new(SolverConfig { objective, table_size: 0 });
            let err = solver.solve(&triangle()).unwrap_err();
            assert!(matches!(err, SolverError::InvalidConfig(_)));
        }
    }

    #[test]
    fn test_table_full_aborts() {
        let n = 8;
        let cost = vec![vec![1; n]; n];
        let inst = TsptwInstance::new("wide", cost, vec![TimeWindow::new(0, 1000); n]).unwrap();
        let solver = DpSolver::new(SolverConfig { objective: Objective::Makespan, table_size: 53 });
        let err = solver.solve(&inst).unwrap_err();
        assert!(matches!(err, SolverError::TableFull { size: 53, .. }));
    }
}
