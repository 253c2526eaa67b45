//! TSPTW DP Solver Library
//!
//! An exact solver for the Traveling Salesman Problem with Time Windows (TSPTW).
//!
//! # Features
//!
//! - Dynamic programming over subsets of visited customers, minimizing either
//!   the makespan (return time at the depot) or the total travel time
//! - Open-addressing memo table over 128-bit state keys, with tour
//!   reconstruction from stored predecessors
//! - Exhaustive permutation search for cross-checking small instances
//! - Random instance generation and benchmarking tools
//!
//! # Example
//!
//! ```no_run
//! use tsptw_dp_solver::instance::TsptwInstance;
//! use tsptw_dp_solver::solution::Objective;
//! use tsptw_dp_solver::solver::{DpSolver, SolverConfig};
//!
//! // Load instance
//! let instance = TsptwInstance::from_file("n20w60.001.txt").unwrap();
//!
//! // Minimize the travel time
//! let solver = DpSolver::new(SolverConfig {
//!     objective: Objective::TravelTime,
//!     ..Default::default()
//! });
//! let result = solver.solve(&instance).unwrap();
//!
//! println!("{}", result);
//! ```

pub mod error;
pub mod vertex_set;
pub mod instance;
pub mod memo;
pub mod dp;
pub mod solution;
pub mod solver;
pub mod brute_force;
pub mod benchmark;

pub use error::{SolverError, SolverResult};
pub use instance::TsptwInstance;
pub use solution::{Objective, Solution};
pub use solver::{DpSolver, SolverConfig};
