//! Module for parsing and representing TSPTW instances.
//!
//! An instance file is a stream of whitespace-separated integers: the number of
//! locations `n`, the `n x n` travel-time matrix in row-major order, then one
//! `(earliest, latest)` pair per location. Location 0 is the depot; its window
//! bounds the departure and the return. Service times are not part of the file
//! and default to zero.

use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};
use crate::vertex_set::VertexSet;

/// Integer time and cost unit used throughout the solver.
pub type Time = i64;

/// Time window of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Earliest service start (earliest departure for the depot)
    pub earliest: Time,
    /// Latest service start (latest return for the depot)
    pub latest: Time,
}

impl TimeWindow {
    pub fn new(earliest: Time, latest: Time) -> Self {
        TimeWindow { earliest, latest }
    }

    #[inline]
    pub fn contains(&self, t: Time) -> bool {
        t >= self.earliest && t <= self.latest
    }

    #[inline]
    pub fn width(&self) -> Time {
        self.latest - self.earliest
    }
}

/// Represents a complete TSPTW instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsptwInstance {
    /// Name of the instance
    pub name: String,
    /// Number of locations (including depot)
    pub dimension: usize,
    /// Travel-time matrix, `cost[i][j]` is the time to go from `i` to `j`
    pub cost: Vec<Vec<Time>>,
    /// Time window per location
    pub windows: Vec<TimeWindow>,
    /// Service duration per location
    pub service: Vec<Time>,
}

/// Forward simulation of a tour with waiting at early arrivals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Service start at each customer, in tour order
    pub arrivals: Vec<Time>,
    /// Sum of the travel times of every leg, including the return
    pub travel_time: Time,
    /// Time of return to the depot
    pub makespan: Time,
    /// Every window (and the depot's latest return) is respected
    pub feasible: bool,
    /// Every customer is visited exactly once
    pub complete: bool,
}

impl TsptwInstance {
    /// Build an instance from a travel-time matrix and windows, with zero service times.
    pub fn new(name: &str, cost: Vec<Vec<Time>>, windows: Vec<TimeWindow>) -> SolverResult<Self> {
        let dimension = cost.len();
        if dimension < 2 {
            return Err(SolverError::InvalidInstance(
                "an instance needs the depot and at least one customer".to_string(),
            ));
        }
        if dimension - 1 > VertexSet::CAPACITY {
            return Err(SolverError::TooManyLocations {
                customers: dimension - 1,
                capacity: VertexSet::CAPACITY,
            });
        }
        if let Some(i) = cost.iter().position(|row| row.len() != dimension) {
            return Err(SolverError::InvalidInstance(format!(
                "row {} of the cost matrix has {} entries, expected {}",
                i, cost[i].len(), dimension
            )));
        }
        if windows.len() != dimension {
            return Err(SolverError::InvalidInstance(format!(
                "{} time windows for {} locations",
                windows.len(), dimension
            )));
        }
        for (i, row) in cost.iter().enumerate() {
            if let Some(j) = row.iter().position(|&c| c < 0) {
                return Err(SolverError::InvalidInstance(format!(
                    "negative travel time {} from {} to {}",
                    row[j], i, j
                )));
            }
        }
        for (i, w) in windows.iter().enumerate() {
            if w.earliest > w.latest {
                log::warn!("Location {} has an empty time window [{}, {}]", i, w.earliest, w.latest);
            }
        }

        Ok(TsptwInstance {
            name: name.to_string(),
            dimension,
            cost,
            windows,
            service: vec![0; dimension],
        })
    }

    /// Replace the service durations (one per location, depot included).
    pub fn with_service_times(mut self, service: Vec<Time>) -> SolverResult<Self> {
        if service.len() != self.dimension {
            return Err(SolverError::InvalidInstance(format!(
                "{} service times for {} locations",
                service.len(), self.dimension
            )));
        }
        if service.iter().any(|&s| s < 0) {
            return Err(SolverError::InvalidInstance("negative service time".to_string()));
        }
        self.service = service;
        Ok(self)
    }

    /// Parse an instance file; the file stem becomes the instance name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let instance = Self::parse(&name, &content)?;
        log::info!("Loaded {} from {:?} ({} locations)", instance.name, path, instance.dimension);
        Ok(instance)
    }

    /// Parse the whitespace-separated text format.
    pub fn parse(name: &str, content: &str) -> SolverResult<Self> {
        let mut tokens = content.split_whitespace();
        let mut next = |what: &str| -> SolverResult<Time> {
            let token = tokens
                .next()
                .ok_or_else(|| SolverError::InvalidInstance(format!("unexpected end of input, expected {}", what)))?;
            token
                .parse::<Time>()
                .map_err(|_| SolverError::InvalidInstance(format!("invalid {} '{}'", what, token)))
        };

        let dimension = next("vertex count")?;
        if dimension < 0 {
            return Err(SolverError::InvalidInstance(format!("invalid vertex count {}", dimension)));
        }
        let dimension = dimension as usize;
        // reject before reading an n x n matrix we cannot use anyway
        if dimension > VertexSet::CAPACITY + 1 {
            return Err(SolverError::TooManyLocations {
                customers: dimension - 1,
                capacity: VertexSet::CAPACITY,
            });
        }

        let mut cost = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            let mut row = Vec::with_capacity(dimension);
            for _ in 0..dimension {
                row.push(next("travel time")?);
            }
            cost.push(row);
        }

        let mut windows = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            let earliest = next("window start")?;
            let latest = next("window end")?;
            windows.push(TimeWindow::new(earliest, latest));
        }

        Self::new(name, cost, windows)
    }

    /// Get the travel time between two locations
    #[inline]
    pub fn travel_time(&self, i: usize, j: usize) -> Time {
        self.cost[i][j]
    }

    #[inline]
    pub fn window(&self, i: usize) -> TimeWindow {
        self.windows[i]
    }

    #[inline]
    pub fn service_time(&self, i: usize) -> Time {
        self.service[i]
    }

    /// Earliest moment the vehicle can leave the depot.
    #[inline]
    pub fn depot_departure(&self) -> Time {
        self.windows[0].earliest + self.service[0]
    }

    /// Get the number of customer nodes (excluding depot)
    pub fn num_customers(&self) -> usize {
        self.dimension - 1
    }

    /// Set of every customer.
    pub fn customers(&self) -> VertexSet {
        VertexSet::full(self.dimension)
    }

    /// Simulate a tour forward from the depot.
    ///
    /// The tour must start at the depot; a trailing depot is optional. The
    /// vehicle waits at a customer reached before its window opens.
    pub fn simulate(&self, tour: &[usize]) -> Schedule {
        let stops: &[usize] = match tour {
            [0, rest @ .., 0] => rest,
            [0, rest @ ..] => rest,
            _ => {
                return Schedule {
                    arrivals: Vec::new(),
                    travel_time: 0,
                    makespan: 0,
                    feasible: false,
                    complete: false,
                }
            }
        };

        let mut seen = VertexSet::empty();
        let mut complete = stops.len() == self.num_customers();
        let mut feasible = true;
        let mut arrivals = Vec::with_capacity(stops.len());
        let mut travel_time = 0;
        let mut time = self.depot_departure();
        let mut prev = 0;

        for &c in stops {
            if c == 0 || c >= self.dimension || seen.contains(c) {
                complete = false;
                feasible = false;
                break;
            }
            seen = seen.insert(c);

            let leg = self.travel_time(prev, c);
            travel_time += leg;
            time = (time + leg).max(self.windows[c].earliest);
            if !self.windows[c].contains(time) {
                feasible = false;
            }
            arrivals.push(time);
            time += self.service[c];
            prev = c;
        }

        let leg = self.travel_time(prev, 0);
        travel_time += leg;
        time += leg;
        if time > self.windows[0].latest {
            feasible = false;
        }

        Schedule {
            arrivals,
            travel_time,
            makespan: time,
            feasible: feasible && complete,
            complete,
        }
    }

    /// Calculate total tour travel time
    pub fn tour_travel_time(&self, tour: &[usize]) -> Time {
        tour.windows(2).map(|leg| self.travel_time(leg[0], leg[1])).sum()
    }

    /// Generate a random instance that is feasible by construction.
    ///
    /// Locations get integer coordinates in a 50x50 square and travel times
    /// are the Euclidean distances rounded up, which keeps the triangle
    /// inequality. Windows of the given width are placed around the arrival
    /// times of a random reference tour. Deterministic via seed.
    pub fn random(dimension: usize, width: Time, seed: u64) -> SolverResult<Self> {
        use rand::prelude::*;
        use rand_chacha::ChaCha8Rng;

        if width < 0 {
            return Err(SolverError::InvalidInstance(format!("negative window width {}", width)));
        }
        if dimension < 2 {
            return Err(SolverError::InvalidInstance(
                "an instance needs the depot and at least one customer".to_string(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let coords: Vec<(i64, i64)> = (0..dimension)
            .map(|_| (rng.gen_range(0..50), rng.gen_range(0..50)))
            .collect();
        let mut cost = vec![vec![0; dimension]; dimension];
        for i in 0..dimension {
            for j in 0..dimension {
                if i != j {
                    let dx = (coords[i].0 - coords[j].0) as f64;
                    let dy = (coords[i].1 - coords[j].1) as f64;
                    cost[i][j] = (dx * dx + dy * dy).sqrt().ceil() as Time;
                }
            }
        }

        let mut order: Vec<usize> = (1..dimension).collect();
        order.shuffle(&mut rng);

        let mut windows = vec![TimeWindow::new(0, 0); dimension];
        let mut time = 0;
        let mut prev = 0;
        for &c in &order {
            time += cost[prev][c];
            let earliest = (time - rng.gen_range(0..=width)).max(0);
            windows[c] = TimeWindow::new(earliest, earliest + width);
            prev = c;
        }
        time += cost[prev][0];
        windows[0] = TimeWindow::new(0, time + width);

        let name = format!("random_n{}_w{}_s{}", dimension, width, seed);
        Self::new(&name, cost, windows)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let widths: Vec<Time> = self.windows.iter().skip(1).map(|w| w.width()).collect();
        let avg_window = widths.iter().sum::<Time>() as f64 / widths.len() as f64;
        let min_window = widths.iter().copied().min().unwrap_or(0);
        let max_window = widths.iter().copied().max().unwrap_or(0);

        let mut travel: Vec<Time> = Vec::new();
        for i in 0..self.dimension {
            for j in 0..self.dimension {
                if i != j {
                    travel.push(self.travel_time(i, j));
                }
            }
        }
        let avg_travel = travel.iter().sum::<Time>() as f64 / travel.len() as f64;
        let max_travel = travel.iter().copied().max().unwrap_or(0);

        let symmetric = (0..self.dimension)
            .all(|i| (0..i).all(|j| self.cost[i][j] == self.cost[j][i]));

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension,
            horizon: self.windows[0].latest,
            avg_window,
            min_window,
            max_window,
            avg_travel,
            max_travel,
            symmetric,
        }
    }
}

/// Writes the instance back in the input format.
impl std::fmt::Display for TsptwInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.dimension)?;
        for row in &self.cost {
            let line: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        for w in &self.windows {
            writeln!(f, "{} {}", w.earliest, w.latest)?;
        }
        Ok(())
    }
}

/// Statistics about a TSPTW instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub horizon: Time,
    pub avg_window: f64,
    pub min_window: Time,
    pub max_window: Time,
    pub avg_travel: f64,
    pub max_travel: Time,
    pub symmetric: bool,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Locations: {} (1 depot + {} customers)", self.dimension, self.dimension - 1)?;
        writeln!(f, "  Horizon (latest return): {}", self.horizon)?;
        writeln!(f, "  Window width: avg {:.2}, min {}, max {}", self.avg_window, self.min_window, self.max_window)?;
        writeln!(f, "  Avg travel time: {:.2}", self.avg_travel)?;
        writeln!(f, "  Max travel time: {}", self.max_travel)?;
        writeln!(f, "  Symmetric: {}", self.symmetric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "3
        0 1 4
        1 0 2
        4 2 0
        0 100
        0 100
        0 100";

    #[test]
    fn test_parse() {
        let inst = TsptwInstance::parse("small", SMALL).unwrap();
        assert_eq!(inst.dimension, 3);
        assert_eq!(inst.travel_time(0, 2), 4);
        assert_eq!(inst.travel_time(2, 1), 2);
        assert_eq!(inst.window(1), TimeWindow::new(0, 100));
        assert_eq!(inst.service, vec![0, 0, 0]);
        assert_eq!(inst.customers().len(), 2);
    }

    #[test]
    fn test_parse_truncated() {
        let err = TsptwInstance::parse("bad", "3 0 1 4 1 0").unwrap_err();
        assert!(matches!(err, SolverError::InvalidInstance(_)));
    }

    #[test]
    fn test_parse_garbage_token() {
        let err = TsptwInstance::parse("bad", "2 0 x 1 0 0 10 0 10").unwrap_err();
        assert!(matches!(err, SolverError::InvalidInstance(_)));
    }

    #[test]
    fn test_too_many_locations() {
        let err = TsptwInstance::parse("big", "129").unwrap_err();
        assert!(matches!(err, SolverError::TooManyLocations { customers: 128, capacity: 127 }));

        let n = 129;
        let cost = vec![vec![1; n]; n];
        let windows = vec![TimeWindow::new(0, 1000); n];
        let err = TsptwInstance::new("big", cost, windows).unwrap_err();
        assert!(matches!(err, SolverError::TooManyLocations { .. }));
    }

    #[test]
    fn test_capacity_limit_accepted() {
        let n = 128;
        let cost = vec![vec![1; n]; n];
        let windows = vec![TimeWindow::new(0, 1000); n];
        let inst = TsptwInstance::new("max", cost, windows).unwrap();
        assert_eq!(inst.customers().len(), 127);
    }

    #[test]
    fn test_negative_cost_rejected() {
        let cost = vec![vec![0, -1], vec![1, 0]];
        let windows = vec![TimeWindow::new(0, 10); 2];
        assert!(TsptwInstance::new("neg", cost, windows).is_err());
    }

    #[test]
    fn test_simulate_waits_and_checks_windows() {
        let cost = vec![vec![0, 2, 5], vec![2, 0, 3], vec![5, 3, 0]];
        let windows = vec![
            TimeWindow::new(0, 30),
            TimeWindow::new(6, 8),
            TimeWindow::new(0, 10),
        ];
        let inst = TsptwInstance::new("sim", cost, windows).unwrap();

        let s = inst.simulate(&[0, 1, 2, 0]);
        assert_eq!(s.arrivals, vec![6, 9]);
        assert_eq!(s.travel_time, 10);
        assert_eq!(s.makespan, 14);
        assert!(s.feasible);
        assert!(s.complete);

        // 2 first: reach 1 at 8, still inside its window
        let s = inst.simulate(&[0, 2, 1]);
        assert_eq!(s.arrivals, vec![5, 8]);
        assert!(s.feasible);

        let s = inst.simulate(&[0, 1, 0]);
        assert!(!s.complete);
        assert!(!s.feasible);
    }

    #[test]
    fn test_simulate_late_customer() {
        let cost = vec![vec![0, 2, 5], vec![2, 0, 3], vec![5, 3, 0]];
        let windows = vec![
            TimeWindow::new(0, 30),
            TimeWindow::new(6, 7),
            TimeWindow::new(0, 10),
        ];
        let inst = TsptwInstance::new("sim", cost, windows).unwrap();

        // 2 first reaches 1 at 8, one past its window
        let s = inst.simulate(&[0, 2, 1, 0]);
        assert_eq!(s.arrivals, vec![5, 8]);
        assert!(s.complete);
        assert!(!s.feasible);
        assert!(inst.simulate(&[0, 1, 2, 0]).feasible);
    }

    #[test]
    fn test_simulate_late_return() {
        let cost = vec![vec![0, 10], vec![10, 0]];
        let windows = vec![TimeWindow::new(0, 15), TimeWindow::new(0, 100)];
        let inst = TsptwInstance::new("late", cost, windows).unwrap();
        let s = inst.simulate(&[0, 1, 0]);
        assert_eq!(s.makespan, 20);
        assert!(!s.feasible);
    }

    #[test]
    fn test_display_parses_back() {
        let inst = TsptwInstance::random(6, 20, 7).unwrap();
        let again = TsptwInstance::parse(&inst.name, &inst.to_string()).unwrap();
        assert_eq!(again.cost, inst.cost);
        assert_eq!(again.windows, inst.windows);
    }

    #[test]
    fn test_random_is_deterministic() {
        let a = TsptwInstance::random(8, 15, 42).unwrap();
        let b = TsptwInstance::random(8, 15, 42).unwrap();
        assert_eq!(a.cost, b.cost);
        assert_eq!(a.windows, b.windows);
        assert!(a.windows.iter().all(|w| w.earliest >= 0 && w.width() >= 0));
    }

    #[test]
    fn test_statistics() {
        let inst = TsptwInstance::parse("small", SMALL).unwrap();
        let stats = inst.statistics();
        assert_eq!(stats.horizon, 100);
        assert_eq!(stats.max_travel, 4);
        assert!(stats.symmetric);
        assert!((stats.avg_window - 100.0).abs() < 1e-10);
    }
}
