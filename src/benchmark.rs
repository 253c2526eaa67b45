//! Benchmarking module for the TSPTW DP solver.
//!
//! Runs the solver over a set of instances, collects per-instance
//! statistics and exports them as CSV or a text report.

use crate::instance::{Time, TsptwInstance};
use crate::memo::DEFAULT_TABLE_SIZE;
use crate::solution::Objective;
use crate::solver::{DpSolver, SolverConfig};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Result of solving a single instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// Instance name
    pub instance: String,
    /// Instance dimension
    pub dimension: usize,
    /// Objective that was optimized
    pub objective: Objective,
    /// Whether a feasible tour was found
    pub feasible: bool,
    /// Optimal objective value
    pub value: Option<Time>,
    /// Value of the other metric on the optimal tour
    pub complementary: Option<Time>,
    /// Distinct states memoized
    pub states: u64,
    /// Probe steps spent on collisions
    pub collisions: u64,
    /// Search time in seconds
    pub time: f64,
    /// Error that aborted the run, if any
    pub error: Option<String>,
}

/// Aggregated figures over all records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub instances: usize,
    pub feasible: usize,
    pub infeasible: usize,
    pub failed: usize,
    pub avg_time: f64,
    pub max_time: f64,
    pub avg_states: f64,
    pub total_collisions: u64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Objective to minimize
    pub objective: Objective,
    /// Memo table slots per run
    pub table_size: usize,
    /// Solve instances concurrently. Each worker thread allocates its own
    /// memo table of `table_size` slots (about 64 bytes per slot for the
    /// travel-time objective), so lower `table_size` when enabling this.
    pub parallel: bool,
    /// Output directory
    pub output_dir: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            objective: Objective::TravelTime,
            table_size: DEFAULT_TABLE_SIZE,
            parallel: false,
            output_dir: "results".to_string(),
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    records: Vec<BenchmarkRecord>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            records: Vec::new(),
        }
    }

    /// Solve one instance and turn the outcome into a record.
    pub fn run_instance(&self, instance: &TsptwInstance) -> BenchmarkRecord {
        let solver = DpSolver::new(SolverConfig {
            objective: self.config.objective,
            table_size: self.config.table_size,
        });

        let mut record = BenchmarkRecord {
            instance: instance.name.clone(),
            dimension: instance.dimension,
            objective: self.config.objective,
            feasible: false,
            value: None,
            complementary: None,
            states: 0,
            collisions: 0,
            time: 0.0,
            error: None,
        };

        match solver.solve(instance) {
            Ok(result) => {
                record.states = result.stats.states;
                record.collisions = result.stats.collisions;
                record.time = result.computation_time;
                if let Some(sol) = &result.solution {
                    record.feasible = true;
                    record.value = Some(sol.value);
                    record.complementary = Some(sol.complementary());
                }
            }
            Err(e) => {
                log::error!("Solver failed on {}: {}", instance.name, e);
                record.error = Some(e.to_string());
            }
        }

        record
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[TsptwInstance]) {
        let progress = ProgressBar::new(instances.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let records: Vec<BenchmarkRecord> = if self.config.parallel {
            instances
                .par_iter()
                .map(|instance| {
                    let record = self.run_instance(instance);
                    progress.inc(1);
                    record
                })
                .collect()
        } else {
            instances
                .iter()
                .map(|instance| {
                    progress.set_message(instance.name.clone());
                    let record = self.run_instance(instance);
                    progress.inc(1);
                    record
                })
                .collect()
        };

        progress.finish_with_message("done");
        self.records.extend(records);
    }

    /// Aggregate the collected records
    pub fn summary(&self) -> BenchmarkSummary {
        let solved: Vec<&BenchmarkRecord> = self.records.iter().filter(|r| r.error.is_none()).collect();
        let feasible = solved.iter().filter(|r| r.feasible).count();
        let times: Vec<f64> = solved.iter().map(|r| r.time).collect();

        fn avg(values: &[f64]) -> f64 {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        }
        let states: Vec<f64> = solved.iter().map(|r| r.states as f64).collect();

        BenchmarkSummary {
            instances: self.records.len(),
            feasible,
            infeasible: solved.len() - feasible,
            failed: self.records.len() - solved.len(),
            avg_time: avg(&times),
            max_time: times.iter().cloned().fold(0.0, f64::max),
            avg_states: avg(&states),
            total_collisions: solved.iter().map(|r| r.collisions).sum(),
        }
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for record in &self.records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("       TSPTW DP Benchmark Report\n");
        report.push_str("========================================\n\n");

        let summary = self.summary();
        report.push_str(&format!("Objective: {}\n", self.config.objective));
        report.push_str(&format!("Table size: {}\n", self.config.table_size));
        report.push_str(&format!(
            "Instances: {} (feasible {}, infeasible {}, failed {})\n",
            summary.instances, summary.feasible, summary.infeasible, summary.failed
        ));
        report.push_str(&format!(
            "Time: avg {:.4}s, max {:.4}s; avg states {:.0}; collisions {}\n\n",
            summary.avg_time, summary.max_time, summary.avg_states, summary.total_collisions
        ));

        report.push_str(&format!(
            "{:<25} {:>5} {:>10} {:>10} {:>12} {:>12} {:>10}\n",
            "Instance", "n", "Value", "Other", "States", "Collisions", "Time"
        ));
        report.push_str("-".repeat(90).as_str());
        report.push('\n');

        for r in &self.records {
            let value = match (&r.error, r.value) {
                (Some(_), _) => "error".to_string(),
                (None, Some(v)) => v.to_string(),
                (None, None) => "infeas.".to_string(),
            };
            let other = r.complementary.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
            report.push_str(&format!(
                "{:<25} {:>5} {:>10} {:>10} {:>12} {:>12} {:>10.4}\n",
                r.instance, r.dimension, value, other, r.states, r.collisions, r.time
            ));
        }

        report
    }

    /// Get all results
    pub fn records(&self) -> &[BenchmarkRecord] {
        &self.records
    }
}

/// Helper function to load instances from a directory
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Vec<TsptwInstance> {
    let mut instances = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "txt").unwrap_or(false) {
                match TsptwInstance::from_file(&path) {
                    Ok(instance) => instances.push(instance),
                    Err(e) => log::warn!("Skipping {:?}: {}", path, e),
                }
            }
        }
    }

    // Sort by dimension, then name for a stable order
    instances.sort_by(|a, b| a.dimension.cmp(&b.dimension).then_with(|| a.name.cmp(&b.name)));

    instances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::TimeWindow;

    fn config(parallel: bool) -> BenchmarkConfig {
        BenchmarkConfig {
            objective: Objective::Makespan,
            table_size: 98_317,
            parallel,
            ..Default::default()
        }
    }

    fn instances() -> Vec<TsptwInstance> {
        let infeasible = TsptwInstance::new(
            "late",
            vec![vec![0, 5], vec![5, 0]],
            vec![TimeWindow::new(10, 100), TimeWindow::new(0, 12)],
        )
        .unwrap();
        vec![
            TsptwInstance::random(6, 20, 1).unwrap(),
            TsptwInstance::random(7, 20, 2).unwrap(),
            infeasible,
        ]
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.table_size, DEFAULT_TABLE_SIZE);
        assert!(!config.parallel);
    }

    #[test]
    fn test_run_and_summarize() {
        let mut bench = Benchmark::new(config(false));
        bench.run_on_instances(&instances());

        let summary = bench.summary();
        assert_eq!(summary.instances, 3);
        assert_eq!(summary.feasible, 2);
        assert_eq!(summary.infeasible, 1);
        assert_eq!(summary.failed, 0);

        let report = bench.generate_report();
        assert!(report.contains("infeas."));
        assert!(report.contains("late"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut seq = Benchmark::new(config(false));
        let mut par = Benchmark::new(config(true));
        seq.run_on_instances(&instances());
        par.run_on_instances(&instances());

        for (a, b) in seq.records().iter().zip(par.records()) {
            assert_eq!(a.instance, b.instance);
            assert_eq!(a.value, b.value);
            assert_eq!(a.states, b.states);
        }
    }

    #[test]
    fn test_zero_table_size_recorded_in_parallel() {
        let mut bench = Benchmark::new(BenchmarkConfig {
            table_size: 0,
            ..config(true)
        });
        bench.run_on_instances(&instances());
        assert_eq!(bench.summary().failed, 3);
        assert!(bench
            .records()
            .iter()
            .all(|r| r.error.as_deref().map_or(false, |e| e.contains("at least one slot"))));
    }

    #[test]
    fn test_failure_recorded() {
        let mut bench = Benchmark::new(BenchmarkConfig {
            table_size: 5,
            ..config(false)
        });
        bench.run_on_instances(&[TsptwInstance::random(8, 200, 3).unwrap()]);
        let record = &bench.records()[0];
        assert!(record.error.is_some());
        assert_eq!(bench.summary().failed, 1);
    }
}
