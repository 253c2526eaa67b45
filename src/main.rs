//! TSPTW DP Solver - Command Line Interface
//!
//! Exact dynamic-programming solver for the Traveling Salesman Problem with Time Windows.

use clap::{Parser, Subcommand, ValueEnum};
use tsptw_dp_solver::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use tsptw_dp_solver::brute_force::BruteForceSolver;
use tsptw_dp_solver::instance::TsptwInstance;
use tsptw_dp_solver::memo::DEFAULT_TABLE_SIZE;
use tsptw_dp_solver::solution::Objective;
use tsptw_dp_solver::solver::{DpSolver, SolverConfig};
use tsptw_dp_solver::SolverError;

use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "tsptw-dp-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "An exact dynamic-programming solver for the TSP with time windows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a single instance
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        /// Objective to minimize
        #[arg(long, value_enum, default_value = "travel-time")]
        objective: ObjectiveArg,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "dp")]
        algorithm: Algorithm,

        /// Number of slots of the memo table (a prime works best)
        #[arg(long, default_value_t = DEFAULT_TABLE_SIZE)]
        table_size: usize,

        /// Output solution to file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run the solver on a directory of instances
    Benchmark {
        /// Directory containing instance files (*.txt)
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Objective to minimize
        #[arg(long, value_enum, default_value = "travel-time")]
        objective: ObjectiveArg,

        /// Number of slots of the memo table, per instance
        #[arg(long, default_value_t = DEFAULT_TABLE_SIZE)]
        table_size: usize,

        /// Solve instances in parallel; every thread holds a full memo table, so
        /// memory grows with the thread count times --table-size
        #[arg(long)]
        parallel: bool,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Generate a random feasible instance
    Generate {
        /// Number of locations, depot included
        #[arg(short, long)]
        locations: usize,

        /// Width of every customer time window
        #[arg(short, long, default_value = "20")]
        width: i64,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum ObjectiveArg {
    /// Time of return to the depot
    Makespan,
    /// Sum of travel times
    TravelTime,
}

impl From<ObjectiveArg> for Objective {
    fn from(arg: ObjectiveArg) -> Self {
        match arg {
            ObjectiveArg::Makespan => Objective::Makespan,
            ObjectiveArg::TravelTime => Objective::TravelTime,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Dynamic programming (exact)
    Dp,
    /// Exhaustive permutation search (small instances only)
    BruteForce,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Solve { instance, objective, algorithm, table_size, output, verbose } => {
            solve_instance(&instance, objective.into(), algorithm, table_size, output, verbose)
        }

        Commands::Benchmark { dir, output, objective, table_size, parallel, max_size } => {
            run_benchmark(&dir, &output, objective.into(), table_size, parallel, max_size)
        }

        Commands::Analyze { instance } => analyze_instance(&instance),

        Commands::Generate { locations, width, seed, output } => {
            generate_instance(locations, width, seed, output)
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn solve_instance(
    path: &PathBuf,
    objective: Objective,
    algorithm: Algorithm,
    table_size: usize,
    output: Option<PathBuf>,
    verbose: bool,
) -> Result<(), SolverError> {
    println!("Loading instance from {:?}...", path);
    let instance = TsptwInstance::from_file(path)?;

    if verbose {
        println!("{}", instance.statistics());
    }

    println!("Solving for {} with {:?}...", objective, algorithm);

    let json = match algorithm {
        Algorithm::Dp => {
            let solver = DpSolver::new(SolverConfig { objective, table_size });
            let result = solver.solve(&instance)?;
            println!("{}", result);

            if verbose {
                if let Some(sol) = &result.solution {
                    let schedule = instance.simulate(&sol.tour);
                    println!("\nArrival times: {:?}", schedule.arrivals);
                    println!("Replayed feasible: {}", schedule.feasible);
                }
            }
            serde_json::to_string_pretty(&result)
        }

        Algorithm::BruteForce => {
            let start = Instant::now();
            let solution = BruteForceSolver::new(objective).solve(&instance)?;
            let elapsed = start.elapsed().as_secs_f64();
            match &solution {
                Some(sol) => {
                    print!("{}", sol);
                    println!("  Time: {:.4}s", elapsed);
                }
                None => println!("No feasible solution; time = {:.4}s", elapsed),
            }
            serde_json::to_string_pretty(&solution)
        }
    }
    .map_err(|e| SolverError::InvalidInstance(format!("cannot serialize result: {}", e)))?;

    if let Some(out_path) = output {
        std::fs::write(&out_path, json)?;
        println!("\nSolution saved to {:?}", out_path);
    }

    Ok(())
}

fn run_benchmark(
    dir: &PathBuf,
    output: &PathBuf,
    objective: Objective,
    table_size: usize,
    parallel: bool,
    max_size: Option<usize>,
) -> Result<(), SolverError> {
    println!("Loading instances from {:?}...", dir);

    let mut instances = load_instances_from_dir(dir);

    if let Some(max) = max_size {
        instances.retain(|i| i.dimension <= max);
    }

    println!("Found {} instances", instances.len());

    if instances.is_empty() {
        eprintln!("No instances found!");
        return Ok(());
    }

    let config = BenchmarkConfig {
        objective,
        table_size,
        parallel,
        output_dir: output.to_string_lossy().to_string(),
    };
    std::fs::create_dir_all(&config.output_dir)?;
    let out_dir = PathBuf::from(&config.output_dir);

    let mut benchmark = Benchmark::new(config);
    benchmark.run_on_instances(&instances);

    let results_path = out_dir.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = out_dir.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

fn analyze_instance(path: &PathBuf) -> Result<(), SolverError> {
    let instance = TsptwInstance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    // customers that can never be reached before their window closes
    let unreachable: Vec<usize> = (1..instance.dimension)
        .filter(|&c| instance.depot_departure() + instance.travel_time(0, c) > instance.window(c).latest)
        .collect();
    if !unreachable.is_empty() {
        println!("Customers unreachable even directly from the depot: {:?}", unreachable);
    }

    let tight = (1..instance.dimension)
        .min_by_key(|&c| (instance.window(c).width(), c))
        .unwrap_or(0);
    println!(
        "Tightest window: customer {} [{}, {}]",
        tight,
        instance.window(tight).earliest,
        instance.window(tight).latest
    );

    if instance.num_customers() <= 10 {
        for objective in [Objective::TravelTime, Objective::Makespan] {
            match BruteForceSolver::new(objective).solve(&instance)? {
                Some(sol) => println!("Brute-force best {}: {}", objective, sol.value),
                None => println!("Brute-force: no feasible tour"),
            }
        }
    }

    Ok(())
}

fn generate_instance(locations: usize, width: i64, seed: u64, output: Option<PathBuf>) -> Result<(), SolverError> {
    let instance = TsptwInstance::random(locations, width, seed)?;
    match output {
        Some(path) => {
            std::fs::write(&path, instance.to_string())?;
            println!("Instance {} written to {:?}", instance.name, path);
        }
        None => print!("{}", instance),
    }
    Ok(())
}
