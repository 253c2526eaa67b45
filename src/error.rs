//! Error types shared by the loader, the memo table and the solver.
//!
//! Infeasibility is not an error: the recurrence carries it as a sentinel
//! value and the solver reports it as a result without a tour.

use std::fmt;

#[derive(Debug)]
pub enum SolverError {
    /// More customers than the vertex set can represent.
    TooManyLocations {
        customers: usize,
        capacity: usize,
    },
    /// Malformed or inconsistent instance data.
    InvalidInstance(String),
    /// Solver settings that cannot be used.
    InvalidConfig(String),
    /// Failure while reading or writing instance files.
    Io(std::io::Error),
    /// Every slot of the memo table is occupied and none matches the key.
    TableFull {
        size: usize,
        states: u64,
    },
    /// A memoized state on the optimal path has no stored entry.
    BrokenChain {
        location: usize,
    },
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::TooManyLocations { customers, capacity } => write!(
                f,
                "Instance has {} customers but at most {} are supported",
                customers, capacity
            ),
            SolverError::InvalidInstance(msg) => write!(f, "Invalid instance: {}", msg),
            SolverError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            SolverError::Io(err) => write!(f, "I/O error: {}", err),
            SolverError::TableFull { size, states } => write!(
                f,
                "Hash table is full ({} slots, {} states) -> increase the table size",
                size, states
            ),
            SolverError::BrokenChain { location } => write!(
                f,
                "No memoized predecessor for location {} while rebuilding the tour",
                location
            ),
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolverError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SolverError {
    fn from(err: std::io::Error) -> Self {
        SolverError::Io(err)
    }
}

pub type SolverResult<T> = std::result::Result<T, SolverError>;
