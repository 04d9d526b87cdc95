// Request-level error taxonomy

use super::config::ConfigError;
use super::lineup::Violation;
use super::solver_service::SolverError;
use super::value_objects::RelaxationStage;

/// Why a lineup request did not produce a lineup.
#[derive(Debug, thiserror::Error)]
pub enum LineupError {
    /// Malformed player record or config; rejected before solving
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Every relaxation state was tried without a legal lineup
    #[error(
        "no legal lineup after {} relaxation state(s): {}",
        .stages.len(),
        join_violations(.unsatisfied)
    )]
    Infeasible {
        stages: Vec<RelaxationStage>,
        unsatisfied: Vec<Violation>,
    },

    /// Exact mode was requested but no MIP back end is linked
    #[error("exact solver unavailable: {0}")]
    SolverUnavailable(String),

    /// Exact solver hit its time limit without an incumbent
    #[error("exact solver exceeded {seconds:.1}s without a solution")]
    TimeoutExceeded { seconds: f64 },

    /// The heuristic spent its budget without one valid candidate
    #[error("heuristic produced no valid lineup in {iterations} iteration(s)")]
    HeuristicExhausted { iterations: u32 },

    /// A solver or heuristic produced a lineup that breaks a core invariant
    #[error("lineup invariant violated: {0}")]
    InvariantViolation(String),

    #[error("request cancelled: {0}")]
    Cancelled(String),

    #[error(transparent)]
    Solver(#[from] SolverError),
}

impl From<ConfigError> for LineupError {
    fn from(err: ConfigError) -> Self {
        LineupError::Validation(vec![err.to_string()])
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, LineupError>;
