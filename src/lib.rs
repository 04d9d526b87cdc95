// Domain layer: roster model, integer-program model and the solver port
pub mod domain;

// Optimizer pipeline: normalize, resolve, model, solve, relax, assemble
pub mod optimizer;

// Solver adapters: concrete implementations of SolverService
pub mod solver;

// Application layer: single requests and batches
pub mod application;

// Re-export commonly used types
pub use domain::{
    ConfigError, ContestFormat, ExclusionCut, HeuristicSettings, Lineup, LineupConfig,
    LineupError, OptimizationOutcome, OutcomeStatus, PlayerRecord, RelaxationStage, RosterSpot,
    Slot, SolverBackend, SolverError, SolverMode, SolverService, Violation,
};

pub use application::{seeded_requests, BatchResult, BatchRunner, LineupOptimizer, LineupRequest};

pub use solver::SolverFactory;

#[cfg(feature = "cbc")]
pub use solver::CoinCbcSolver;
#[cfg(feature = "highs")]
pub use solver::HighsSolver;
