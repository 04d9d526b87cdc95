// Lineup pipeline: normalize -> resolve -> build -> solve -> relax -> assemble

pub mod assembler;
pub mod builder;
pub mod diagnostics;
pub mod exact;
pub mod heuristic;
pub mod normalizer;
pub mod relaxation;
pub mod resolver;

pub use assembler::{assemble, audit};
pub use builder::{build_model, LineupModel, VariableLayout};
pub use diagnostics::{blocking_class, diagnose};
pub use exact::{ExactOptimizer, ExactResult};
pub use heuristic::{HeuristicOptimizer, HeuristicResult};
pub use normalizer::{normalize, Candidate, NormalizedPool};
pub use relaxation::{relax, RelaxationController};
pub use resolver::{resolve, Assignment, ResolvedPool};
