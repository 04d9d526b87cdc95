// Domain module: roster model, integer-program model and the solver port

pub mod config;
pub mod errors;
pub mod lineup;
pub mod models;
pub mod player;
pub mod solver_service;
pub mod value_objects;

pub use config::*;
pub use errors::LineupError;
pub use lineup::*;
pub use models::*;
pub use player::*;
pub use solver_service::{SolverError, SolverService};
pub use value_objects::*;
