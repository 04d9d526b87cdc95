// Application layer: lineup use cases over the optimizer pipeline

pub mod batch;
pub mod lineup_service;

pub use batch::{seeded_requests, BatchResult, BatchRunner, LineupRequest};
pub use lineup_service::LineupOptimizer;
