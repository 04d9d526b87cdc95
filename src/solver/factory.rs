use crate::domain::{
    solver_service::{SolverError, SolverService},
    value_objects::SolverBackend,
};
#[cfg(feature = "cbc")]
use crate::solver::CoinCbcSolver;
#[cfg(feature = "highs")]
use crate::solver::HighsSolver;
use std::sync::Arc;

/// Factory for creating solver instances from the back ends compiled in
pub struct SolverFactory;

impl SolverFactory {
    /// Create a solver for a specific backend. `Auto` prefers HiGHS, then CBC.
    pub fn create_from_backend(
        backend: SolverBackend,
    ) -> Result<Arc<dyn SolverService>, SolverError> {
        match backend {
            SolverBackend::Auto => Self::highs().or_else(|_| Self::cbc()).map_err(|_| {
                SolverError::SolverNotAvailable(
                    "no MIP back end compiled in (enable the `highs` or `cbc` feature)".into(),
                )
            }),
            SolverBackend::Highs => Self::highs(),
            SolverBackend::CoinCbc => Self::cbc(),
        }
    }

    /// The preferred solver, if any back end is compiled in
    pub fn default_solver() -> Result<Arc<dyn SolverService>, SolverError> {
        Self::create_from_backend(SolverBackend::Auto)
    }

    /// Back ends compiled into this build, in preference order
    pub fn available() -> Vec<SolverBackend> {
        [SolverBackend::Highs, SolverBackend::CoinCbc]
            .into_iter()
            .filter(|&backend| Self::create_from_backend(backend).is_ok())
            .collect()
    }

    #[cfg(feature = "highs")]
    fn highs() -> Result<Arc<dyn SolverService>, SolverError> {
        Ok(Arc::new(HighsSolver::new()))
    }

    #[cfg(not(feature = "highs"))]
    fn highs() -> Result<Arc<dyn SolverService>, SolverError> {
        Err(SolverError::SolverNotAvailable(
            "HiGHS support not compiled in (feature `highs`)".into(),
        ))
    }

    #[cfg(feature = "cbc")]
    fn cbc() -> Result<Arc<dyn SolverService>, SolverError> {
        Ok(Arc::new(CoinCbcSolver::new()))
    }

    #[cfg(not(feature = "cbc"))]
    fn cbc() -> Result<Arc<dyn SolverService>, SolverError> {
        Err(SolverError::SolverNotAvailable(
            "CBC support not compiled in (feature `cbc`)".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_matches_compiled_features() {
        let auto = SolverFactory::create_from_backend(SolverBackend::Auto);
        assert_eq!(auto.is_ok(), !SolverFactory::available().is_empty());
    }

    #[cfg(feature = "highs")]
    #[test]
    fn auto_prefers_highs() {
        let solver = SolverFactory::default_solver().unwrap();
        assert_eq!(solver.name(), "HiGHS");
    }

    #[cfg(not(feature = "cbc"))]
    #[test]
    fn missing_backend_is_reported() {
        let err = SolverFactory::create_from_backend(SolverBackend::CoinCbc)
            .err()
            .unwrap();
        assert!(matches!(err, SolverError::SolverNotAvailable(_)));
    }
}
