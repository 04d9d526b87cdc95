// Port for integer-program back ends.
// The optimizer only talks to this trait, so back ends can be swapped or stubbed.

use super::models::{OptimizationProblem, Solution};

/// Error types for the solver service
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Contract every MIP back end implements.
pub trait SolverService: Send + Sync {
    /// Solve an integer program. Infeasibility and time limits are reported
    /// through `Solution::status`, not as errors.
    fn solve(&self, problem: &OptimizationProblem) -> Result<Solution>;

    /// Structural checks shared by every back end
    fn validate(&self, problem: &OptimizationProblem) -> Result<()> {
        let mut errors = Vec::new();
        let num_vars = problem.num_variables();

        if num_vars == 0 {
            errors.push("Problem has no variables".to_string());
        }

        if problem.objective.num_variables() != num_vars {
            errors.push(format!(
                "Objective has {} coefficients but problem has {} variables",
                problem.objective.num_variables(),
                num_vars
            ));
        }

        for (i, constraint) in problem.constraints.iter().enumerate() {
            if let Some(&(idx, _)) = constraint.terms.iter().find(|(idx, _)| *idx >= num_vars) {
                errors.push(format!(
                    "Constraint {} '{}' references variable {} but problem has {} variables",
                    i, constraint.name, idx, num_vars
                ));
            }
            if !constraint.bound.is_finite() {
                errors.push(format!(
                    "Constraint {} '{}' has non-finite bound",
                    i, constraint.name
                ));
            }
        }

        for (i, var) in problem.variables.iter().enumerate() {
            if let Some(upper) = var.upper_bound {
                if var.lower_bound > upper {
                    errors.push(format!(
                        "Variable {} '{}' has lower bound ({}) > upper bound ({})",
                        i, var.name, var.lower_bound, upper
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SolverError::InvalidProblem(errors.join("; ")))
        }
    }

    /// Name of this solver back end
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Constraint;
    use crate::domain::value_objects::{ConstraintClass, ConstraintType};

    struct NullSolver;

    impl SolverService for NullSolver {
        fn solve(&self, _problem: &OptimizationProblem) -> Result<Solution> {
            Err(SolverError::SolverNotAvailable("null".into()))
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    #[test]
    fn rejects_out_of_range_terms() {
        let mut problem = OptimizationProblem::new("bad");
        problem.add_binary("x0", 1.0);
        problem.add_constraint(
            Constraint::new(
                ConstraintClass::RosterSize,
                ConstraintType::Equal,
                vec![(0, 1.0), (3, 1.0)],
                1.0,
            )
            .with_name("roster"),
        );

        let err = NullSolver.validate(&problem).unwrap_err();
        assert!(err.to_string().contains("references variable 3"));
    }

    #[test]
    fn rejects_empty_problem() {
        let problem = OptimizationProblem::new("empty");
        assert!(NullSolver.validate(&problem).is_err());
    }
}
