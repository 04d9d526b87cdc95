// Exact optimizer: builds the integer program, runs it through a
// `SolverService` under a wall-clock limit and decodes the columns back
// into assignment-arena picks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::domain::{
    ConstraintClass, ExclusionCut, LineupConfig, LineupError, OptimizationProblem,
    SolutionStatus, SolverError, SolverService, Violation,
};

use super::builder::{build_model, LineupModel};
use super::diagnostics::{blocking_class, diagnose};
use super::resolver::ResolvedPool;

const SELECTED: f64 = 0.5;

/// What one bounded exact solve produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExactResult {
    Optimal {
        picks: Vec<usize>,
        objective: f64,
    },
    /// Time limit reached with a feasible, unproven incumbent
    TimeoutWithIncumbent {
        picks: Vec<usize>,
        objective: f64,
    },
    Infeasible {
        blocking: Option<ConstraintClass>,
        violations: Vec<Violation>,
    },
    TimeoutNoSolution {
        seconds: f64,
    },
    SolverUnavailable(String),
}

pub struct ExactOptimizer {
    solver: Arc<dyn SolverService>,
}

impl ExactOptimizer {
    pub fn new(solver: Arc<dyn SolverService>) -> Self {
        Self { solver }
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// Solve one relaxation state. `deadline` caps the time limit below
    /// `config.timeout_seconds`.
    pub fn solve(
        &self,
        resolved: &ResolvedPool<'_>,
        config: &LineupConfig,
        cuts: &[ExclusionCut],
        deadline: Option<Instant>,
    ) -> Result<ExactResult, LineupError> {
        let violations = diagnose(resolved, config);
        if !violations.is_empty() {
            debug!(event = "exact_skipped", violations = violations.len());
            return Ok(ExactResult::Infeasible {
                blocking: blocking_class(&violations),
                violations,
            });
        }

        let mut limit = Duration::from_secs(config.timeout_seconds);
        if let Some(deadline) = deadline {
            limit = limit.min(deadline.saturating_duration_since(Instant::now()));
        }
        if limit.is_zero() {
            return Ok(ExactResult::TimeoutNoSolution { seconds: 0.0 });
        }

        let mut model = build_model(resolved, config, cuts);
        model.problem.solver_config.time_limit = Some(limit.as_secs_f64());

        let started = Instant::now();
        let solution = match self.solver.solve(&model.problem) {
            Ok(solution) => solution,
            Err(SolverError::SolverNotAvailable(reason)) => {
                return Ok(ExactResult::SolverUnavailable(reason))
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            event = "exact_solve",
            solver = self.solver.name(),
            status = %solution.status,
            variables = model.problem.num_variables(),
            constraints = model.problem.constraints.len(),
            elapsed_ms = started.elapsed().as_millis() as u64
        );

        match solution.status {
            SolutionStatus::Optimal => {
                let (picks, objective) = decode(resolved, &model, &solution.variable_values)?;
                Ok(ExactResult::Optimal { picks, objective })
            }
            SolutionStatus::Feasible => {
                let (picks, objective) = decode(resolved, &model, &solution.variable_values)?;
                Ok(ExactResult::TimeoutWithIncumbent { picks, objective })
            }
            SolutionStatus::Infeasible => {
                let violation = attribute(&model.problem);
                Ok(ExactResult::Infeasible {
                    blocking: Some(violation.class),
                    violations: vec![violation],
                })
            }
            SolutionStatus::TimeLimit => {
                warn!(event = "exact_timeout", seconds = limit.as_secs_f64());
                Ok(ExactResult::TimeoutNoSolution {
                    seconds: limit.as_secs_f64(),
                })
            }
            SolutionStatus::Unbounded => Err(LineupError::Solver(SolverError::ExecutionFailed(
                "binary roster model reported unbounded".into(),
            ))),
        }
    }
}

/// Blame a solver-proven infeasibility on the loosest class still in the
/// model: the soft class the next relaxation would drop, else the hard rows
/// a caller controls.
fn attribute(problem: &OptimizationProblem) -> Violation {
    const ORDER: [ConstraintClass; 7] = [
        ConstraintClass::TeamCap,
        ConstraintClass::Stack,
        ConstraintClass::SalaryFloor,
        ConstraintClass::OpposingHitters,
        ConstraintClass::TeamCoverage,
        ConstraintClass::Diversity,
        ConstraintClass::Lock,
    ];
    let class = ORDER
        .into_iter()
        .find(|&class| problem.constraints_of(class).next().is_some())
        .unwrap_or(ConstraintClass::SalaryCap);
    Violation::new(
        class,
        format!("solver found no lineup satisfying the active {} rows", class),
    )
}

/// Turn solver columns into arena picks.
///
/// A selected flexible player must have exactly one assignment column set;
/// anything else means the model or the back end is broken.
fn decode(
    resolved: &ResolvedPool<'_>,
    model: &LineupModel,
    values: &[f64],
) -> Result<(Vec<usize>, f64), LineupError> {
    if values.len() != model.problem.num_variables() {
        return Err(LineupError::InvariantViolation(format!(
            "solver returned {} values for {} columns",
            values.len(),
            model.problem.num_variables()
        )));
    }

    let mut picks = Vec::new();
    for (c, candidate) in resolved.candidates.iter().enumerate() {
        let selected = values[model.layout.selection[c]] >= SELECTED;
        let chosen: Vec<usize> = resolved.by_candidate[c]
            .clone()
            .filter(|&a| values[model.layout.assignment[a]] >= SELECTED)
            .collect();
        match (selected, chosen.as_slice()) {
            (true, [a]) => picks.push(*a),
            (false, []) => {}
            (_, _) => {
                return Err(LineupError::InvariantViolation(format!(
                    "player '{}' selected={} occupies {} slots",
                    candidate.id(),
                    selected,
                    chosen.len()
                )))
            }
        }
    }

    let objective = picks.iter().map(|&a| resolved.assignments[a].score).sum();
    Ok((picks, objective))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContestFormat, PlayerRecord, Slot, Solution};
    use crate::optimizer::normalizer::normalize;
    use crate::optimizer::resolver::resolve;

    struct Scripted<F>(F);

    impl<F> SolverService for Scripted<F>
    where
        F: Fn(&OptimizationProblem) -> Result<Solution, SolverError> + Send + Sync,
    {
        fn solve(&self, problem: &OptimizationProblem) -> Result<Solution, SolverError> {
            (self.0)(problem)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn scripted<F>(f: F) -> Arc<dyn SolverService>
    where
        F: Fn(&OptimizationProblem) -> Result<Solution, SolverError> + Send + Sync + 'static,
    {
        Arc::new(Scripted(f))
    }

    fn records() -> Vec<PlayerRecord> {
        vec![
            PlayerRecord::new("p1", "Ace", "NYY", vec![Slot::Pitcher], 9000, 20.0),
            PlayerRecord::new("f1", "Flex", "NYY", vec![Slot::ThirdBase, Slot::ShortStop], 4000, 9.0),
            PlayerRecord::new("s1", "Short", "BOS", vec![Slot::ShortStop], 3500, 7.0),
        ]
    }

    fn config() -> LineupConfig {
        LineupConfig::new(
            ContestFormat::Classic,
            [(Slot::Pitcher, 1), (Slot::ThirdBase, 1), (Slot::ShortStop, 1)],
        )
    }

    #[test]
    fn unavailable_back_end_is_reported_not_raised() {
        let records = records();
        let config = config();
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let exact = ExactOptimizer::new(scripted(|_| {
            Err(SolverError::SolverNotAvailable("not linked".into()))
        }));

        let result = exact.solve(&resolved, &config, &[], None).unwrap();
        assert_eq!(result, ExactResult::SolverUnavailable("not linked".into()));
    }

    #[test]
    fn decodes_flexible_player_into_one_slot() {
        let records = records();
        let config = config();
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let model = build_model(&resolved, &config, &[]);
        let mut values = vec![0.0; model.problem.num_variables()];
        for c in 0..resolved.candidates.len() {
            values[model.layout.selection[c]] = 1.0;
        }
        let f1 = resolved.find("f1").unwrap();
        let third = resolved.by_candidate[f1].start;
        values[model.layout.assignment[third]] = 1.0;

        let exact = ExactOptimizer::new(scripted(move |_| {
            Ok(Solution::optimal(36.0, values.clone()))
        }));
        match exact.solve(&resolved, &config, &[], None).unwrap() {
            ExactResult::Optimal { picks, objective } => {
                assert_eq!(picks.len(), 3);
                assert!(picks.contains(&third));
                assert!((objective - 36.0).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn double_assignment_is_an_invariant_violation() {
        let records = records();
        let config = config();
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let model = build_model(&resolved, &config, &[]);
        let values = vec![1.0; model.problem.num_variables()];

        let exact = ExactOptimizer::new(scripted(move |_| {
            Ok(Solution::optimal(0.0, values.clone()))
        }));
        let err = exact.solve(&resolved, &config, &[], None).unwrap_err();
        assert!(matches!(err, LineupError::InvariantViolation(ref m) if m.contains("'f1'")));
    }

    #[test]
    fn proven_infeasibility_skips_the_solver() {
        let records = records();
        let config = config().with_salary_cap(10_000);
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let exact = ExactOptimizer::new(scripted(|_| {
            Err(SolverError::ExecutionFailed("should not be called".into()))
        }));

        match exact.solve(&resolved, &config, &[], None).unwrap() {
            ExactResult::Infeasible { blocking, violations } => {
                assert_eq!(blocking, Some(ConstraintClass::SalaryCap));
                assert!(!violations.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
