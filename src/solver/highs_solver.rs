// HiGHS Solver Adapter
// Implements the SolverService interface for HiGHS
// Translates the sparse roster model into a HiGHS row problem

use crate::domain::{
    models::{OptimizationProblem, Solution as DomainSolution, SolverStatistics},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{
        ConstraintType, OptimizationType, SolutionStatus as DomainSolutionStatus, VariableType,
    },
};
use highs::{HighsModelStatus, RowProblem, Sense};
use std::time::Instant;
use tracing::debug;

pub struct HighsSolver;

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for HighsSolver {
    fn solve(&self, problem: &OptimizationProblem) -> Result<DomainSolution> {
        self.validate(problem)?;

        let start_time = Instant::now();
        let mut pb = RowProblem::default();

        // Columns first, in model order, so column i is variable i
        let mut cols = Vec::with_capacity(problem.num_variables());
        for (var_def, &obj_coeff) in problem.variables.iter().zip(&problem.objective.coefficients) {
            let lower = var_def.lower_bound;
            let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);
            let col = match var_def.variable_type {
                VariableType::Binary => pb.add_integer_column(obj_coeff, lower..=upper),
                VariableType::Continuous => pb.add_column(obj_coeff, lower..=upper),
            };
            cols.push(col);
        }

        for constraint in &problem.constraints {
            let terms: Vec<_> = constraint
                .terms
                .iter()
                .filter(|(_, coeff)| *coeff != 0.0)
                .map(|&(i, coeff)| (cols[i], coeff))
                .collect();

            match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => {
                    pb.add_row(..=constraint.bound, &terms);
                }
                ConstraintType::Equal => {
                    pb.add_row(constraint.bound..=constraint.bound, &terms);
                }
                ConstraintType::GreaterThanOrEqual => {
                    pb.add_row(constraint.bound.., &terms);
                }
            }
        }

        let sense = if problem.objective.optimization_type == OptimizationType::Maximize {
            Sense::Maximise
        } else {
            Sense::Minimise
        };

        let mut model = pb.optimise(sense);
        let config = &problem.solver_config;
        model.set_option("output_flag", config.verbose);
        if let Some(limit) = config.time_limit {
            model.set_option("time_limit", limit);
        }
        if let Some(gap) = config.gap_tolerance {
            model.set_option("mip_rel_gap", gap);
        }

        let solved = model.try_solve().map_err(|status| {
            SolverError::ExecutionFailed(format!("HiGHS failed to run: {:?}", status))
        })?;
        let solve_time = start_time.elapsed().as_secs_f64() * 1000.0;
        let statistics = SolverStatistics::for_problem(problem, solve_time);
        debug!(event = "highs_status", status = ?solved.status(), solve_time_ms = solve_time);

        match solved.status() {
            HighsModelStatus::Optimal => {
                let variable_values = solved.get_solution().columns().to_vec();
                let quality = problem.quality_of(&variable_values);
                let value = problem.objective.evaluate(&variable_values);

                let mut solution = DomainSolution::optimal(value, variable_values);
                solution.quality = quality;
                solution.message = format!("Optimal solution found for '{}'", problem.name);
                Ok(solution.with_statistics(statistics))
            }
            HighsModelStatus::ReachedTimeLimit => {
                let variable_values = solved.get_solution().columns().to_vec();
                Ok(DomainSolution::time_limited(problem, variable_values).with_statistics(statistics))
            }
            // Every roster column is bounded, so "unbounded or infeasible" can only be infeasible
            HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
                Ok(DomainSolution::new(
                    DomainSolutionStatus::Infeasible,
                    "Problem is infeasible: no solution satisfies all constraints",
                )
                .with_statistics(statistics))
            }
            HighsModelStatus::Unbounded => Ok(DomainSolution::new(
                DomainSolutionStatus::Unbounded,
                "Problem is unbounded: objective can be improved infinitely",
            )
            .with_statistics(statistics)),
            status => Err(SolverError::ExecutionFailed(format!(
                "HiGHS solver returned status: {:?}",
                status
            ))),
        }
    }

    fn name(&self) -> &str {
        "HiGHS"
    }
}
