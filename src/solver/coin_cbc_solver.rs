// COIN-OR CBC Solver Adapter (through good_lp)

use crate::domain::{
    models::{OptimizationProblem, Solution as DomainSolution, SolverStatistics},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{
        ConstraintType, OptimizationType, SolutionStatus as DomainSolutionStatus, VariableType,
    },
};
use good_lp::{
    solvers::coin_cbc, variable, variables, Expression, ResolutionError,
    Solution as GoodLpSolutionTrait, SolverModel, Variable as GoodLpVariable,
};
use std::time::Instant;
use tracing::debug;

pub struct CoinCbcSolver;

impl CoinCbcSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CoinCbcSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for CoinCbcSolver {
    fn solve(&self, problem: &OptimizationProblem) -> Result<DomainSolution> {
        self.validate(problem)?;

        let start_time = Instant::now();

        let mut vars = variables!();
        let lp_variables: Vec<GoodLpVariable> = problem
            .variables
            .iter()
            .map(|var_def| {
                let lower = var_def.lower_bound;
                let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);
                match var_def.variable_type {
                    VariableType::Binary => vars.add(variable().integer().min(lower).max(upper)),
                    VariableType::Continuous => vars.add(variable().min(lower).max(upper)),
                }
            })
            .collect();

        let objective: Expression = problem
            .objective
            .coefficients
            .iter()
            .zip(&lp_variables)
            .filter(|(coeff, _)| **coeff != 0.0)
            .map(|(&coeff, &var)| coeff * var)
            .sum();

        let unsolved = if problem.objective.optimization_type == OptimizationType::Maximize {
            vars.maximise(objective)
        } else {
            vars.minimise(objective)
        };
        let mut lp_model = unsolved.using(coin_cbc::coin_cbc);

        let config = &problem.solver_config;
        if !config.verbose {
            lp_model.set_parameter("log", "0");
        }
        if let Some(limit) = config.time_limit {
            lp_model.set_parameter("sec", &format!("{:.3}", limit));
        }
        if let Some(gap) = config.gap_tolerance {
            lp_model.set_parameter("ratioGap", &gap.to_string());
        }

        for constraint in &problem.constraints {
            let lhs: Expression = constraint
                .terms
                .iter()
                .map(|&(i, coeff)| coeff * lp_variables[i])
                .sum();

            lp_model = match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => lp_model.with(lhs.leq(constraint.bound)),
                ConstraintType::Equal => lp_model.with(lhs.eq(constraint.bound)),
                ConstraintType::GreaterThanOrEqual => lp_model.with(lhs.geq(constraint.bound)),
            };
        }

        let solution_result = lp_model.solve();
        let elapsed = start_time.elapsed();
        let solve_time = elapsed.as_secs_f64() * 1000.0;
        let statistics = SolverStatistics::for_problem(problem, solve_time);
        // CBC stops quietly at its time limit; elapsed time tells us it happened
        let hit_limit = config
            .time_limit
            .is_some_and(|limit| elapsed.as_secs_f64() >= limit);

        match solution_result {
            Ok(sol) => {
                let variable_values: Vec<f64> =
                    lp_variables.iter().map(|&var| sol.value(var)).collect();
                debug!(event = "cbc_solved", hit_limit, solve_time_ms = solve_time);

                if hit_limit {
                    return Ok(DomainSolution::time_limited(problem, variable_values)
                        .with_statistics(statistics));
                }
                let quality = problem.quality_of(&variable_values);
                let value = problem.objective.evaluate(&variable_values);
                let mut solution = DomainSolution::optimal(value, variable_values);
                solution.quality = quality;
                solution.message = format!("Optimal solution found for '{}'", problem.name);
                Ok(solution.with_statistics(statistics))
            }
            Err(ResolutionError::Infeasible) => Ok(DomainSolution::new(
                DomainSolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(statistics)),
            Err(ResolutionError::Unbounded) => Ok(DomainSolution::new(
                DomainSolutionStatus::Unbounded,
                "Problem is unbounded: objective can be improved infinitely",
            )
            .with_statistics(statistics)),
            Err(_) if hit_limit => Ok(DomainSolution::new(
                DomainSolutionStatus::TimeLimit,
                "Time limit reached without a feasible incumbent",
            )
            .with_statistics(statistics)),
            Err(e) => Err(SolverError::ExecutionFailed(format!("{:?}", e))),
        }
    }

    fn name(&self) -> &str {
        "COIN-OR CBC"
    }
}
