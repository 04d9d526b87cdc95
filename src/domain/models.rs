// Integer-program model handed to solver back ends.
// Rows are sparse: a roster model has thousands of columns but each row touches few of them.

use super::value_objects::{
    ConstraintClass, ConstraintType, OptimizationType, SolutionStatus, SolverBackend, VariableType,
};

/// Decision variable in the integer program
#[derive(Debug, Clone)]
pub struct Variable {
    pub variable_type: VariableType,
    pub lower_bound: f64,
    pub upper_bound: Option<f64>,
    pub name: String,
}

impl Variable {
    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Binary,
            lower_bound: 0.0,
            upper_bound: Some(1.0),
            name: name.into(),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.variable_type, VariableType::Binary)
    }
}

/// Objective function to minimize or maximize
#[derive(Debug, Clone)]
pub struct ObjectiveFunction {
    pub optimization_type: OptimizationType,
    /// Dense, one coefficient per variable
    pub coefficients: Vec<f64>,
}

impl ObjectiveFunction {
    pub fn maximize(coefficients: Vec<f64>) -> Self {
        Self {
            optimization_type: OptimizationType::Maximize,
            coefficients,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.coefficients.len()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .map(|(c, v)| c * v)
            .sum()
    }
}

/// Linear constraint `Σ coeff·x (≤|=|≥) bound`
#[derive(Debug, Clone)]
pub struct Constraint {
    pub constraint_type: ConstraintType,
    /// Sparse `(variable index, coefficient)` terms
    pub terms: Vec<(usize, f64)>,
    pub bound: f64,
    pub class: ConstraintClass,
    pub name: String,
}

impl Constraint {
    pub fn new(
        class: ConstraintClass,
        constraint_type: ConstraintType,
        terms: Vec<(usize, f64)>,
        bound: f64,
    ) -> Self {
        Self {
            constraint_type,
            terms,
            bound,
            class,
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(i, c)| c * values.get(i).copied().unwrap_or(0.0))
            .sum()
    }

    /// Amount by which `values` violate this row (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.lhs(values);
        match self.constraint_type {
            ConstraintType::LessThanOrEqual => (lhs - self.bound).max(0.0),
            ConstraintType::Equal => (lhs - self.bound).abs(),
            ConstraintType::GreaterThanOrEqual => (self.bound - lhs).max(0.0),
        }
    }
}

/// Configuration for the solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Wall-clock limit in seconds
    pub time_limit: Option<f64>,
    pub gap_tolerance: Option<f64>,
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Auto,
            time_limit: None,
            gap_tolerance: None,
            verbose: false,
        }
    }
}

/// Complete integer program
#[derive(Debug, Clone)]
pub struct OptimizationProblem {
    pub name: String,
    pub objective: ObjectiveFunction,
    pub constraints: Vec<Constraint>,
    pub variables: Vec<Variable>,
    pub solver_config: SolverConfig,
}

impl OptimizationProblem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objective: ObjectiveFunction::maximize(Vec::new()),
            constraints: Vec::new(),
            variables: Vec::new(),
            solver_config: SolverConfig::default(),
        }
    }

    /// Append a binary column and return its index.
    pub fn add_binary(&mut self, name: impl Into<String>, objective: f64) -> usize {
        self.variables.push(Variable::binary(name));
        self.objective.coefficients.push(objective);
        self.variables.len() - 1
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.solver_config = config;
        self
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.is_integer()).count()
    }

    pub fn constraints_of(&self, class: ConstraintClass) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.class == class)
    }

    /// Measure how well `values` satisfy the model.
    pub fn quality_of(&self, values: &[f64]) -> SolutionQuality {
        if values.len() != self.num_variables() {
            return SolutionQuality {
                max_constraint_violation: f64::INFINITY,
                max_integrality_violation: f64::INFINITY,
            };
        }

        let max_constraint_violation = self
            .constraints
            .iter()
            .map(|c| c.violation(values))
            .fold(0.0, f64::max);

        let max_integrality_violation = self
            .variables
            .iter()
            .zip(values)
            .filter(|(var, _)| var.is_integer())
            .map(|(_, v)| (v - v.round()).abs())
            .fold(0.0, f64::max);

        SolutionQuality {
            max_constraint_violation,
            max_integrality_violation,
        }
    }
}

/// Statistics about the solve process
#[derive(Debug, Clone, Default)]
pub struct SolverStatistics {
    pub solve_time_ms: f64,
    pub num_variables: u32,
    pub num_constraints: u32,
    pub num_binary_vars: u32,
}

impl SolverStatistics {
    pub fn for_problem(problem: &OptimizationProblem, solve_time_ms: f64) -> Self {
        Self {
            solve_time_ms,
            num_variables: problem.num_variables() as u32,
            num_constraints: problem.constraints.len() as u32,
            num_binary_vars: problem.num_integer_variables() as u32,
        }
    }
}

/// Quality metrics for the solution
#[derive(Debug, Clone, Default)]
pub struct SolutionQuality {
    pub max_constraint_violation: f64,
    pub max_integrality_violation: f64,
}

impl SolutionQuality {
    pub const TOLERANCE: f64 = 1e-4;

    pub fn is_feasible(&self) -> bool {
        self.max_constraint_violation <= Self::TOLERANCE
            && self.max_integrality_violation <= Self::TOLERANCE
    }
}

/// Solution to an integer program
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolutionStatus,
    pub optimal_value: Option<f64>,
    pub variable_values: Vec<f64>,
    pub message: String,
    pub statistics: SolverStatistics,
    pub quality: SolutionQuality,
}

impl Solution {
    pub fn new(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            optimal_value: None,
            variable_values: Vec::new(),
            message: message.into(),
            statistics: SolverStatistics::default(),
            quality: SolutionQuality::default(),
        }
    }

    pub fn optimal(value: f64, variable_values: Vec<f64>) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            optimal_value: Some(value),
            variable_values,
            message: "Optimal solution found".to_string(),
            statistics: SolverStatistics::default(),
            quality: SolutionQuality::default(),
        }
    }

    /// Time-limited result; keeps the values only when they form a feasible incumbent.
    pub fn time_limited(problem: &OptimizationProblem, values: Vec<f64>) -> Self {
        let quality = problem.quality_of(&values);
        if quality.is_feasible() {
            let value = problem.objective.evaluate(&values);
            Self {
                status: SolutionStatus::Feasible,
                optimal_value: Some(value),
                variable_values: values,
                message: "Time limit reached with incumbent".to_string(),
                statistics: SolverStatistics::default(),
                quality,
            }
        } else {
            Self::new(
                SolutionStatus::TimeLimit,
                "Time limit reached without a feasible incumbent",
            )
        }
    }

    pub fn with_statistics(mut self, statistics: SolverStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    pub fn is_feasible(&self) -> bool {
        matches!(
            self.status,
            SolutionStatus::Optimal | SolutionStatus::Feasible
        )
    }
}
