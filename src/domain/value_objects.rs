// Domain value objects representing core roster and solver concepts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named roster position that must be filled.
///
/// Declaration order is the display order of a finished lineup, so the
/// captain comes first and the flex slot last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Slot {
    /// Single-game captain/MVP (salary and score premium)
    Captain,
    Pitcher,
    Catcher,
    FirstBase,
    SecondBase,
    ThirdBase,
    ShortStop,
    Outfield,
    /// Flex slot
    Util,
}

impl Slot {
    pub const ALL: [Slot; 9] = [
        Slot::Captain,
        Slot::Pitcher,
        Slot::Catcher,
        Slot::FirstBase,
        Slot::SecondBase,
        Slot::ThirdBase,
        Slot::ShortStop,
        Slot::Outfield,
        Slot::Util,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Slot::Captain => "CPT",
            Slot::Pitcher => "P",
            Slot::Catcher => "C",
            Slot::FirstBase => "1B",
            Slot::SecondBase => "2B",
            Slot::ThirdBase => "3B",
            Slot::ShortStop => "SS",
            Slot::Outfield => "OF",
            Slot::Util => "UTIL",
        }
    }

    /// Parse a slash- or comma-separated position list such as `"1B/3B"`.
    pub fn parse_list(raw: &str) -> Result<Vec<Slot>, String> {
        let mut slots = Vec::new();
        for part in raw.split(['/', ',']) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let slot = part.parse::<Slot>()?;
            if !slots.contains(&slot) {
                slots.push(slot);
            }
        }
        Ok(slots)
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPT" | "MVP" | "CAPTAIN" => Ok(Slot::Captain),
            "P" | "SP" | "RP" => Ok(Slot::Pitcher),
            "C" => Ok(Slot::Catcher),
            "1B" => Ok(Slot::FirstBase),
            "2B" => Ok(Slot::SecondBase),
            "3B" => Ok(Slot::ThirdBase),
            "SS" => Ok(Slot::ShortStop),
            "OF" | "LF" | "CF" | "RF" => Ok(Slot::Outfield),
            "UTIL" | "FLEX" => Ok(Slot::Util),
            other => Err(format!("unknown position '{}'", other)),
        }
    }
}

impl TryFrom<String> for Slot {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> Self {
        slot.code().to_string()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Contest layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestFormat {
    /// Full slate, fixed positional slots
    #[default]
    Classic,
    /// One game, one captain plus flex slots
    SingleGameCaptain,
}

/// Which engine a request is allowed to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMode {
    /// Exact solver when linked, heuristic otherwise
    #[default]
    Auto,
    /// Exact solver only; an unlinked solver is an error
    Exact,
    /// Never touch a solver
    HeuristicOnly,
}

impl fmt::Display for SolverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverMode::Auto => write!(f, "Auto"),
            SolverMode::Exact => write!(f, "Exact"),
            SolverMode::HeuristicOnly => write!(f, "HeuristicOnly"),
        }
    }
}

/// Final status of a lineup request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    /// Proven optimal by the exact solver
    Optimal,
    /// Best lineup found without an optimality proof
    HeuristicBest,
    /// No legal lineup exists, even fully relaxed
    Infeasible,
    /// The request failed for a reason other than infeasibility
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Optimal => write!(f, "Optimal"),
            OutcomeStatus::HeuristicBest => write!(f, "Heuristic Best"),
            OutcomeStatus::Infeasible => write!(f, "Infeasible"),
            OutcomeStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Relaxation state machine. Each state is cumulative over the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelaxationStage {
    Strict,
    TeamCapRelaxed,
    SalaryFloorRelaxed,
    /// Only roster size, slot counts, salary cap (plus locks and cuts)
    Unconstrained,
}

impl RelaxationStage {
    pub const ORDER: [RelaxationStage; 4] = [
        RelaxationStage::Strict,
        RelaxationStage::TeamCapRelaxed,
        RelaxationStage::SalaryFloorRelaxed,
        RelaxationStage::Unconstrained,
    ];

    pub fn next(self) -> Option<RelaxationStage> {
        match self {
            RelaxationStage::Strict => Some(RelaxationStage::TeamCapRelaxed),
            RelaxationStage::TeamCapRelaxed => Some(RelaxationStage::SalaryFloorRelaxed),
            RelaxationStage::SalaryFloorRelaxed => Some(RelaxationStage::Unconstrained),
            RelaxationStage::Unconstrained => None,
        }
    }

    /// Whether this stage (or an earlier one) has dropped constraints of `class`.
    pub fn relaxes(self, class: ConstraintClass) -> bool {
        match class {
            ConstraintClass::TeamCap | ConstraintClass::Stack => {
                self >= RelaxationStage::TeamCapRelaxed
            }
            ConstraintClass::SalaryFloor => self >= RelaxationStage::SalaryFloorRelaxed,
            ConstraintClass::OpposingHitters | ConstraintClass::TeamCoverage => {
                self == RelaxationStage::Unconstrained
            }
            _ => false,
        }
    }
}

impl fmt::Display for RelaxationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelaxationStage::Strict => write!(f, "Strict"),
            RelaxationStage::TeamCapRelaxed => write!(f, "TeamCapRelaxed"),
            RelaxationStage::SalaryFloorRelaxed => write!(f, "SalaryFloorRelaxed"),
            RelaxationStage::Unconstrained => write!(f, "Unconstrained"),
        }
    }
}

/// Family a model constraint belongs to; used to attribute infeasibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstraintClass {
    RosterSize,
    /// Per-slot equality
    SlotCount,
    /// Assignment variables summing to the selection variable
    Assignment,
    SalaryCap,
    SalaryFloor,
    TeamCap,
    Stack,
    OpposingHitters,
    TeamCoverage,
    Lock,
    /// Exclusion cut against a previously generated lineup
    Diversity,
}

impl ConstraintClass {
    /// Soft classes may be dropped by the relaxation controller.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            ConstraintClass::SalaryFloor
                | ConstraintClass::TeamCap
                | ConstraintClass::Stack
                | ConstraintClass::OpposingHitters
                | ConstraintClass::TeamCoverage
        )
    }
}

impl fmt::Display for ConstraintClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConstraintClass::RosterSize => "roster size",
            ConstraintClass::SlotCount => "slot count",
            ConstraintClass::Assignment => "slot assignment",
            ConstraintClass::SalaryCap => "salary cap",
            ConstraintClass::SalaryFloor => "salary floor",
            ConstraintClass::TeamCap => "team cap",
            ConstraintClass::Stack => "stack",
            ConstraintClass::OpposingHitters => "opposing hitters",
            ConstraintClass::TeamCoverage => "team coverage",
            ConstraintClass::Lock => "lock",
            ConstraintClass::Diversity => "diversity",
        };
        f.write_str(label)
    }
}

/// Type of decision variable in the integer program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    /// Continuous real number (x ∈ ℝ)
    Continuous,
    /// Binary variable (x ∈ {0, 1})
    Binary,
}

/// Type of constraint comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// Less than or equal (≤)
    LessThanOrEqual,
    /// Equal (=)
    Equal,
    /// Greater than or equal (≥)
    GreaterThanOrEqual,
}

/// Direction of optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationType {
    Minimize,
    Maximize,
}

/// Status reported by a solver back end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Found optimal solution
    Optimal,
    /// Stopped early with a feasible incumbent
    Feasible,
    /// Problem has no feasible solution
    Infeasible,
    /// Objective can be improved infinitely
    Unbounded,
    /// Time limit reached without an incumbent
    TimeLimit,
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStatus::Optimal => write!(f, "Optimal"),
            SolutionStatus::Feasible => write!(f, "Feasible"),
            SolutionStatus::Infeasible => write!(f, "Infeasible"),
            SolutionStatus::Unbounded => write!(f, "Unbounded"),
            SolutionStatus::TimeLimit => write!(f, "Time Limit Reached"),
        }
    }
}

/// Solver back end to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    /// Automatically select best linked solver
    #[default]
    Auto,
    /// COIN-OR CBC solver
    CoinCbc,
    /// HiGHS solver
    Highs,
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Auto => write!(f, "Auto"),
            SolverBackend::CoinCbc => write!(f, "COIN-OR CBC"),
            SolverBackend::Highs => write!(f, "HiGHS"),
        }
    }
}
