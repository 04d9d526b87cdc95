// Result types produced by the optimizer

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::errors::LineupError;
use super::player::PlayerRecord;
use super::value_objects::{ConstraintClass, OutcomeStatus, RelaxationStage, Slot};

/// One filled roster slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterSpot {
    pub slot: Slot,
    pub player: PlayerRecord,
    /// Salary charged for this slot (captain premium applied)
    pub salary: u32,
    /// Score credited for this slot (captain premium applied)
    pub score: f64,
}

/// A complete, verified lineup. Only the assembler constructs one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lineup {
    players: Vec<RosterSpot>,
    total_salary: u32,
    total_score: f64,
    team_counts: BTreeMap<String, u32>,
    max_stack: u32,
}

impl Lineup {
    pub(crate) fn new(
        players: Vec<RosterSpot>,
        total_salary: u32,
        total_score: f64,
        team_counts: BTreeMap<String, u32>,
    ) -> Self {
        let max_stack = team_counts.values().copied().max().unwrap_or(0);
        Self {
            players,
            total_salary,
            total_score,
            team_counts,
            max_stack,
        }
    }

    /// Players in slot order
    pub fn players(&self) -> &[RosterSpot] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn total_salary(&self) -> u32 {
        self.total_salary
    }

    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    pub fn team_counts(&self) -> &BTreeMap<String, u32> {
        &self.team_counts
    }

    /// Size of the largest single-team stack
    pub fn max_stack(&self) -> u32 {
        self.max_stack
    }

    pub fn player_ids(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(|spot| spot.player.id.as_str())
    }

    pub fn slot_of(&self, player_id: &str) -> Option<Slot> {
        self.players
            .iter()
            .find(|spot| spot.player.id == player_id)
            .map(|spot| spot.slot)
    }

    pub fn count_in(&self, slot: Slot) -> u32 {
        self.players.iter().filter(|spot| spot.slot == slot).count() as u32
    }

    /// Number of players also in `other`.
    pub fn overlap(&self, other: &Lineup) -> usize {
        self.player_ids()
            .filter(|id| other.player_ids().any(|o| o == *id))
            .count()
    }
}

impl fmt::Display for Lineup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for spot in &self.players {
            writeln!(
                f,
                "{:<4} {:<24} {:<4} ${:>6} {:>6.2}",
                spot.slot, spot.player.name, spot.player.team, spot.salary, spot.score
            )?;
        }
        write!(f, "total ${} {:.2} pts", self.total_salary, self.total_score)
    }
}

/// Caps how many players a new lineup may share with an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionCut {
    pub player_ids: Vec<String>,
    pub max_shared: u32,
}

impl ExclusionCut {
    /// Require at least `min_unique` players that are not in `lineup`.
    pub fn from_lineup(lineup: &Lineup, min_unique: u32) -> Self {
        Self {
            player_ids: lineup.player_ids().map(str::to_string).collect(),
            max_shared: (lineup.len() as u32).saturating_sub(min_unique),
        }
    }
}

/// A constraint that a candidate (or the whole pool) cannot satisfy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub class: ConstraintClass,
    pub message: String,
}

impl Violation {
    pub fn new(class: ConstraintClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// Result of one lineup request.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOutcome {
    pub status: OutcomeStatus,
    pub objective_value: Option<f64>,
    /// Relaxation states entered after `Strict`, in order
    pub relaxations_applied: Vec<RelaxationStage>,
    pub lineup: Option<Lineup>,
    /// Why no lineup was produced, when it was not
    pub diagnostics: Vec<String>,
}

impl OptimizationOutcome {
    pub(crate) fn solved(
        status: OutcomeStatus,
        lineup: Lineup,
        relaxations_applied: Vec<RelaxationStage>,
    ) -> Self {
        Self {
            status,
            objective_value: Some(lineup.total_score()),
            relaxations_applied,
            lineup: Some(lineup),
            diagnostics: Vec::new(),
        }
    }

    /// Outcome for a failed request, for callers that record rather than propagate.
    pub fn from_error(error: &LineupError) -> Self {
        let (status, diagnostics) = match error {
            LineupError::Infeasible { unsatisfied, .. } => (
                OutcomeStatus::Infeasible,
                unsatisfied.iter().map(ToString::to_string).collect(),
            ),
            other => (OutcomeStatus::Failed, vec![other.to_string()]),
        };
        let relaxations_applied = match error {
            LineupError::Infeasible { stages, .. } => stages
                .iter()
                .copied()
                .filter(|s| *s != RelaxationStage::Strict)
                .collect(),
            _ => Vec::new(),
        };
        Self {
            status,
            objective_value: None,
            relaxations_applied,
            lineup: None,
            diagnostics,
        }
    }

    pub fn is_success(&self) -> bool {
        self.lineup.is_some()
    }
}
