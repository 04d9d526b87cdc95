// Feasibility relaxation controller.
//
// Stages are cumulative. Locks, exclusion cuts, roster size, slot counts and
// the salary cap are never relaxed.

use tracing::info;

use crate::domain::{ConstraintClass, LineupConfig, RelaxationStage};

/// The config `base` becomes once every constraint dropped by `stage` is gone.
///
/// Stages are ordered and cumulative: `relax(base, SalaryFloorRelaxed)` also
/// lifts the team cap and drops the stack requirement, exactly as
/// `TeamCapRelaxed` does.
pub fn relax(base: &LineupConfig, stage: RelaxationStage) -> LineupConfig {
    let mut config = base.clone();
    if stage >= RelaxationStage::TeamCapRelaxed {
        config.max_per_team = config.max_per_team.max(config.roster_size);
        config.min_stack_size = None;
    }
    if stage >= RelaxationStage::SalaryFloorRelaxed {
        config.salary_floor = None;
    }
    if stage >= RelaxationStage::Unconstrained {
        config.max_hitters_vs_pitcher = None;
        config.min_teams = None;
    }
    config
}

/// Walks the relaxation states for one request.
#[derive(Debug, Clone)]
pub struct RelaxationController {
    visited: Vec<RelaxationStage>,
}

impl Default for RelaxationController {
    fn default() -> Self {
        Self::new()
    }
}

impl RelaxationController {
    pub fn new() -> Self {
        Self {
            visited: vec![RelaxationStage::Strict],
        }
    }

    pub fn stage(&self) -> RelaxationStage {
        self.visited
            .last()
            .copied()
            .unwrap_or(RelaxationStage::Strict)
    }

    /// Active config for the current stage.
    pub fn config(&self, base: &LineupConfig) -> LineupConfig {
        relax(base, self.stage())
    }

    /// Every stage tried so far, `Strict` first.
    pub fn visited(&self) -> &[RelaxationStage] {
        &self.visited
    }

    /// Stages entered after `Strict`.
    pub fn applied(&self) -> Vec<RelaxationStage> {
        self.visited.iter().skip(1).copied().collect()
    }

    /// Move to the next stage that loosens `blocking`, skipping stages that
    /// would not change `base`. Without a relaxable blocking class, the next
    /// stage that changes anything is taken. Returns `None` when exhausted.
    ///
    /// A jump skips intermediate stages without recording them, yet their
    /// relaxations still apply: advancing from `Strict` on a `SalaryFloor`
    /// blocker lands on `SalaryFloorRelaxed` with the team cap and stack
    /// already gone, and `applied()` lists only `SalaryFloorRelaxed`.
    pub fn advance(
        &mut self,
        base: &LineupConfig,
        blocking: Option<ConstraintClass>,
    ) -> Option<RelaxationStage> {
        let current = self.stage();
        let active = relax(base, current);
        let later: Vec<RelaxationStage> = RelaxationStage::ORDER
            .iter()
            .copied()
            .filter(|&s| s > current && relax(base, s) != active)
            .collect();

        let targeted = blocking
            .filter(|class| class.is_soft() && !current.relaxes(*class))
            .and_then(|class| later.iter().copied().find(|s| s.relaxes(class)));
        let next = targeted.or_else(|| later.first().copied())?;

        info!(
            event = "relaxation",
            from = %current,
            to = %next,
            blocking = ?blocking
        );
        self.visited.push(next);
        Some(next)
    }
}
