// Lineup use case: one request, one synchronous solve, one result.
//
// Drives the pipeline normalize -> resolve -> {exact | heuristic} ->
// relaxation loop -> assemble, with the engine choice fixed at construction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::domain::errors::Result;
use crate::domain::{
    ConstraintClass, ExclusionCut, LineupConfig, LineupError, OptimizationOutcome, OutcomeStatus,
    PlayerRecord, SolverBackend, SolverMode, SolverService, Violation,
};
use crate::optimizer::{
    assemble, normalize, resolve, ExactOptimizer, ExactResult, HeuristicOptimizer,
    HeuristicResult, RelaxationController, ResolvedPool,
};
use crate::solver::SolverFactory;

/// Seed offset between consecutive lineups of a `generate` run
const SEED_STRIDE: u64 = 0x9E37_79B9;

enum StageOutcome {
    Solved {
        picks: Vec<usize>,
        status: OutcomeStatus,
    },
    Blocked(StageFailure),
}

/// Why one relaxation stage produced nothing.
struct StageFailure {
    blocking: Option<ConstraintClass>,
    violations: Vec<Violation>,
    proven: bool,
    iterations: u32,
    /// Exact time limit that expired before the heuristic took over
    timed_out: Option<f64>,
}

/// Synchronous lineup optimizer.
///
/// The engine is chosen once: `Exact` never silently degrades, `HeuristicOnly`
/// never touches a solver, and `Auto` uses the exact back end when one is
/// available and falls back to the heuristic otherwise.
pub struct LineupOptimizer {
    mode: SolverMode,
    exact: Option<ExactOptimizer>,
    /// Why `exact` is missing, when it is
    unavailable: Option<String>,
    heuristic: HeuristicOptimizer,
}

impl LineupOptimizer {
    /// Optimizer using the preferred compiled-in back end.
    pub fn new(mode: SolverMode) -> Self {
        Self::with_backend(mode, SolverBackend::Auto)
    }

    pub fn with_backend(mode: SolverMode, backend: SolverBackend) -> Self {
        if mode == SolverMode::HeuristicOnly {
            return Self::heuristic_only();
        }
        match SolverFactory::create_from_backend(backend) {
            Ok(solver) => Self::with_solver(mode, solver),
            Err(e) => {
                debug!(event = "exact_backend_missing", mode = %mode, reason = %e);
                Self {
                    mode,
                    exact: None,
                    unavailable: Some(e.to_string()),
                    heuristic: HeuristicOptimizer::new(),
                }
            }
        }
    }

    /// Optimizer matching the mode and back end named in `config`.
    pub fn for_config(config: &LineupConfig) -> Self {
        Self::with_backend(config.solver_mode, config.solver_backend)
    }

    /// Optimizer around an injected back end.
    pub fn with_solver(mode: SolverMode, solver: Arc<dyn SolverService>) -> Self {
        Self {
            mode,
            exact: (mode != SolverMode::HeuristicOnly).then(|| ExactOptimizer::new(solver)),
            unavailable: None,
            heuristic: HeuristicOptimizer::new(),
        }
    }

    pub fn heuristic_only() -> Self {
        Self {
            mode: SolverMode::HeuristicOnly,
            exact: None,
            unavailable: None,
            heuristic: HeuristicOptimizer::new(),
        }
    }

    pub fn mode(&self) -> SolverMode {
        self.mode
    }

    /// Name of the exact back end in use, if any
    pub fn solver_name(&self) -> Option<&str> {
        self.exact.as_ref().map(ExactOptimizer::solver_name)
    }

    pub fn optimize(&self, pool: &[PlayerRecord], config: &LineupConfig) -> Result<OptimizationOutcome> {
        self.optimize_excluding(pool, config, &[], None)
    }

    /// Like [`optimize`](Self::optimize), but never solves past `deadline`.
    pub fn optimize_until(
        &self,
        pool: &[PlayerRecord],
        config: &LineupConfig,
        deadline: Instant,
    ) -> Result<OptimizationOutcome> {
        self.optimize_excluding(pool, config, &[], Some(deadline))
    }

    /// Total variant of [`optimize`](Self::optimize): failures become an
    /// outcome with status `Infeasible` or `Failed`.
    pub fn outcome(&self, pool: &[PlayerRecord], config: &LineupConfig) -> OptimizationOutcome {
        self.optimize(pool, config)
            .unwrap_or_else(|e| OptimizationOutcome::from_error(&e))
    }

    /// Optimize subject to exclusion cuts from earlier lineups.
    pub fn optimize_excluding(
        &self,
        pool: &[PlayerRecord],
        config: &LineupConfig,
        cuts: &[ExclusionCut],
        deadline: Option<Instant>,
    ) -> Result<OptimizationOutcome> {
        let started = Instant::now();
        // A request may defer to the optimizer's engine but never override it
        if config.solver_mode != SolverMode::Auto && config.solver_mode != self.mode {
            return Err(LineupError::Validation(vec![format!(
                "request asks for solver_mode {} but this optimizer runs {}",
                config.solver_mode, self.mode
            )]));
        }
        info!(
            event = "lineup_request",
            players = pool.len(),
            roster_size = config.roster_size,
            mode = %self.mode,
            cuts = cuts.len()
        );

        let resolved = resolve(normalize(pool, config)?, config)?;
        let mut controller = RelaxationController::new();

        let failure = loop {
            let stage = controller.stage();
            let active = controller.config(config);
            let seed = config.heuristic.seed.wrapping_add(stage as u64);

            match self.solve_stage(&resolved, &active, cuts, deadline, seed)? {
                StageOutcome::Solved { picks, status } => {
                    let lineup = assemble(&resolved, &active, cuts, &picks)?;
                    info!(
                        event = "lineup_done",
                        status = %status,
                        stage = %stage,
                        total_score = lineup.total_score(),
                        total_salary = lineup.total_salary(),
                        elapsed_ms = started.elapsed().as_millis() as u64
                    );
                    return Ok(OptimizationOutcome::solved(status, lineup, controller.applied()));
                }
                StageOutcome::Blocked(failure) => {
                    debug!(
                        event = "stage_blocked",
                        stage = %stage,
                        blocking = ?failure.blocking,
                        proven = failure.proven
                    );
                    if controller.advance(config, failure.blocking).is_none() {
                        break failure;
                    }
                }
            }
        };

        warn!(
            event = "lineup_failed",
            stages = controller.visited().len(),
            proven = failure.proven,
            elapsed_ms = started.elapsed().as_millis() as u64
        );
        Err(if failure.proven {
            LineupError::Infeasible {
                stages: controller.visited().to_vec(),
                unsatisfied: failure.violations,
            }
        } else if let Some(seconds) = failure.timed_out {
            LineupError::TimeoutExceeded { seconds }
        } else {
            LineupError::HeuristicExhausted {
                iterations: failure.iterations,
            }
        })
    }

    /// Generate up to `count` lineups, each sharing at most
    /// `roster_size - min_unique` players with every earlier one.
    ///
    /// Stops early, keeping what it has, once no further distinct lineup
    /// can be found.
    pub fn generate(
        &self,
        pool: &[PlayerRecord],
        config: &LineupConfig,
        count: usize,
        min_unique: u32,
    ) -> Result<Vec<OptimizationOutcome>> {
        self.generate_with_exposure(pool, config, count, min_unique, 1.0)
    }

    /// [`generate`](Self::generate) with an exposure limit: no player appears
    /// in more than `ceil(max_exposure * count)` lineups. Locked players are
    /// exempt. A player that reaches the limit is excluded from every later
    /// request.
    pub fn generate_with_exposure(
        &self,
        pool: &[PlayerRecord],
        config: &LineupConfig,
        count: usize,
        min_unique: u32,
        max_exposure: f64,
    ) -> Result<Vec<OptimizationOutcome>> {
        let mut errors = Vec::new();
        if min_unique == 0 || min_unique > config.roster_size {
            errors.push(format!(
                "min_unique {} must be between 1 and roster_size {}",
                min_unique, config.roster_size
            ));
        }
        if !(max_exposure > 0.0 && max_exposure <= 1.0) {
            errors.push(format!("max_exposure {} must be in (0, 1]", max_exposure));
        }
        if !errors.is_empty() {
            return Err(LineupError::Validation(errors));
        }

        // Tolerance keeps 0.3 * 10 at 3 rather than 4
        let limit = ((max_exposure * count as f64 - 1e-9).ceil() as u32).max(1);
        let mut exposure: HashMap<String, u32> = HashMap::new();
        let mut capped: Vec<String> = Vec::new();

        let mut outcomes = Vec::with_capacity(count);
        let mut cuts: Vec<ExclusionCut> = Vec::new();
        for i in 0..count {
            let mut request = config.clone();
            request.heuristic.seed = config
                .heuristic
                .seed
                .wrapping_add((i as u64).wrapping_mul(SEED_STRIDE));
            request.exclude.extend(capped.iter().cloned());

            match self.optimize_excluding(pool, &request, &cuts, None) {
                Ok(outcome) => {
                    if let Some(lineup) = &outcome.lineup {
                        cuts.push(ExclusionCut::from_lineup(lineup, min_unique));
                        for id in lineup.player_ids() {
                            let seen = exposure.entry(id.to_string()).or_default();
                            *seen += 1;
                            if *seen >= limit && !config.must_include.iter().any(|l| l == id) {
                                debug!(event = "exposure_capped", player = id, lineups = *seen);
                                capped.push(id.to_string());
                            }
                        }
                    }
                    outcomes.push(outcome);
                }
                // Exposure exclusions can empty a slot entirely
                Err(
                    e @ (LineupError::Infeasible { .. }
                    | LineupError::HeuristicExhausted { .. }
                    | LineupError::Validation(_)),
                ) if !outcomes.is_empty() =>
                {
                    info!(event = "generation_stopped", produced = outcomes.len(), reason = %e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcomes)
    }

    fn solve_stage(
        &self,
        resolved: &ResolvedPool<'_>,
        config: &LineupConfig,
        cuts: &[ExclusionCut],
        deadline: Option<Instant>,
        seed: u64,
    ) -> Result<StageOutcome> {
        let mut timed_out = None;

        if self.mode != SolverMode::HeuristicOnly {
            let result = match &self.exact {
                Some(exact) => exact.solve(resolved, config, cuts, deadline)?,
                None => ExactResult::SolverUnavailable(
                    self.unavailable
                        .clone()
                        .unwrap_or_else(|| "no exact back end configured".into()),
                ),
            };

            match result {
                ExactResult::Optimal { picks, .. } => {
                    return Ok(StageOutcome::Solved {
                        picks,
                        status: OutcomeStatus::Optimal,
                    })
                }
                ExactResult::TimeoutWithIncumbent { picks, objective } => {
                    // Unproven incumbent: let the heuristic try to beat it
                    let picks = match self.heuristic.run(resolved, config, cuts, deadline, seed) {
                        HeuristicResult::Found {
                            picks: found,
                            objective: score,
                            ..
                        } if score > objective => found,
                        _ => picks,
                    };
                    return Ok(StageOutcome::Solved {
                        picks,
                        status: OutcomeStatus::HeuristicBest,
                    });
                }
                ExactResult::Infeasible {
                    blocking,
                    violations,
                } => {
                    return Ok(StageOutcome::Blocked(StageFailure {
                        blocking,
                        violations,
                        proven: true,
                        iterations: 0,
                        timed_out: None,
                    }))
                }
                ExactResult::TimeoutNoSolution { seconds } => {
                    warn!(event = "exact_fallback", reason = "timeout", seconds);
                    timed_out = Some(seconds);
                }
                ExactResult::SolverUnavailable(reason) => {
                    if self.mode == SolverMode::Exact {
                        return Err(LineupError::SolverUnavailable(reason));
                    }
                    debug!(event = "exact_fallback", reason = %reason);
                }
            }
        }

        Ok(match self.heuristic.run(resolved, config, cuts, deadline, seed) {
            HeuristicResult::Found { picks, .. } => StageOutcome::Solved {
                picks,
                status: OutcomeStatus::HeuristicBest,
            },
            HeuristicResult::Exhausted {
                iterations,
                blocking,
                violations,
                proven,
            } => StageOutcome::Blocked(StageFailure {
                blocking,
                violations,
                proven,
                iterations,
                timed_out,
            }),
        })
    }
}
