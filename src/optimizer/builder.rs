// Constraint model builder: translates a resolved pool and a LineupConfig into
// a binary integer program.
//
// Columns:
//   x_i  one selection variable per candidate
//   y_a  one assignment variable per arena entry of a flexible candidate;
//        a candidate with a single eligible slot reuses x_i as its assignment
//   z_t  stack indicator per team able to supply a stack
//   w_t  presence indicator per team (team coverage only)

use crate::domain::{
    Constraint, ConstraintClass, ConstraintType, ExclusionCut, LineupConfig, OptimizationProblem,
    SolverConfig,
};

use super::resolver::{counts_toward_stack, ResolvedPool};

/// Where each model concept lives in the column space.
#[derive(Debug, Clone, Default)]
pub struct VariableLayout {
    /// Selection column per candidate
    pub selection: Vec<usize>,
    /// Column per arena entry
    pub assignment: Vec<usize>,
    /// `(team, column)` stack indicators
    pub stack: Vec<(usize, usize)>,
    /// `(team, column)` presence indicators
    pub presence: Vec<(usize, usize)>,
}

/// The integer program for one relaxation state.
#[derive(Debug, Clone)]
pub struct LineupModel {
    pub problem: OptimizationProblem,
    pub layout: VariableLayout,
}

/// Build the model for `config`. Soft constraints absent from `config` are
/// simply not emitted; relaxation happens by handing in a looser config.
pub fn build_model(
    resolved: &ResolvedPool<'_>,
    config: &LineupConfig,
    cuts: &[ExclusionCut],
) -> LineupModel {
    let mut problem = OptimizationProblem::new("lineup").with_config(SolverConfig {
        backend: config.solver_backend,
        time_limit: Some(config.timeout_seconds as f64),
        gap_tolerance: config.mip_gap,
        verbose: false,
    });
    let mut layout = VariableLayout {
        assignment: vec![usize::MAX; resolved.assignments.len()],
        ..VariableLayout::default()
    };

    for (c, candidate) in resolved.candidates.iter().enumerate() {
        let range = resolved.by_candidate[c].clone();
        if resolved.is_flexible(c) {
            let x = problem.add_binary(format!("x_{}", candidate.id()), 0.0);
            layout.selection.push(x);
            for a in range {
                let assignment = &resolved.assignments[a];
                layout.assignment[a] = problem.add_binary(
                    format!("y_{}_{}", candidate.id(), assignment.slot),
                    assignment.score,
                );
            }
        } else {
            let a = range.start;
            let x = problem.add_binary(format!("x_{}", candidate.id()), resolved.assignments[a].score);
            layout.selection.push(x);
            layout.assignment[a] = x;
        }
    }

    add_roster_rows(&mut problem, &layout, resolved, config);
    add_salary_rows(&mut problem, &layout, resolved, config);
    add_team_rows(&mut problem, &mut layout, resolved, config);
    add_lock_and_cut_rows(&mut problem, &layout, resolved, cuts);

    LineupModel { problem, layout }
}

fn add_roster_rows(
    problem: &mut OptimizationProblem,
    layout: &VariableLayout,
    resolved: &ResolvedPool<'_>,
    config: &LineupConfig,
) {
    problem.add_constraint(
        Constraint::new(
            ConstraintClass::RosterSize,
            ConstraintType::Equal,
            layout.selection.iter().map(|&x| (x, 1.0)).collect(),
            config.roster_size as f64,
        )
        .with_name("roster_size"),
    );

    // Σ y_a == x_i: a selected flexible player occupies exactly one slot
    for (c, candidate) in resolved.candidates.iter().enumerate() {
        if !resolved.is_flexible(c) {
            continue;
        }
        let mut terms: Vec<(usize, f64)> = resolved.by_candidate[c]
            .clone()
            .map(|a| (layout.assignment[a], 1.0))
            .collect();
        terms.push((layout.selection[c], -1.0));
        problem.add_constraint(
            Constraint::new(ConstraintClass::Assignment, ConstraintType::Equal, terms, 0.0)
                .with_name(format!("assign_{}", candidate.id())),
        );
    }

    for (&slot, &need) in &config.position_requirements {
        let terms = resolved
            .slot_assignments(slot)
            .iter()
            .map(|&a| (layout.assignment[a], 1.0))
            .collect();
        problem.add_constraint(
            Constraint::new(ConstraintClass::SlotCount, ConstraintType::Equal, terms, need as f64)
                .with_name(format!("slot_{}", slot)),
        );
    }
}

fn add_salary_rows(
    problem: &mut OptimizationProblem,
    layout: &VariableLayout,
    resolved: &ResolvedPool<'_>,
    config: &LineupConfig,
) {
    let salary: Vec<(usize, f64)> = resolved
        .assignments
        .iter()
        .enumerate()
        .map(|(a, assignment)| (layout.assignment[a], assignment.salary as f64))
        .collect();

    if let Some(floor) = config.salary_floor {
        problem.add_constraint(
            Constraint::new(
                ConstraintClass::SalaryFloor,
                ConstraintType::GreaterThanOrEqual,
                salary.clone(),
                floor as f64,
            )
            .with_name("salary_floor"),
        );
    }
    problem.add_constraint(
        Constraint::new(
            ConstraintClass::SalaryCap,
            ConstraintType::LessThanOrEqual,
            salary,
            config.salary_cap as f64,
        )
        .with_name("salary_cap"),
    );
}

fn add_team_rows(
    problem: &mut OptimizationProblem,
    layout: &mut VariableLayout,
    resolved: &ResolvedPool<'_>,
    config: &LineupConfig,
) {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); resolved.teams.len()];
    let mut stackable: Vec<Vec<usize>> = vec![Vec::new(); resolved.teams.len()];
    for (c, candidate) in resolved.candidates.iter().enumerate() {
        members[candidate.team].push(c);
        if counts_toward_stack(candidate, config) {
            stackable[candidate.team].push(c);
        }
    }

    for (team, players) in members.iter().enumerate() {
        if players.len() as u32 <= config.max_per_team {
            continue;
        }
        problem.add_constraint(
            Constraint::new(
                ConstraintClass::TeamCap,
                ConstraintType::LessThanOrEqual,
                players.iter().map(|&c| (layout.selection[c], 1.0)).collect(),
                config.max_per_team as f64,
            )
            .with_name(format!("team_cap_{}", resolved.team_code(team))),
        );
    }

    // Big-M link: z_t = 1 forces at least `stack` stackable players from t
    if let Some(stack) = config.min_stack_size {
        let k = stack as f64;
        for (team, players) in stackable.iter().enumerate() {
            if (players.len() as u32) < stack {
                continue;
            }
            let z = problem.add_binary(format!("stack_{}", resolved.team_code(team)), 0.0);
            layout.stack.push((team, z));
            let mut terms: Vec<(usize, f64)> =
                players.iter().map(|&c| (layout.selection[c], 1.0)).collect();
            terms.push((z, -k));
            problem.add_constraint(
                Constraint::new(ConstraintClass::Stack, ConstraintType::GreaterThanOrEqual, terms, 0.0)
                    .with_name(format!("stack_link_{}", resolved.team_code(team))),
            );
        }
        problem.add_constraint(
            Constraint::new(
                ConstraintClass::Stack,
                ConstraintType::GreaterThanOrEqual,
                layout.stack.iter().map(|&(_, z)| (z, 1.0)).collect(),
                1.0,
            )
            .with_name("stack_required"),
        );
    }

    // Selected pitcher p: Σ opposing hitters ≤ limit, otherwise unrestricted
    if let Some(limit) = config.max_hitters_vs_pitcher {
        for (p, pitcher) in resolved.candidates.iter().enumerate() {
            let Some(opponent) = pitcher.opponent.filter(|_| pitcher.is_pitcher()) else {
                continue;
            };
            let hitters: Vec<usize> = members
                .get(opponent)
                .map(|team| {
                    team.iter()
                        .copied()
                        .filter(|&h| !resolved.candidates[h].is_pitcher())
                        .collect()
                })
                .unwrap_or_default();
            let m = hitters.len() as f64;
            if hitters.len() as u32 <= limit {
                continue;
            }
            let mut terms: Vec<(usize, f64)> =
                hitters.iter().map(|&h| (layout.selection[h], 1.0)).collect();
            terms.push((layout.selection[p], m));
            problem.add_constraint(
                Constraint::new(
                    ConstraintClass::OpposingHitters,
                    ConstraintType::LessThanOrEqual,
                    terms,
                    limit as f64 + m,
                )
                .with_name(format!("vs_pitcher_{}", pitcher.id())),
            );
        }
    }

    if let Some(min_teams) = config.min_teams.filter(|&n| n > 1) {
        for (team, players) in members.iter().enumerate() {
            if players.is_empty() {
                continue;
            }
            let w = problem.add_binary(format!("present_{}", resolved.team_code(team)), 0.0);
            layout.presence.push((team, w));
            let mut terms: Vec<(usize, f64)> =
                players.iter().map(|&c| (layout.selection[c], 1.0)).collect();
            terms.push((w, -1.0));
            problem.add_constraint(
                Constraint::new(
                    ConstraintClass::TeamCoverage,
                    ConstraintType::GreaterThanOrEqual,
                    terms,
                    0.0,
                )
                .with_name(format!("present_link_{}", resolved.team_code(team))),
            );
        }
        problem.add_constraint(
            Constraint::new(
                ConstraintClass::TeamCoverage,
                ConstraintType::GreaterThanOrEqual,
                layout.presence.iter().map(|&(_, w)| (w, 1.0)).collect(),
                min_teams as f64,
            )
            .with_name("min_teams"),
        );
    }
}

fn add_lock_and_cut_rows(
    problem: &mut OptimizationProblem,
    layout: &VariableLayout,
    resolved: &ResolvedPool<'_>,
    cuts: &[ExclusionCut],
) {
    for (c, candidate) in resolved.candidates.iter().enumerate() {
        if candidate.locked {
            problem.add_constraint(
                Constraint::new(
                    ConstraintClass::Lock,
                    ConstraintType::Equal,
                    vec![(layout.selection[c], 1.0)],
                    1.0,
                )
                .with_name(format!("lock_{}", candidate.id())),
            );
        }
    }

    for (i, cut) in cuts.iter().enumerate() {
        let terms: Vec<(usize, f64)> = cut
            .player_ids
            .iter()
            .filter_map(|id| resolved.find(id))
            .map(|c| (layout.selection[c], 1.0))
            .collect();
        if terms.len() as u32 <= cut.max_shared {
            continue;
        }
        problem.add_constraint(
            Constraint::new(
                ConstraintClass::Diversity,
                ConstraintType::LessThanOrEqual,
                terms,
                cut.max_shared as f64,
            )
            .with_name(format!("diversity_{}", i)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContestFormat, PlayerRecord, Slot};
    use crate::optimizer::normalizer::normalize;
    use crate::optimizer::resolver::resolve;

    fn records() -> Vec<PlayerRecord> {
        vec![
            PlayerRecord::new("p1", "Ace", "NYY", vec![Slot::Pitcher], 9000, 20.0).with_opponent("BOS"),
            PlayerRecord::new("p2", "Deuce", "BOS", vec![Slot::Pitcher], 8000, 18.0).with_opponent("NYY"),
            PlayerRecord::new("f1", "Flex", "NYY", vec![Slot::ThirdBase, Slot::ShortStop], 4000, 9.0),
            PlayerRecord::new("s1", "Short", "BOS", vec![Slot::ShortStop], 3500, 7.0),
            PlayerRecord::new("t1", "Third", "BOS", vec![Slot::ThirdBase], 3000, 6.0),
        ]
    }

    fn config() -> LineupConfig {
        LineupConfig::new(
            ContestFormat::Classic,
            [(Slot::Pitcher, 1), (Slot::ThirdBase, 1), (Slot::ShortStop, 1)],
        )
    }

    #[test]
    fn flexible_player_gets_link_row_and_no_duplicate_columns() {
        let records = records();
        let config = config();
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let model = build_model(&resolved, &config, &[]);

        // 5 selections + 2 assignments for the flexible player
        assert_eq!(model.problem.num_variables(), 7);
        let links: Vec<_> = model.problem.constraints_of(ConstraintClass::Assignment).collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].terms.len(), 3);

        let f1 = resolved.find("f1").unwrap();
        let x = model.layout.selection[f1];
        for a in resolved.by_candidate[f1].clone() {
            assert_ne!(model.layout.assignment[a], x);
        }
        // Flexible selection carries no objective weight of its own
        assert_eq!(model.problem.objective.coefficients[x], 0.0);
    }

    #[test]
    fn omits_relaxed_and_slack_rows() {
        let records = records();
        let config = config();
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let model = build_model(&resolved, &config, &[]);

        // Default cap of 4 per team is never binding with 2-3 players per team
        assert_eq!(model.problem.constraints_of(ConstraintClass::TeamCap).count(), 0);
        assert_eq!(model.problem.constraints_of(ConstraintClass::SalaryFloor).count(), 0);
        assert_eq!(model.problem.constraints_of(ConstraintClass::Stack).count(), 0);
    }

    #[test]
    fn emits_stack_opponent_lock_and_cut_rows() {
        let records = records();
        let mut config = config().with_max_per_team(2).with_min_stack(Some(2)).with_lock("s1");
        config.max_hitters_vs_pitcher = Some(0);
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let cut = ExclusionCut {
            player_ids: vec!["p1".into(), "f1".into(), "s1".into()],
            max_shared: 2,
        };
        let model = build_model(&resolved, &config, &[cut]);

        assert_eq!(model.problem.constraints_of(ConstraintClass::TeamCap).count(), 1);
        // Only BOS has two hitters
        assert_eq!(model.layout.stack.len(), 1);
        assert_eq!(model.problem.constraints_of(ConstraintClass::Stack).count(), 2);
        assert_eq!(
            model.problem.constraints_of(ConstraintClass::OpposingHitters).count(),
            2
        );
        assert_eq!(model.problem.constraints_of(ConstraintClass::Lock).count(), 1);
        assert_eq!(model.problem.constraints_of(ConstraintClass::Diversity).count(), 1);
    }
}
