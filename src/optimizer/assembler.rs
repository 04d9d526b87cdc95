// Lineup assembler and validator.
//
// Both engines hand back arena indices; nothing leaves the crate as a
// `Lineup` until `audit` finds no violation against the active config.

use std::collections::{BTreeMap, HashSet};

use tracing::error;

use crate::domain::{
    ConstraintClass, ExclusionCut, Lineup, LineupConfig, LineupError, RosterSpot, Slot, Violation,
};

use super::resolver::{counts_toward_stack, ResolvedPool};

/// Check `picks` (assignment indices) against every constraint in `config` and `cuts`.
pub fn audit(
    resolved: &ResolvedPool<'_>,
    config: &LineupConfig,
    cuts: &[ExclusionCut],
    picks: &[usize],
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if picks.iter().any(|&a| a >= resolved.assignments.len()) {
        violations.push(Violation::new(
            ConstraintClass::Assignment,
            "pick outside the assignment arena",
        ));
        return violations;
    }

    if picks.len() as u32 != config.roster_size {
        violations.push(Violation::new(
            ConstraintClass::RosterSize,
            format!("{} players, need {}", picks.len(), config.roster_size),
        ));
    }

    let mut seen = HashSet::new();
    for &a in picks {
        let candidate = resolved.candidate_of(a);
        if !seen.insert(resolved.assignments[a].candidate) {
            violations.push(Violation::new(
                ConstraintClass::Assignment,
                format!("player '{}' fills more than one slot", candidate.id()),
            ));
        }
    }

    let mut slot_counts: BTreeMap<Slot, u32> = BTreeMap::new();
    for &a in picks {
        *slot_counts.entry(resolved.assignments[a].slot).or_default() += 1;
    }
    for (&slot, &need) in &config.position_requirements {
        let have = slot_counts.get(&slot).copied().unwrap_or(0);
        if have != need {
            violations.push(Violation::new(
                ConstraintClass::SlotCount,
                format!("{} filled {} times, need {}", slot, have, need),
            ));
        }
    }
    for (&slot, &have) in &slot_counts {
        if config.required(slot) == 0 {
            violations.push(Violation::new(
                ConstraintClass::SlotCount,
                format!("{} filled {} times but not required", slot, have),
            ));
        }
    }

    let salary: u32 = picks.iter().map(|&a| resolved.assignments[a].salary).sum();
    if salary > config.salary_cap {
        violations.push(Violation::new(
            ConstraintClass::SalaryCap,
            format!("salary ${} exceeds cap ${}", salary, config.salary_cap),
        ));
    }
    if let Some(floor) = config.salary_floor {
        if salary < floor {
            violations.push(Violation::new(
                ConstraintClass::SalaryFloor,
                format!("salary ${} below floor ${}", salary, floor),
            ));
        }
    }

    let mut team_counts = vec![0u32; resolved.teams.len()];
    let mut stack_counts = vec![0u32; resolved.teams.len()];
    for &a in picks {
        let candidate = resolved.candidate_of(a);
        team_counts[candidate.team] += 1;
        if counts_toward_stack(candidate, config) {
            stack_counts[candidate.team] += 1;
        }
    }
    for (team, &count) in team_counts.iter().enumerate() {
        if count > config.max_per_team {
            violations.push(Violation::new(
                ConstraintClass::TeamCap,
                format!(
                    "{} players from {}, max {}",
                    count,
                    resolved.team_code(team),
                    config.max_per_team
                ),
            ));
        }
    }
    if let Some(stack) = config.min_stack_size {
        let largest = stack_counts.iter().copied().max().unwrap_or(0);
        if largest < stack {
            violations.push(Violation::new(
                ConstraintClass::Stack,
                format!("largest stack is {}, need {}", largest, stack),
            ));
        }
    }
    if let Some(min_teams) = config.min_teams {
        let represented = team_counts.iter().filter(|&&c| c > 0).count() as u32;
        if represented < min_teams {
            violations.push(Violation::new(
                ConstraintClass::TeamCoverage,
                format!("{} teams represented, need {}", represented, min_teams),
            ));
        }
    }

    if let Some(limit) = config.max_hitters_vs_pitcher {
        for &a in picks {
            let pitcher = resolved.candidate_of(a);
            let Some(opponent) = pitcher.opponent.filter(|_| pitcher.is_pitcher()) else {
                continue;
            };
            let facing = picks
                .iter()
                .map(|&h| resolved.candidate_of(h))
                .filter(|h| !h.is_pitcher() && h.team == opponent)
                .count() as u32;
            if facing > limit {
                violations.push(Violation::new(
                    ConstraintClass::OpposingHitters,
                    format!(
                        "{} hitters face pitcher '{}', max {}",
                        facing,
                        pitcher.id(),
                        limit
                    ),
                ));
            }
        }
    }

    for candidate in resolved.candidates.iter().filter(|c| c.locked) {
        let present = picks
            .iter()
            .any(|&a| resolved.candidate_of(a).id() == candidate.id());
        if !present {
            violations.push(Violation::new(
                ConstraintClass::Lock,
                format!("locked player '{}' missing", candidate.id()),
            ));
        }
    }

    for cut in cuts {
        let shared = picks
            .iter()
            .filter(|&&a| cut.player_ids.iter().any(|id| id == resolved.candidate_of(a).id()))
            .count() as u32;
        if shared > cut.max_shared {
            violations.push(Violation::new(
                ConstraintClass::Diversity,
                format!(
                    "shares {} players with an earlier lineup, max {}",
                    shared, cut.max_shared
                ),
            ));
        }
    }

    violations
}

/// Re-verify `picks` and build the immutable lineup.
///
/// Any violation here means an engine produced an illegal lineup; it is
/// reported as an invariant violation rather than repaired.
pub fn assemble(
    resolved: &ResolvedPool<'_>,
    config: &LineupConfig,
    cuts: &[ExclusionCut],
    picks: &[usize],
) -> Result<Lineup, LineupError> {
    let violations = audit(resolved, config, cuts, picks);
    if !violations.is_empty() {
        let detail = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        error!(event = "invariant_violation", detail = %detail);
        return Err(LineupError::InvariantViolation(detail));
    }

    let mut ordered: Vec<usize> = picks.to_vec();
    ordered.sort_by(|&a, &b| {
        let (x, y) = (&resolved.assignments[a], &resolved.assignments[b]);
        x.slot.cmp(&y.slot).then(y.salary.cmp(&x.salary))
    });

    let mut team_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut total_salary = 0;
    let mut total_score = 0.0;
    let players = ordered
        .into_iter()
        .map(|a| {
            let assignment = &resolved.assignments[a];
            let candidate = resolved.candidate_of(a);
            *team_counts
                .entry(resolved.team_code(candidate.team).to_string())
                .or_default() += 1;
            total_salary += assignment.salary;
            total_score += assignment.score;
            RosterSpot {
                slot: assignment.slot,
                player: candidate.record.clone(),
                salary: assignment.salary,
                score: assignment.score,
            }
        })
        .collect();

    Ok(Lineup::new(players, total_salary, total_score, team_counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContestFormat, PlayerRecord};
    use crate::optimizer::normalizer::normalize;
    use crate::optimizer::resolver::resolve;

    fn pool() -> Vec<PlayerRecord> {
        vec![
            PlayerRecord::new("p1", "Ace", "NYY", vec![Slot::Pitcher], 9000, 20.0).with_opponent("BOS"),
            PlayerRecord::new("h1", "Slugger", "BOS", vec![Slot::FirstBase, Slot::Outfield], 5000, 10.0),
            PlayerRecord::new("h2", "Speedster", "BOS", vec![Slot::Outfield], 4000, 8.0),
            PlayerRecord::new("h3", "Glove", "NYY", vec![Slot::FirstBase], 3000, 6.0),
        ]
    }

    fn config() -> LineupConfig {
        LineupConfig::new(
            ContestFormat::Classic,
            [(Slot::Pitcher, 1), (Slot::FirstBase, 1), (Slot::Outfield, 1)],
        )
        .with_salary_cap(20_000)
    }

    fn pick(resolved: &ResolvedPool<'_>, id: &str, slot: Slot) -> usize {
        let c = resolved.find(id).unwrap();
        resolved.by_candidate[c]
            .clone()
            .find(|&a| resolved.assignments[a].slot == slot)
            .unwrap()
    }

    #[test]
    fn assembles_slot_ordered_lineup() {
        let records = pool();
        let config = config();
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let picks = vec![
            pick(&resolved, "h2", Slot::Outfield),
            pick(&resolved, "h1", Slot::FirstBase),
            pick(&resolved, "p1", Slot::Pitcher),
        ];

        let lineup = assemble(&resolved, &config, &[], &picks).unwrap();
        let slots: Vec<Slot> = lineup.players().iter().map(|s| s.slot).collect();
        assert_eq!(slots, vec![Slot::Pitcher, Slot::FirstBase, Slot::Outfield]);
        assert_eq!(lineup.total_salary(), 18_000);
        assert_eq!(lineup.team_counts()["BOS"], 2);
        assert_eq!(lineup.max_stack(), 2);
    }

    #[test]
    fn same_player_in_two_slots_is_an_invariant_violation() {
        let records = pool();
        let config = config();
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let picks = vec![
            pick(&resolved, "p1", Slot::Pitcher),
            pick(&resolved, "h1", Slot::FirstBase),
            pick(&resolved, "h1", Slot::Outfield),
        ];

        let err = assemble(&resolved, &config, &[], &picks).unwrap_err();
        assert!(matches!(err, LineupError::InvariantViolation(ref m) if m.contains("more than one slot")));
    }

    #[test]
    fn audit_reports_soft_constraint_classes() {
        let records = pool();
        let mut config = config().with_salary_floor(Some(19_000)).with_max_per_team(1);
        config.max_hitters_vs_pitcher = Some(1);
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let picks = vec![
            pick(&resolved, "p1", Slot::Pitcher),
            pick(&resolved, "h1", Slot::FirstBase),
            pick(&resolved, "h2", Slot::Outfield),
        ];

        let classes: Vec<ConstraintClass> = audit(&resolved, &config, &[], &picks)
            .into_iter()
            .map(|v| v.class)
            .collect();
        assert!(classes.contains(&ConstraintClass::SalaryFloor));
        assert!(classes.contains(&ConstraintClass::TeamCap));
        assert!(classes.contains(&ConstraintClass::OpposingHitters));
        assert!(!classes.contains(&ConstraintClass::SalaryCap));
    }

    #[test]
    fn audit_enforces_exclusion_cuts() {
        let records = pool();
        let config = config();
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let picks = vec![
            pick(&resolved, "p1", Slot::Pitcher),
            pick(&resolved, "h3", Slot::FirstBase),
            pick(&resolved, "h2", Slot::Outfield),
        ];
        let cut = ExclusionCut {
            player_ids: vec!["p1".into(), "h2".into(), "h1".into()],
            max_shared: 1,
        };
        let violations = audit(&resolved, &config, &[cut], &picks);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].class, ConstraintClass::Diversity);
    }
}
