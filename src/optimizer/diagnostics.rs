// Cheap structural infeasibility checks.
//
// Every check here is sound: a reported violation proves that no lineup
// satisfies `config`. An empty report proves nothing.

use crate::domain::{ConstraintClass, LineupConfig, Violation};

use super::resolver::{counts_toward_stack, ResolvedPool};

/// Sum of the `count` smallest (or largest) salaries among a slot's assignments.
fn extreme_salaries(resolved: &ResolvedPool<'_>, arena: &[usize], count: usize, cheapest: bool) -> u64 {
    let mut salaries: Vec<u32> = arena.iter().map(|&a| resolved.assignments[a].salary).collect();
    if cheapest {
        salaries.sort_unstable();
    } else {
        salaries.sort_unstable_by(|a, b| b.cmp(a));
    }
    salaries.iter().take(count).map(|&s| s as u64).sum()
}

/// Structural violations of `config` over the resolved pool.
pub fn diagnose(resolved: &ResolvedPool<'_>, config: &LineupConfig) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (&slot, &need) in &config.position_requirements {
        let have = resolved.slot_assignments(slot).len() as u32;
        if have < need {
            violations.push(Violation::new(
                ConstraintClass::SlotCount,
                format!("need {} {}, have {}", need, slot, have),
            ));
        }
    }

    if (resolved.candidates.len() as u32) < config.roster_size {
        violations.push(Violation::new(
            ConstraintClass::RosterSize,
            format!(
                "need {} players, pool has {} eligible",
                config.roster_size,
                resolved.candidates.len()
            ),
        ));
    }

    // Overlapping slot pools only make these bounds looser, never wrong
    let cheapest: u64 = config
        .position_requirements
        .iter()
        .map(|(&slot, &need)| extreme_salaries(resolved, resolved.slot_assignments(slot), need as usize, true))
        .sum();
    if cheapest > config.salary_cap as u64 {
        violations.push(Violation::new(
            ConstraintClass::SalaryCap,
            format!(
                "cheapest legal roster costs at least ${}, cap is ${}",
                cheapest, config.salary_cap
            ),
        ));
    }

    if let Some(floor) = config.salary_floor {
        let priciest: u64 = config
            .position_requirements
            .iter()
            .map(|(&slot, &need)| extreme_salaries(resolved, resolved.slot_assignments(slot), need as usize, false))
            .sum();
        if priciest < floor as u64 {
            violations.push(Violation::new(
                ConstraintClass::SalaryFloor,
                format!(
                    "most expensive roster costs at most ${}, floor is ${}",
                    priciest, floor
                ),
            ));
        }
    }

    let mut team_sizes = vec![0u32; resolved.teams.len()];
    let mut stack_sizes = vec![0u32; resolved.teams.len()];
    let mut locked_per_team = vec![0u32; resolved.teams.len()];
    for candidate in &resolved.candidates {
        team_sizes[candidate.team] += 1;
        if counts_toward_stack(candidate, config) {
            stack_sizes[candidate.team] += 1;
        }
        if candidate.locked {
            locked_per_team[candidate.team] += 1;
        }
    }

    let capacity: u32 = team_sizes.iter().map(|&n| n.min(config.max_per_team)).sum();
    if capacity < config.roster_size {
        violations.push(Violation::new(
            ConstraintClass::TeamCap,
            format!(
                "at most {} players fit under a cap of {} per team, need {}",
                capacity, config.max_per_team, config.roster_size
            ),
        ));
    }
    for (team, &locked) in locked_per_team.iter().enumerate() {
        if locked > config.max_per_team {
            violations.push(Violation::new(
                ConstraintClass::TeamCap,
                format!(
                    "{} locked players from {}, max {}",
                    locked,
                    resolved.team_code(team),
                    config.max_per_team
                ),
            ));
        }
    }

    if let Some(stack) = config.min_stack_size {
        let reachable = stack_sizes
            .iter()
            .any(|&n| n.min(config.max_per_team) >= stack);
        if !reachable {
            violations.push(Violation::new(
                ConstraintClass::Stack,
                format!("no team can supply a {}-player stack", stack),
            ));
        }
    }

    if let Some(min_teams) = config.min_teams {
        let available = team_sizes.iter().filter(|&&n| n > 0).count() as u32;
        if available < min_teams {
            violations.push(Violation::new(
                ConstraintClass::TeamCoverage,
                format!("pool spans {} teams, need {}", available, min_teams),
            ));
        }
    }

    let locked: Vec<usize> = (0..resolved.candidates.len())
        .filter(|&c| resolved.candidates[c].locked)
        .collect();
    let locked_salary: u64 = locked
        .iter()
        .map(|&c| {
            resolved
                .assignments_of(c)
                .iter()
                .map(|a| a.salary)
                .min()
                .unwrap_or(0) as u64
        })
        .sum();
    if locked_salary > config.salary_cap as u64 {
        violations.push(Violation::new(
            ConstraintClass::Lock,
            format!(
                "locked players cost at least ${}, cap is ${}",
                locked_salary, config.salary_cap
            ),
        ));
    }
    for (&slot, &need) in &config.position_requirements {
        let pinned = locked
            .iter()
            .filter(|&&c| {
                let slots = resolved.assignments_of(c);
                slots.len() == 1 && slots[0].slot == slot
            })
            .count() as u32;
        if pinned > need {
            violations.push(Violation::new(
                ConstraintClass::Lock,
                format!("{} locked players only fit {}, which has {} spot(s)", pinned, slot, need),
            ));
        }
    }

    violations
}

/// The class most worth relaxing: the first soft violation, else the first one.
pub fn blocking_class(violations: &[Violation]) -> Option<ConstraintClass> {
    violations
        .iter()
        .find(|v| v.class.is_soft())
        .or_else(|| violations.first())
        .map(|v| v.class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContestFormat, PlayerRecord, Slot};
    use crate::optimizer::normalizer::normalize;
    use crate::optimizer::resolver::resolve;

    fn outfielders(teams: &[&str], salary: u32) -> Vec<PlayerRecord> {
        teams
            .iter()
            .enumerate()
            .map(|(i, team)| {
                PlayerRecord::new(format!("of{}", i), format!("OF {}", i), *team, vec![Slot::Outfield], salary, 5.0)
            })
            .collect()
    }

    #[test]
    fn proves_salary_cap_infeasibility() {
        let records = outfielders(&["A", "B", "C", "D"], 6000);
        let config = LineupConfig::new(ContestFormat::Classic, [(Slot::Outfield, 3)]).with_salary_cap(15_000);
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let violations = diagnose(&resolved, &config);
        assert_eq!(blocking_class(&violations), Some(ConstraintClass::SalaryCap));
        assert!(violations[0].message.contains("$18000"));
    }

    #[test]
    fn prefers_soft_classes_for_blocking() {
        let records = outfielders(&["A", "A", "A", "B"], 3000);
        let config = LineupConfig::new(ContestFormat::Classic, [(Slot::Outfield, 3)])
            .with_max_per_team(1)
            .with_salary_floor(Some(9500))
            .with_salary_cap(10_000);
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let violations = diagnose(&resolved, &config);
        let classes: Vec<_> = violations.iter().map(|v| v.class).collect();
        assert!(classes.contains(&ConstraintClass::TeamCap));
        assert!(classes.contains(&ConstraintClass::SalaryFloor));
        assert!(blocking_class(&violations).unwrap().is_soft());
    }

    #[test]
    fn feasible_pool_reports_nothing() {
        let records = outfielders(&["A", "B", "C"], 3000);
        let config = LineupConfig::new(ContestFormat::Classic, [(Slot::Outfield, 3)]).with_max_per_team(1);
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        assert!(diagnose(&resolved, &config).is_empty());
    }

    #[test]
    fn reports_short_slot_pool() {
        let records = outfielders(&["A"], 3000);
        let config = LineupConfig::new(ContestFormat::Classic, [(Slot::Outfield, 3)]);
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let violations = diagnose(&resolved, &config);
        assert_eq!(violations[0].class, ConstraintClass::SlotCount);
        assert_eq!(violations[0].message, "need 3 OF, have 1");
        assert!(violations.iter().any(|v| v.class == ConstraintClass::RosterSize));
    }
}
