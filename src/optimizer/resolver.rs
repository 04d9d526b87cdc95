// Multi-position resolver.
//
// Each player stays a single record; every (player, slot) pair it may fill
// becomes one entry in an assignment arena. Models and searches work on
// arena indices, so a flexible player can never be counted twice.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::domain::{ContestFormat, LineupConfig, LineupError, Slot};

use super::normalizer::{Candidate, NormalizedPool};

/// One way a candidate can fill a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub candidate: usize,
    pub slot: Slot,
    /// Salary charged in this slot
    pub salary: u32,
    /// Score credited in this slot
    pub score: f64,
}

impl Assignment {
    /// Points per $1000 in this slot
    pub fn value(&self) -> f64 {
        self.score / (self.salary.max(1) as f64 / 1000.0)
    }
}

/// Pool plus its assignment arena.
#[derive(Debug, Clone)]
pub struct ResolvedPool<'a> {
    pub candidates: Vec<Candidate<'a>>,
    pub teams: Vec<String>,
    pub assignments: Vec<Assignment>,
    /// Arena range of each candidate's assignments
    pub by_candidate: Vec<Range<usize>>,
    /// Arena indices per required slot
    pub by_slot: BTreeMap<Slot, Vec<usize>>,
}

impl<'a> ResolvedPool<'a> {
    pub fn candidate_of(&self, assignment: usize) -> &Candidate<'a> {
        &self.candidates[self.assignments[assignment].candidate]
    }

    pub fn assignments_of(&self, candidate: usize) -> &[Assignment] {
        &self.assignments[self.by_candidate[candidate].clone()]
    }

    /// Candidates with more than one eligible slot.
    pub fn is_flexible(&self, candidate: usize) -> bool {
        self.by_candidate[candidate].len() > 1
    }

    pub fn slot_assignments(&self, slot: Slot) -> &[usize] {
        self.by_slot.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn team_code(&self, team: usize) -> &str {
        &self.teams[team]
    }

    pub fn find(&self, id: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c.id() == id)
    }
}

/// Slots `candidate` may fill under `config`.
pub fn eligible_slots(candidate: &Candidate<'_>, config: &LineupConfig) -> Vec<Slot> {
    config
        .position_requirements
        .iter()
        .filter(|&(_, &count)| count > 0)
        .map(|(&slot, _)| slot)
        .filter(|&slot| match config.contest_format {
            // Everyone in a single-game pool can captain or flex
            ContestFormat::SingleGameCaptain => matches!(slot, Slot::Captain | Slot::Util)
                || candidate.record.is_eligible(slot),
            ContestFormat::Classic => {
                candidate.record.is_eligible(slot)
                    || (slot == Slot::Util && !candidate.is_pitcher())
            }
        })
        .collect()
}

/// Whether `candidate` counts toward a team stack. Classic stacks are built
/// from hitters; in a single-game contest every player counts.
pub fn counts_toward_stack(candidate: &Candidate<'_>, config: &LineupConfig) -> bool {
    match config.contest_format {
        ContestFormat::Classic => !candidate.is_pitcher(),
        ContestFormat::SingleGameCaptain => true,
    }
}

/// Build the assignment arena, dropping players who fit no required slot.
pub fn resolve<'a>(
    pool: NormalizedPool<'a>,
    config: &LineupConfig,
) -> Result<ResolvedPool<'a>, LineupError> {
    let mut errors = Vec::new();
    let mut candidates = Vec::with_capacity(pool.candidates.len());
    let mut assignments = Vec::new();
    let mut by_candidate = Vec::with_capacity(pool.candidates.len());
    let mut by_slot: BTreeMap<Slot, Vec<usize>> = config
        .position_requirements
        .iter()
        .filter(|&(_, &count)| count > 0)
        .map(|(&slot, _)| (slot, Vec::new()))
        .collect();

    for candidate in pool.candidates {
        let slots = eligible_slots(&candidate, config);
        if slots.is_empty() {
            if candidate.locked {
                errors.push(format!(
                    "locked player '{}' fits no required slot",
                    candidate.id()
                ));
            }
            continue;
        }

        let index = candidates.len();
        let start = assignments.len();
        for slot in slots {
            by_slot.entry(slot).or_default().push(assignments.len());
            assignments.push(Assignment {
                candidate: index,
                slot,
                salary: config.slot_salary(candidate.record.salary, slot),
                score: candidate.record.score * config.slot_multiplier(slot),
            });
        }
        by_candidate.push(start..assignments.len());
        candidates.push(candidate);
    }

    // Partial shortfalls are left to `diagnose`; an empty slot is a malformed pool
    for (slot, &need) in &config.position_requirements {
        if need > 0 && by_slot.get(slot).map_or(true, Vec::is_empty) {
            errors.push(format!("need {} {}, have 0", need, slot));
        }
    }

    if !errors.is_empty() {
        return Err(LineupError::Validation(errors));
    }

    Ok(ResolvedPool {
        candidates,
        teams: pool.teams,
        assignments,
        by_candidate,
        by_slot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlayerRecord;
    use crate::optimizer::normalizer::normalize;

    fn records() -> Vec<PlayerRecord> {
        vec![
            PlayerRecord::new("p", "Pitcher", "NYY", vec![Slot::Pitcher], 9000, 20.0),
            PlayerRecord::new(
                "flex",
                "Flex",
                "NYY",
                vec![Slot::ThirdBase, Slot::ShortStop],
                4000,
                9.0,
            ),
            PlayerRecord::new("ss", "Short", "BOS", vec![Slot::ShortStop], 3500, 7.0),
            PlayerRecord::new("c", "Catcher", "BOS", vec![Slot::Catcher], 3000, 6.0),
        ]
    }

    #[test]
    fn flexible_player_gets_one_assignment_per_slot() {
        let records = records();
        let config = LineupConfig::new(
            ContestFormat::Classic,
            [(Slot::Pitcher, 1), (Slot::ThirdBase, 1), (Slot::ShortStop, 1)],
        );
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();

        // Catcher fits no required slot and is dropped
        assert_eq!(resolved.candidates.len(), 3);
        let flex = resolved.find("flex").unwrap();
        assert!(resolved.is_flexible(flex));
        let slots: Vec<Slot> = resolved.assignments_of(flex).iter().map(|a| a.slot).collect();
        assert_eq!(slots, vec![Slot::ThirdBase, Slot::ShortStop]);
        assert_eq!(resolved.slot_assignments(Slot::ShortStop).len(), 2);
    }

    #[test]
    fn util_accepts_hitters_only_in_classic() {
        let records = records();
        let config = LineupConfig::new(ContestFormat::Classic, [(Slot::Pitcher, 1), (Slot::Util, 2)]);
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let p = resolved.find("p").unwrap();
        assert_eq!(resolved.assignments_of(p).len(), 1);
        assert_eq!(resolved.slot_assignments(Slot::Util).len(), 3);
    }

    #[test]
    fn captain_assignment_carries_premium() {
        let records = records();
        let config = LineupConfig::new(
            ContestFormat::SingleGameCaptain,
            [(Slot::Captain, 1), (Slot::Util, 3)],
        );
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        let p = resolved.find("p").unwrap();
        let cpt = &resolved.assignments_of(p)[0];
        assert_eq!(cpt.slot, Slot::Captain);
        assert_eq!(cpt.salary, 13_500);
        assert!((cpt.score - 30.0).abs() < 1e-9);
    }

    #[test]
    fn reports_uncovered_slot() {
        let records = records();
        let config = LineupConfig::new(
            ContestFormat::Classic,
            [(Slot::Pitcher, 1), (Slot::Outfield, 3)],
        );
        let err = resolve(normalize(&records, &config).unwrap(), &config).unwrap_err();
        assert!(err.to_string().contains("need 3 OF, have 0"));
    }
}
