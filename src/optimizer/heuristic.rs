// Heuristic optimizer: bounded, seeded, randomized construction.
//
// Each iteration places locks, optionally seeds a team stack, then fills the
// most constrained open slot with a weighted draw among the best-value
// candidates that still fit. A short upgrade pass follows, and the result is
// audited against the full constraint set. Nothing is relaxed in here.

use std::collections::BTreeMap;
use std::time::Instant;

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::domain::{ConstraintClass, ExclusionCut, LineupConfig, Slot, Violation};

use super::assembler::audit;
use super::diagnostics::{blocking_class, diagnose};
use super::resolver::{counts_toward_stack, ResolvedPool};

/// Keeps zero-value candidates drawable.
const WEIGHT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum HeuristicResult {
    Found {
        picks: Vec<usize>,
        objective: f64,
        iterations: u32,
    },
    Exhausted {
        iterations: u32,
        blocking: Option<ConstraintClass>,
        violations: Vec<Violation>,
        /// The violations are a proof of infeasibility, not just failed attempts
        proven: bool,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicOptimizer;

impl HeuristicOptimizer {
    pub fn new() -> Self {
        Self
    }

    /// Run up to `config.heuristic.max_iterations` constructions seeded with
    /// `seed`. Identical inputs and seed give identical picks.
    pub fn run(
        &self,
        resolved: &ResolvedPool<'_>,
        config: &LineupConfig,
        cuts: &[ExclusionCut],
        deadline: Option<Instant>,
        seed: u64,
    ) -> HeuristicResult {
        let violations = diagnose(resolved, config);
        if !violations.is_empty() {
            return HeuristicResult::Exhausted {
                iterations: 0,
                blocking: blocking_class(&violations),
                violations,
                proven: true,
            };
        }

        let search = Search::new(resolved, config, cuts);
        let settings = &config.heuristic;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tally: BTreeMap<ConstraintClass, u32> = BTreeMap::new();
        let mut best: Option<(Vec<usize>, f64)> = None;
        let mut iterations = 0;
        let mut improvements = 0;
        let mut stale = 0;

        while iterations < settings.max_iterations {
            if iterations > 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                debug!(event = "heuristic_deadline", iterations);
                break;
            }
            iterations += 1;

            match search.construct(&mut rng, &mut tally) {
                Some(picks) => {
                    let score: f64 = picks.iter().map(|&a| resolved.assignments[a].score).sum();
                    if best.as_ref().map_or(true, |(_, b)| score > *b + 1e-9) {
                        best = Some((picks, score));
                        improvements += 1;
                        stale = 0;
                    } else {
                        stale += 1;
                    }
                }
                None if best.is_some() => stale += 1,
                None => {}
            }
            if best.is_some() && stale >= settings.max_stale_iterations {
                break;
            }
        }

        debug!(
            event = "heuristic_summary",
            iterations,
            improvements,
            rejected = tally.values().sum::<u32>(),
            best_score = best.as_ref().map_or(0.0, |(_, s)| *s)
        );

        match best {
            Some((picks, objective)) => HeuristicResult::Found {
                picks,
                objective,
                iterations,
            },
            None => {
                let violations = tally
                    .iter()
                    .map(|(&class, &count)| {
                        Violation::new(
                            class,
                            format!("{} of {} constructions failed here", count, iterations),
                        )
                    })
                    .collect();
                HeuristicResult::Exhausted {
                    iterations,
                    blocking: dominant(&tally),
                    violations,
                    proven: false,
                }
            }
        }
    }
}

/// Most frequent soft rejection, else most frequent overall.
fn dominant(tally: &BTreeMap<ConstraintClass, u32>) -> Option<ConstraintClass> {
    let most = |soft_only: bool| {
        tally
            .iter()
            .filter(|(class, _)| !soft_only || class.is_soft())
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&class, _)| class)
    };
    most(true).or_else(|| most(false))
}

/// Per-request lookups shared by every iteration.
struct Search<'p, 'a> {
    resolved: &'p ResolvedPool<'a>,
    config: &'p LineupConfig,
    cuts: &'p [ExclusionCut],
    /// Required slots in slot order
    slots: Vec<Slot>,
    /// Per slot, arena indices by ascending salary
    by_salary: Vec<Vec<usize>>,
    /// Per team, stack-eligible candidates by descending score
    stackable: Vec<Vec<usize>>,
    locked: Vec<usize>,
    /// Per cut, membership per candidate
    cut_members: Vec<Vec<bool>>,
}

/// Cheapest untaken `(candidate, salary)` entries per slot, one more than
/// the slot still needs so a single exclusion can be skipped.
type SalaryFloor = Vec<Vec<(usize, u32)>>;

impl<'p, 'a> Search<'p, 'a> {
    fn new(resolved: &'p ResolvedPool<'a>, config: &'p LineupConfig, cuts: &'p [ExclusionCut]) -> Self {
        let slots: Vec<Slot> = config
            .position_requirements
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(&slot, _)| slot)
            .collect();

        let by_salary = slots
            .iter()
            .map(|&slot| {
                let mut arena = resolved.slot_assignments(slot).to_vec();
                arena.sort_by_key(|&a| (resolved.assignments[a].salary, a));
                arena
            })
            .collect();

        let mut stackable = vec![Vec::new(); resolved.teams.len()];
        for (c, candidate) in resolved.candidates.iter().enumerate() {
            if counts_toward_stack(candidate, config) {
                stackable[candidate.team].push(c);
            }
        }
        for team in &mut stackable {
            team.sort_by(|&a, &b| {
                let (x, y) = (&resolved.candidates[a], &resolved.candidates[b]);
                y.record.score.total_cmp(&x.record.score).then(a.cmp(&b))
            });
        }

        let locked = (0..resolved.candidates.len())
            .filter(|&c| resolved.candidates[c].locked)
            .collect();

        let cut_members = cuts
            .iter()
            .map(|cut| {
                let mut members = vec![false; resolved.candidates.len()];
                for id in &cut.player_ids {
                    if let Some(c) = resolved.find(id) {
                        members[c] = true;
                    }
                }
                members
            })
            .collect();

        Self {
            resolved,
            config,
            cuts,
            slots,
            by_salary,
            stackable,
            locked,
            cut_members,
        }
    }

    fn slot_index(&self, slot: Slot) -> Option<usize> {
        self.slots.binary_search(&slot).ok()
    }

    fn empty(&self) -> Partial {
        Partial {
            picks: Vec::with_capacity(self.config.roster_size as usize),
            taken: vec![false; self.resolved.candidates.len()],
            open: self.slots.iter().map(|&s| self.config.required(s)).collect(),
            salary: 0,
            team_counts: vec![0; self.resolved.teams.len()],
            stack_counts: vec![0; self.resolved.teams.len()],
            hitters: vec![0; self.resolved.teams.len()],
            pitchers_facing: vec![0; self.resolved.teams.len()],
            shared: vec![0; self.cuts.len()],
        }
    }

    fn salary_floor(&self, partial: &Partial) -> SalaryFloor {
        self.by_salary
            .iter()
            .zip(&partial.open)
            .map(|(arena, &open)| {
                arena
                    .iter()
                    .map(|&a| &self.resolved.assignments[a])
                    .filter(|assignment| !partial.taken[assignment.candidate])
                    .take(open as usize + 1)
                    .map(|assignment| (assignment.candidate, assignment.salary))
                    .collect()
            })
            .collect()
    }

    /// Whether assignment `a` can join `partial`, or the class that forbids it.
    fn fits(&self, partial: &Partial, floor: &SalaryFloor, a: usize) -> Result<(), ConstraintClass> {
        let assignment = &self.resolved.assignments[a];
        let c = assignment.candidate;
        let candidate = &self.resolved.candidates[c];

        if partial.taken[c] {
            return Err(ConstraintClass::Assignment);
        }
        let s = self.slot_index(assignment.slot).ok_or(ConstraintClass::SlotCount)?;
        if partial.open[s] == 0 {
            return Err(ConstraintClass::SlotCount);
        }
        if partial.team_counts[candidate.team] >= self.config.max_per_team {
            return Err(ConstraintClass::TeamCap);
        }
        if let Some(limit) = self.config.max_hitters_vs_pitcher {
            if candidate.is_pitcher() {
                if let Some(opponent) = candidate.opponent {
                    if partial.hitters[opponent] > limit {
                        return Err(ConstraintClass::OpposingHitters);
                    }
                }
            } else if partial.pitchers_facing[candidate.team] > 0
                && partial.hitters[candidate.team] >= limit
            {
                return Err(ConstraintClass::OpposingHitters);
            }
        }
        for (k, cut) in self.cuts.iter().enumerate() {
            if self.cut_members[k][c] && partial.shared[k] >= cut.max_shared {
                return Err(ConstraintClass::Diversity);
            }
        }

        // Cheapest completion of every other open slot must still fit under the cap
        let mut committed = partial.salary as u64 + assignment.salary as u64;
        for (j, cheapest) in floor.iter().enumerate() {
            let need = partial.open[j] - u32::from(j == s);
            let mut found = 0;
            for &(other, salary) in cheapest {
                if found == need {
                    break;
                }
                if other != c {
                    committed += salary as u64;
                    found += 1;
                }
            }
            if found < need {
                return Err(ConstraintClass::SlotCount);
            }
        }
        if committed > self.config.salary_cap as u64 {
            return Err(ConstraintClass::SalaryCap);
        }
        Ok(())
    }

    /// Stack and team-coverage requirements, which only a full roster can meet.
    fn roster_shape_ok(&self, partial: &Partial) -> bool {
        let stack_ok = self
            .config
            .min_stack_size
            .map_or(true, |k| partial.stack_counts.iter().any(|&n| n >= k));
        let teams_ok = self.config.min_teams.map_or(true, |n| {
            partial.team_counts.iter().filter(|&&count| count > 0).count() as u32 >= n
        });
        stack_ok && teams_ok
    }

    /// One randomized construction. Rejections are added to `tally`.
    fn construct(&self, rng: &mut StdRng, tally: &mut BTreeMap<ConstraintClass, u32>) -> Option<Vec<usize>> {
        let mut partial = self.empty();
        if let Err(class) = self.build(&mut partial, rng) {
            *tally.entry(class).or_default() += 1;
            return None;
        }
        self.upgrade(&mut partial);

        let violations = audit(self.resolved, self.config, self.cuts, &partial.picks);
        if violations.is_empty() {
            Some(partial.picks)
        } else {
            for violation in violations {
                *tally.entry(violation.class).or_default() += 1;
            }
            None
        }
    }

    fn build(&self, partial: &mut Partial, rng: &mut StdRng) -> Result<(), ConstraintClass> {
        self.place_locks(partial)?;
        self.seed_stack(partial, rng)?;
        self.fill(partial, rng)
    }

    /// Locks go in first, each in its best-scoring slot that still fits.
    fn place_locks(&self, partial: &mut Partial) -> Result<(), ConstraintClass> {
        for &c in &self.locked {
            let floor = self.salary_floor(partial);
            let mut options: Vec<usize> = self.resolved.by_candidate[c].clone().collect();
            options.sort_by(|&a, &b| {
                let (x, y) = (&self.resolved.assignments[a], &self.resolved.assignments[b]);
                y.score.total_cmp(&x.score).then(a.cmp(&b))
            });
            let mut blocked = ConstraintClass::Lock;
            let mut placed = None;
            for a in options {
                match self.fits(partial, &floor, a) {
                    Ok(()) => {
                        placed = Some(a);
                        break;
                    }
                    Err(class) => blocked = class,
                }
            }
            partial.apply(self, placed.ok_or(blocked)?);
        }
        Ok(())
    }

    /// Seed a stack from one team, picked with probability proportional to
    /// the combined score of its best `k` players.
    fn seed_stack(&self, partial: &mut Partial, rng: &mut StdRng) -> Result<(), ConstraintClass> {
        let settings = &self.config.heuristic;
        let required = self.config.min_stack_size;
        let size = match required {
            Some(k) => k,
            None if settings.stack_probability > 0.0 && rng.random_bool(settings.stack_probability) => {
                settings.preferred_stack_size
            }
            None => return Ok(()),
        }
        .min(self.config.max_per_team);
        if size == 0 {
            return Ok(());
        }

        let mut teams = Vec::new();
        let mut weights = Vec::new();
        for (team, members) in self.stackable.iter().enumerate() {
            let open: Vec<usize> = members.iter().copied().filter(|&c| !partial.taken[c]).collect();
            if partial.stack_counts[team] + open.len() as u32 >= size {
                let top: f64 = open
                    .iter()
                    .take(size as usize)
                    .map(|&c| self.resolved.candidates[c].record.score)
                    .sum();
                teams.push(team);
                weights.push(top + WEIGHT_EPSILON);
            }
        }
        let Ok(dist) = WeightedIndex::new(&weights) else {
            return if required.is_some() {
                Err(ConstraintClass::Stack)
            } else {
                Ok(())
            };
        };
        let team = teams[dist.sample(rng)];

        for &c in &self.stackable[team] {
            if partial.stack_counts[team] >= size {
                break;
            }
            if partial.taken[c] {
                continue;
            }
            let floor = self.salary_floor(partial);
            // Keep UTIL open for the fill where possible
            let mut options: Vec<usize> = self.resolved.by_candidate[c].clone().collect();
            options.sort_by_key(|&a| (self.resolved.assignments[a].slot == Slot::Util, a));
            if let Some(a) = options.into_iter().find(|&a| self.fits(partial, &floor, a).is_ok()) {
                partial.apply(self, a);
            }
        }

        if required.is_some() && partial.stack_counts[team] < size {
            return Err(ConstraintClass::Stack);
        }
        Ok(())
    }

    /// Greedy fill: most constrained slot first, weighted draw among the
    /// top `candidate_pool` options by value.
    fn fill(&self, partial: &mut Partial, rng: &mut StdRng) -> Result<(), ConstraintClass> {
        while partial.open.iter().any(|&n| n > 0) {
            let floor = self.salary_floor(partial);
            let mut chosen: Option<(usize, Vec<usize>)> = None;

            for (j, &slot) in self.slots.iter().enumerate() {
                let open = partial.open[j];
                if open == 0 {
                    continue;
                }
                let mut rejected: BTreeMap<ConstraintClass, u32> = BTreeMap::new();
                let feasible: Vec<usize> = self
                    .resolved
                    .slot_assignments(slot)
                    .iter()
                    .copied()
                    .filter(|&a| match self.fits(partial, &floor, a) {
                        Ok(()) => true,
                        Err(class) => {
                            if class != ConstraintClass::Assignment {
                                *rejected.entry(class).or_default() += 1;
                            }
                            false
                        }
                    })
                    .collect();
                if feasible.is_empty() {
                    return Err(rejected
                        .iter()
                        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                        .map_or(ConstraintClass::SlotCount, |(&class, _)| class));
                }

                let tighter = chosen.as_ref().map_or(true, |(k, options)| {
                    (feasible.len() as u64) * (partial.open[*k] as u64)
                        < (options.len() as u64) * (open as u64)
                });
                if tighter {
                    chosen = Some((j, feasible));
                }
            }

            let Some((_, mut options)) = chosen else {
                break;
            };
            options.sort_by(|&a, &b| {
                let (x, y) = (&self.resolved.assignments[a], &self.resolved.assignments[b]);
                y.value().total_cmp(&x.value()).then(a.cmp(&b))
            });
            options.truncate(self.config.heuristic.candidate_pool.max(1));
            let weights: Vec<f64> = options
                .iter()
                .map(|&a| self.resolved.assignments[a].value().powi(2) + WEIGHT_EPSILON)
                .collect();
            let pick = match WeightedIndex::new(&weights) {
                Ok(dist) => options[dist.sample(rng)],
                Err(_) => options[0],
            };
            partial.apply(self, pick);
        }
        Ok(())
    }

    /// Swap picks for better alternates in the same slot while every
    /// constraint keeps holding. Below the salary floor, alternates that
    /// raise salary are taken first.
    fn upgrade(&self, partial: &mut Partial) {
        for _ in 0..self.config.heuristic.upgrade_passes {
            let mut improved = false;
            let mut order = partial.picks.clone();
            order.sort_by(|&a, &b| {
                let (x, y) = (&self.resolved.assignments[a], &self.resolved.assignments[b]);
                x.score.total_cmp(&y.score).then(a.cmp(&b))
            });

            for current in order {
                let held = &self.resolved.assignments[current];
                if self.resolved.candidates[held.candidate].locked {
                    continue;
                }
                let Some(position) = partial.picks.iter().position(|&a| a == current) else {
                    continue;
                };
                let below_floor = self.config.salary_floor.is_some_and(|f| partial.salary < f);
                let shaped = self.roster_shape_ok(partial);
                partial.remove(self, position);

                let floor = self.salary_floor(partial);
                let mut alternates: Vec<usize> = self
                    .resolved
                    .slot_assignments(held.slot)
                    .iter()
                    .copied()
                    .filter(|&a| a != current)
                    .filter(|&a| {
                        let alt = &self.resolved.assignments[a];
                        let salary = partial.salary + alt.salary;
                        if below_floor {
                            alt.salary > held.salary
                        } else {
                            alt.score > held.score + 1e-9
                                && self.config.salary_floor.map_or(true, |f| salary >= f)
                        }
                    })
                    .filter(|&a| self.fits(partial, &floor, a).is_ok())
                    .collect();
                alternates.sort_by(|&a, &b| {
                    let (x, y) = (&self.resolved.assignments[a], &self.resolved.assignments[b]);
                    y.score.total_cmp(&x.score).then(a.cmp(&b))
                });

                let mut replaced = false;
                for alt in alternates {
                    partial.apply(self, alt);
                    if !shaped || self.roster_shape_ok(partial) {
                        replaced = true;
                        break;
                    }
                    let last = partial.picks.len() - 1;
                    partial.remove(self, last);
                }
                if replaced {
                    improved = true;
                } else {
                    partial.apply(self, current);
                }
            }
            if !improved {
                break;
            }
        }
    }
}

/// A roster under construction, with running counters.
#[derive(Debug, Clone)]
struct Partial {
    picks: Vec<usize>,
    taken: Vec<bool>,
    open: Vec<u32>,
    salary: u32,
    team_counts: Vec<u32>,
    stack_counts: Vec<u32>,
    /// Hitters picked per team
    hitters: Vec<u32>,
    /// Picked pitchers whose opponent is this team
    pitchers_facing: Vec<u32>,
    shared: Vec<u32>,
}

impl Partial {
    fn apply(&mut self, search: &Search<'_, '_>, a: usize) {
        self.update(search, a, true);
        self.picks.push(a);
    }

    fn remove(&mut self, search: &Search<'_, '_>, position: usize) {
        let a = self.picks.swap_remove(position);
        self.update(search, a, false);
    }

    fn update(&mut self, search: &Search<'_, '_>, a: usize, add: bool) {
        let bump = |n: &mut u32| {
            if add {
                *n += 1;
            } else {
                *n -= 1;
            }
        };
        let assignment = &search.resolved.assignments[a];
        let c = assignment.candidate;
        let candidate = &search.resolved.candidates[c];

        self.taken[c] = add;
        if let Some(s) = search.slot_index(assignment.slot) {
            if add {
                self.open[s] -= 1;
            } else {
                self.open[s] += 1;
            }
        }
        if add {
            self.salary += assignment.salary;
        } else {
            self.salary -= assignment.salary;
        }
        bump(&mut self.team_counts[candidate.team]);
        if counts_toward_stack(candidate, search.config) {
            bump(&mut self.stack_counts[candidate.team]);
        }
        if candidate.is_pitcher() {
            if let Some(opponent) = candidate.opponent {
                bump(&mut self.pitchers_facing[opponent]);
            }
        } else {
            bump(&mut self.hitters[candidate.team]);
        }
        for (k, members) in search.cut_members.iter().enumerate() {
            if members[c] {
                bump(&mut self.shared[k]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContestFormat, PlayerRecord};
    use crate::optimizer::normalizer::normalize;
    use crate::optimizer::resolver::resolve;

    fn slate() -> Vec<PlayerRecord> {
        let mut records = Vec::new();
        for (team, opponent) in [("NYY", "BOS"), ("BOS", "NYY"), ("TOR", "TB"), ("TB", "TOR")] {
            records.push(
                PlayerRecord::new(format!("{}-p", team), format!("{} SP", team), team, vec![Slot::Pitcher], 8000, 16.0)
                    .with_opponent(opponent),
            );
            for (i, slot) in [Slot::FirstBase, Slot::ThirdBase, Slot::Outfield, Slot::Outfield].iter().enumerate() {
                let salary = 3000 + 400 * i as u32 + team.len() as u32 * 100;
                records.push(
                    PlayerRecord::new(
                        format!("{}-{}", team, i),
                        format!("{} hitter {}", team, i),
                        team,
                        vec![*slot],
                        salary,
                        5.0 + i as f64 + team.len() as f64,
                    )
                    .with_opponent(opponent),
                );
            }
        }
        records
    }

    fn config() -> LineupConfig {
        LineupConfig::new(
            ContestFormat::Classic,
            [(Slot::Pitcher, 1), (Slot::FirstBase, 1), (Slot::ThirdBase, 1), (Slot::Outfield, 2)],
        )
        .with_salary_cap(25_000)
        .with_max_per_team(3)
    }

    fn run(config: &LineupConfig, cuts: &[ExclusionCut], seed: u64) -> HeuristicResult {
        let records = slate();
        let resolved = resolve(normalize(&records, config).unwrap(), config).unwrap();
        HeuristicOptimizer::new().run(&resolved, config, cuts, None, seed)
    }

    #[test]
    fn same_seed_same_lineup() {
        let config = config();
        assert_eq!(run(&config, &[], 7), run(&config, &[], 7));
    }

    #[test]
    fn found_lineups_pass_the_audit() {
        let mut config = config().with_min_stack(Some(2));
        config.max_hitters_vs_pitcher = Some(0);
        let records = slate();
        let resolved = resolve(normalize(&records, &config).unwrap(), &config).unwrap();
        for seed in 0..5 {
            match HeuristicOptimizer::new().run(&resolved, &config, &[], None, seed) {
                HeuristicResult::Found { picks, .. } => {
                    assert!(audit(&resolved, &config, &[], &picks).is_empty());
                }
                other => panic!("seed {} failed: {:?}", seed, other),
            }
        }
    }

    #[test]
    fn proven_infeasibility_is_reported_without_iterating() {
        let config = config().with_salary_cap(10_000);
        match run(&config, &[], 1) {
            HeuristicResult::Exhausted {
                iterations,
                blocking,
                proven,
                ..
            } => {
                assert_eq!(iterations, 0);
                assert!(proven);
                assert_eq!(blocking, Some(ConstraintClass::SalaryCap));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn lock_conflict_is_blamed_on_the_blocking_limit() {
        let mut config = config().with_lock("NYY-p").with_lock("BOS-0");
        config.max_hitters_vs_pitcher = Some(0);
        config.heuristic.max_iterations = 20;
        match run(&config, &[], 3) {
            HeuristicResult::Exhausted {
                iterations,
                blocking,
                proven,
                ..
            } => {
                assert_eq!(iterations, 20);
                assert!(!proven);
                assert_eq!(blocking, Some(ConstraintClass::OpposingHitters));
            }
            HeuristicResult::Found { .. } => panic!("locked pitcher faces a locked hitter"),
        }
    }

    #[test]
    fn dominant_prefers_soft_classes() {
        let tally = BTreeMap::from([
            (ConstraintClass::SalaryCap, 40),
            (ConstraintClass::TeamCap, 3),
            (ConstraintClass::Stack, 3),
        ]);
        assert_eq!(dominant(&tally), Some(ConstraintClass::TeamCap));
        assert_eq!(dominant(&BTreeMap::new()), None);
    }
}
