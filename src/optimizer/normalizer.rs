// Normalizer: validates raw player records against the request and interns teams

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::domain::{LineupConfig, LineupError, PlayerRecord};

/// A record admitted to the solve, with team codes interned.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub record: &'a PlayerRecord,
    pub team: usize,
    pub opponent: Option<usize>,
    pub locked: bool,
}

impl Candidate<'_> {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn is_pitcher(&self) -> bool {
        self.record.is_pitcher()
    }
}

/// The borrowed, validated player pool for one request.
#[derive(Debug, Clone)]
pub struct NormalizedPool<'a> {
    pub candidates: Vec<Candidate<'a>>,
    /// Interned team codes, sorted
    pub teams: Vec<String>,
}

impl NormalizedPool<'_> {
    pub fn team_index(&self, code: &str) -> Option<usize> {
        self.teams.binary_search_by(|t| t.as_str().cmp(code)).ok()
    }
}

fn clean_team(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Validate `records` and `config`, drop excluded players, and intern team codes.
///
/// Every problem found is reported at once; nothing is silently repaired.
pub fn normalize<'a>(
    records: &'a [PlayerRecord],
    config: &LineupConfig,
) -> Result<NormalizedPool<'a>, LineupError> {
    let mut errors = Vec::new();

    if let Err(e) = config.validate() {
        errors.push(e.to_string());
    }

    let mut seen = HashSet::new();
    for record in records {
        let label = if record.id.is_empty() {
            record.name.as_str()
        } else {
            record.id.as_str()
        };
        if record.id.trim().is_empty() {
            errors.push(format!("player '{}' has an empty id", record.name));
        } else if !seen.insert(record.id.as_str()) {
            errors.push(format!("duplicate player id '{}'", record.id));
        }
        if record.eligible_positions.is_empty() {
            errors.push(format!("player '{}' has no eligible positions", label));
        }
        if record.salary == 0 {
            errors.push(format!("player '{}' has a non-positive salary", label));
        }
        if !record.score.is_finite() || record.score < 0.0 {
            errors.push(format!(
                "player '{}' has invalid score {}",
                label, record.score
            ));
        }
        if clean_team(&record.team).is_empty() {
            errors.push(format!("player '{}' has no team", label));
        }
    }

    for id in &config.must_include {
        if !seen.contains(id.as_str()) {
            errors.push(format!("locked player '{}' is not in the pool", id));
        }
        if config.exclude.contains(id) {
            errors.push(format!("player '{}' is both locked and excluded", id));
        }
    }
    let distinct_locks: HashSet<&str> = config.must_include.iter().map(String::as_str).collect();
    if distinct_locks.len() as u32 > config.roster_size {
        errors.push(format!(
            "{} locked players exceed roster size {}",
            distinct_locks.len(),
            config.roster_size
        ));
    }

    if !errors.is_empty() {
        return Err(LineupError::Validation(errors));
    }

    let excluded: HashSet<&str> = config.exclude.iter().map(String::as_str).collect();
    let admitted: Vec<&PlayerRecord> = records
        .iter()
        .filter(|r| !excluded.contains(r.id.as_str()))
        .collect();

    let teams: Vec<String> = admitted
        .iter()
        .flat_map(|r| std::iter::once(clean_team(&r.team)).chain(r.opponent.as_deref().map(clean_team)))
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let lookup = |code: &str| teams.binary_search_by(|t| t.as_str().cmp(code)).ok();

    let candidates = admitted
        .into_iter()
        .map(|record| Candidate {
            record,
            team: lookup(&clean_team(&record.team)).unwrap_or_default(),
            opponent: record
                .opponent
                .as_deref()
                .map(clean_team)
                .and_then(|code| lookup(&code)),
            locked: distinct_locks.contains(record.id.as_str()),
        })
        .collect::<Vec<_>>();

    debug!(
        event = "pool_normalized",
        players = records.len(),
        admitted = candidates.len(),
        excluded = excluded.len(),
        teams = teams.len(),
    );

    Ok(NormalizedPool { candidates, teams })
}
