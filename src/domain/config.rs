//! Lineup request configuration.
//!
//! A [`LineupConfig`] describes the roster shape, the salary window and the
//! team-correlation limits of one contest. Configs can be built in code from
//! the presets or loaded from TOML:
//!
//! ```
//! use rosteropt::{LineupConfig, Slot};
//!
//! let config = LineupConfig::from_toml_str(r#"
//!     roster_size = 3
//!     salary_cap = 20000
//!     max_per_team = 2
//!
//!     [position_requirements]
//!     P = 1
//!     OF = 2
//! "#).unwrap();
//!
//! assert_eq!(config.position_requirements[&Slot::Outfield], 2);
//! assert!(config.validate().is_ok());
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value_objects::{ContestFormat, Slot, SolverBackend, SolverMode};

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub const DEFAULT_SALARY_CAP: u32 = 50_000;
pub const DEFAULT_CAPTAIN_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_SEED: u64 = 0x5EED_2025;

/// Knobs for the randomized constructive search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicSettings {
    pub max_iterations: u32,
    /// Stop after this many iterations without a better lineup
    pub max_stale_iterations: u32,
    /// Top-N candidates by value that take part in each weighted draw
    pub candidate_pool: usize,
    /// Chance of seeding an iteration with a team stack when none is required
    pub stack_probability: f64,
    pub preferred_stack_size: u32,
    /// Passes of the post-fill upgrade search
    pub upgrade_passes: u32,
    pub seed: u64,
}

impl Default for HeuristicSettings {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            max_stale_iterations: 300,
            candidate_pool: 6,
            stack_probability: 0.0,
            preferred_stack_size: 3,
            upgrade_passes: 2,
            seed: DEFAULT_SEED,
        }
    }
}

/// Everything the optimizer needs to know about one contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineupConfig {
    pub contest_format: ContestFormat,
    pub position_requirements: BTreeMap<Slot, u32>,
    pub roster_size: u32,
    pub salary_cap: u32,
    /// Minimum salary usage; keeps the optimizer away from degenerate cheap rosters
    pub salary_floor: Option<u32>,
    pub max_per_team: u32,
    pub min_stack_size: Option<u32>,
    /// Most hitters allowed against one of our own pitchers
    pub max_hitters_vs_pitcher: Option<u32>,
    /// Minimum distinct teams in the lineup
    pub min_teams: Option<u32>,
    pub timeout_seconds: u64,
    /// Engine for `LineupOptimizer::for_config`. Any other optimizer rejects
    /// a request naming a mode it does not run; `Auto` accepts any engine.
    pub solver_mode: SolverMode,
    pub solver_backend: SolverBackend,
    pub mip_gap: Option<f64>,
    /// Player ids that must be in the lineup (hard constraint)
    pub must_include: Vec<String>,
    /// Player ids removed before solving
    pub exclude: Vec<String>,
    /// Salary and score premium for the captain slot
    pub captain_multiplier: f64,
    pub heuristic: HeuristicSettings,
}

impl Default for LineupConfig {
    fn default() -> Self {
        Self {
            contest_format: ContestFormat::Classic,
            position_requirements: BTreeMap::new(),
            roster_size: 0,
            salary_cap: DEFAULT_SALARY_CAP,
            salary_floor: None,
            max_per_team: 4,
            min_stack_size: None,
            max_hitters_vs_pitcher: None,
            min_teams: None,
            timeout_seconds: 30,
            solver_mode: SolverMode::Auto,
            solver_backend: SolverBackend::Auto,
            mip_gap: None,
            must_include: Vec::new(),
            exclude: Vec::new(),
            captain_multiplier: DEFAULT_CAPTAIN_MULTIPLIER,
            heuristic: HeuristicSettings::default(),
        }
    }
}

impl LineupConfig {
    /// Config with the given slot requirements; roster size follows from them.
    pub fn new(
        contest_format: ContestFormat,
        requirements: impl IntoIterator<Item = (Slot, u32)>,
    ) -> Self {
        let position_requirements: BTreeMap<Slot, u32> = requirements.into_iter().collect();
        let roster_size = position_requirements.values().sum();
        Self {
            contest_format,
            position_requirements,
            roster_size,
            ..Self::default()
        }
    }

    fn classic_mlb() -> Self {
        Self::new(
            ContestFormat::Classic,
            [
                (Slot::Pitcher, 2),
                (Slot::Catcher, 1),
                (Slot::FirstBase, 1),
                (Slot::SecondBase, 1),
                (Slot::ThirdBase, 1),
                (Slot::ShortStop, 1),
                (Slot::Outfield, 3),
            ],
        )
    }

    /// Classic cash game: tight team cap, high salary usage, no forced stack.
    pub fn classic_cash() -> Self {
        Self {
            salary_floor: Some(47_500),
            max_per_team: 3,
            max_hitters_vs_pitcher: Some(1),
            ..Self::classic_mlb()
        }
    }

    /// Classic tournament: loose team cap and a forced four-man stack.
    pub fn classic_tournament() -> Self {
        let mut config = Self {
            salary_floor: Some(47_000),
            max_per_team: 5,
            min_stack_size: Some(4),
            ..Self::classic_mlb()
        };
        config.heuristic.stack_probability = 0.75;
        config.heuristic.preferred_stack_size = 4;
        config
    }

    /// Single-game showdown: one captain plus five flex players.
    pub fn showdown() -> Self {
        Self {
            salary_floor: Some(45_000),
            max_per_team: 5,
            min_teams: Some(2),
            ..Self::new(
                ContestFormat::SingleGameCaptain,
                [(Slot::Captain, 1), (Slot::Util, 5)],
            )
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_salary_cap(mut self, cap: u32) -> Self {
        self.salary_cap = cap;
        self
    }

    pub fn with_salary_floor(mut self, floor: Option<u32>) -> Self {
        self.salary_floor = floor;
        self
    }

    pub fn with_max_per_team(mut self, max: u32) -> Self {
        self.max_per_team = max;
        self
    }

    pub fn with_min_stack(mut self, size: Option<u32>) -> Self {
        self.min_stack_size = size;
        self
    }

    pub fn with_solver_mode(mut self, mode: SolverMode) -> Self {
        self.solver_mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.heuristic.seed = seed;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_lock(mut self, id: impl Into<String>) -> Self {
        self.must_include.push(id.into());
        self
    }

    pub fn with_exclude(mut self, id: impl Into<String>) -> Self {
        self.exclude.push(id.into());
        self
    }

    pub fn required(&self, slot: Slot) -> u32 {
        self.position_requirements.get(&slot).copied().unwrap_or(0)
    }

    /// Salary multiplier applied when a player fills `slot`.
    pub fn slot_multiplier(&self, slot: Slot) -> f64 {
        if slot == Slot::Captain {
            self.captain_multiplier
        } else {
            1.0
        }
    }

    /// Effective salary of a player filling `slot`.
    pub fn slot_salary(&self, salary: u32, slot: Slot) -> u32 {
        (salary as f64 * self.slot_multiplier(slot)).round() as u32
    }

    /// Config-only sanity checks; pool-dependent checks live in the normalizer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let required: u32 = self.position_requirements.values().sum();
        if self.roster_size == 0 {
            errors.push("roster_size must be positive".to_string());
        }
        if required != self.roster_size {
            errors.push(format!(
                "slot requirements sum to {} but roster_size is {}",
                required, self.roster_size
            ));
        }
        if self.salary_cap == 0 {
            errors.push("salary_cap must be positive".to_string());
        }
        if let Some(floor) = self.salary_floor {
            if floor > self.salary_cap {
                errors.push(format!(
                    "salary_floor {} exceeds salary_cap {}",
                    floor, self.salary_cap
                ));
            }
        }
        if self.max_per_team == 0 {
            errors.push("max_per_team must be at least 1".to_string());
        }
        if let Some(stack) = self.min_stack_size {
            if stack == 0 || stack > self.max_per_team {
                errors.push(format!(
                    "min_stack_size {} must be between 1 and max_per_team {}",
                    stack, self.max_per_team
                ));
            }
        }
        if let Some(teams) = self.min_teams {
            if teams > self.roster_size {
                errors.push(format!(
                    "min_teams {} exceeds roster_size {}",
                    teams, self.roster_size
                ));
            }
        }
        if !self.captain_multiplier.is_finite() || self.captain_multiplier < 1.0 {
            errors.push("captain_multiplier must be at least 1.0".to_string());
        }
        match self.contest_format {
            ContestFormat::SingleGameCaptain => {
                if self.required(Slot::Captain) != 1 {
                    errors.push("single-game captain contests need exactly one CPT slot".into());
                }
            }
            ContestFormat::Classic => {
                if self.required(Slot::Captain) > 0 {
                    errors.push("classic contests have no CPT slot".into());
                }
            }
        }
        if self.heuristic.max_iterations == 0 {
            errors.push("heuristic.max_iterations must be positive".to_string());
        }
        if self.heuristic.candidate_pool == 0 {
            errors.push("heuristic.candidate_pool must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.heuristic.stack_probability) {
            errors.push("heuristic.stack_probability must be within [0, 1]".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for config in [
            LineupConfig::classic_cash(),
            LineupConfig::classic_tournament(),
            LineupConfig::showdown(),
        ] {
            config.validate().unwrap();
        }
        assert_eq!(LineupConfig::classic_cash().roster_size, 10);
        assert_eq!(LineupConfig::showdown().roster_size, 6);
    }

    #[test]
    fn toml_overrides_nested_settings() {
        let config = LineupConfig::from_toml_str(
            r#"
            contest_format = "single_game_captain"
            roster_size = 6
            max_per_team = 5
            solver_mode = "heuristic_only"
            must_include = ["p7"]

            [position_requirements]
            CPT = 1
            UTIL = 5

            [heuristic]
            seed = 42
            max_iterations = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.contest_format, ContestFormat::SingleGameCaptain);
        assert_eq!(config.solver_mode, SolverMode::HeuristicOnly);
        assert_eq!(config.heuristic.seed, 42);
        assert_eq!(config.heuristic.candidate_pool, 6);
        assert_eq!(config.must_include, vec!["p7".to_string()]);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_mismatched_roster_size() {
        let config = LineupConfig::classic_cash().with_salary_floor(Some(60_000));
        let mut config = config;
        config.roster_size = 9;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("roster_size is 9"));
        assert!(err.contains("salary_floor 60000"));
    }

    #[test]
    fn rejects_stack_larger_than_team_cap() {
        let config = LineupConfig::classic_cash().with_min_stack(Some(4));
        assert!(config.validate().is_err());
    }

    #[test]
    fn captain_salary_uses_premium() {
        let config = LineupConfig::showdown();
        assert_eq!(config.slot_salary(9000, Slot::Captain), 13_500);
        assert_eq!(config.slot_salary(9000, Slot::Util), 9000);
    }
}
