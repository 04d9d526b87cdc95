// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rosteropt::{ContestFormat, Lineup, LineupConfig, PlayerRecord, Slot};

pub fn player(id: &str, team: &str, positions: &[Slot], salary: u32, score: f64) -> PlayerRecord {
    PlayerRecord::new(id, id.to_uppercase(), team, positions.to_vec(), salary, score)
}

/// Classic MLB roster shape without a salary floor or correlation rules.
pub fn classic_config() -> LineupConfig {
    LineupConfig::new(
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

/// A synthetic slate: `teams` teams paired into games, each with two
/// pitchers and a nine-man batting order, some of them multi-position.
pub fn slate(seed: u64, teams: usize) -> Vec<PlayerRecord> {
    const ORDER: [&[Slot]; 9] = [
        &[Slot::Catcher],
        &[Slot::FirstBase],
        &[Slot::SecondBase, Slot::ShortStop],
        &[Slot::ThirdBase],
        &[Slot::ShortStop],
        &[Slot::Outfield],
        &[Slot::Outfield],
        &[Slot::Outfield, Slot::FirstBase],
        &[Slot::Outfield],
    ];

    let mut rng = StdRng::seed_from_u64(seed);
    let mut pool = Vec::new();
    for t in 0..teams {
        let team = format!("T{:02}", t);
        let opponent = format!("T{:02}", t ^ 1);
        for p in 0..2 {
            let salary = rng.random_range(60..=110) * 100;
            let score = salary as f64 / 1000.0 * 2.0 + rng.random_range(-3.0..3.0);
            pool.push(
                player(&format!("{}-sp{}", team, p), &team, &[Slot::Pitcher], salary, score)
                    .with_opponent(&opponent),
            );
        }
        for (i, positions) in ORDER.iter().enumerate() {
            let salary = rng.random_range(22..=60) * 100;
            let score = salary as f64 / 1000.0 * 1.8 + rng.random_range(-2.0..2.0);
            pool.push(
                player(&format!("{}-b{}", team, i), &team, positions, salary, score.max(0.5))
                    .with_opponent(&opponent),
            );
        }
    }
    pool
}

/// Checks the invariants every returned lineup must hold.
pub fn assert_legal(lineup: &Lineup, config: &LineupConfig) {
    assert_eq!(lineup.len() as u32, config.roster_size);
    assert!(lineup.total_salary() <= config.salary_cap);

    let salary: u32 = lineup.players().iter().map(|spot| spot.salary).sum();
    assert_eq!(salary, lineup.total_salary());

    for (&slot, &count) in &config.position_requirements {
        assert_eq!(lineup.count_in(slot), count, "slot {}", slot);
    }

    let ids: HashSet<&str> = lineup.player_ids().collect();
    assert_eq!(ids.len(), lineup.len(), "duplicate player in lineup");

    for spot in lineup.players() {
        assert!(
            spot.player.is_eligible(spot.slot)
                || spot.slot == Slot::Util
                || config.contest_format == ContestFormat::SingleGameCaptain,
            "{} placed at {}",
            spot.player.id,
            spot.slot
        );
    }
}

/// Team cap and salary floor, which relaxation may lift.
pub fn assert_soft_limits(lineup: &Lineup, config: &LineupConfig) {
    for (team, &count) in lineup.team_counts() {
        assert!(count <= config.max_per_team, "{} has {}", team, count);
    }
    if let Some(floor) = config.salary_floor {
        assert!(lineup.total_salary() >= floor);
    }
    if let Some(stack) = config.min_stack_size {
        assert!(lineup.max_stack() >= stack);
    }
}
