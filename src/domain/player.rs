// Player records as supplied by the scoring collaborator

use serde::{Deserialize, Deserializer, Serialize};

use super::value_objects::Slot;

/// One priced, scored athlete. The optimizer never mutates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub team: String,
    /// Opposing team for the slate, when known
    #[serde(default)]
    pub opponent: Option<String>,
    /// Either a list or one string; entries may be slash lists such as `"1B/3B"`
    #[serde(deserialize_with = "positions")]
    pub eligible_positions: Vec<Slot>,
    pub salary: u32,
    /// Contest-adjusted projection, computed before the record reaches the optimizer
    pub score: f64,
}

impl PlayerRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        team: impl Into<String>,
        eligible_positions: Vec<Slot>,
        salary: u32,
        score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            team: team.into(),
            opponent: None,
            eligible_positions,
            salary,
            score,
        }
    }

    pub fn with_opponent(mut self, opponent: impl Into<String>) -> Self {
        self.opponent = Some(opponent.into());
        self
    }

    pub fn is_pitcher(&self) -> bool {
        self.eligible_positions.contains(&Slot::Pitcher)
    }

    pub fn is_eligible(&self, slot: Slot) -> bool {
        self.eligible_positions.contains(&slot)
    }

    /// Points per $1000 of salary
    pub fn value(&self) -> f64 {
        if self.salary == 0 {
            0.0
        } else {
            self.score / (self.salary as f64 / 1000.0)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPositions {
    One(String),
    Many(Vec<String>),
}

fn positions<'de, D>(deserializer: D) -> Result<Vec<Slot>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match RawPositions::deserialize(deserializer)? {
        RawPositions::One(entry) => vec![entry],
        RawPositions::Many(entries) => entries,
    };
    let mut slots = Vec::new();
    for entry in &entries {
        for slot in Slot::parse_list(entry).map_err(serde::de::Error::custom)? {
            if !slots.contains(&slot) {
                slots.push(slot);
            }
        }
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_position_codes() {
        let json = r#"{
            "id": "p1", "name": "Flex Guy", "team": "NYY",
            "eligible_positions": ["1B", "3B"], "salary": 4200, "score": 8.4
        }"#;
        let record: PlayerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.eligible_positions,
            vec![Slot::FirstBase, Slot::ThirdBase]
        );
        assert!(record.opponent.is_none());
        assert!((record.value() - 2.0).abs() < 1e-9);
    }
}
