use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{puzzle::Puzzle, roster::Player};

/// Player as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Connection identifier of the player.
    #[serde(rename = "UID")]
    pub uid: String,
    /// Display name.
    pub name: String,
    /// Rounds won.
    #[serde(rename = "currentScore")]
    pub current_score: u32,
    /// Seconds spent on the current puzzle.
    #[serde(rename = "timeUsed")]
    pub time_used: u32,
    /// Whether the player already had their turn this round.
    #[serde(rename = "hasPlayed")]
    pub has_played: bool,
}

impl From<Player> for PlayerSummary {
    fn from(player: Player) -> Self {
        Self {
            uid: player.id,
            name: player.name,
            current_score: player.score,
            time_used: player.time_used,
            has_played: player.has_played,
        }
    }
}

/// Puzzle as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PuzzleSummary {
    /// Puzzle identifier.
    #[serde(rename = "QID")]
    pub qid: String,
    /// The five digits to combine.
    pub numbers: Vec<u8>,
    /// Value the expression must reach.
    #[serde(rename = "expectedAnswer")]
    pub expected_answer: u64,
}

impl From<Puzzle> for PuzzleSummary {
    fn from(puzzle: Puzzle) -> Self {
        Self {
            qid: puzzle.id,
            numbers: puzzle.digits.to_vec(),
            expected_answer: puzzle.target,
        }
    }
}

/// Convert a roster into its wire form.
pub fn player_summaries(players: Vec<Player>) -> Vec<PlayerSummary> {
    players.into_iter().map(PlayerSummary::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn player_uses_client_field_names() {
        let summary = PlayerSummary::from(Player::new("p1".into(), "Ada".into(), 60));
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            json!({
                "UID": "p1",
                "name": "Ada",
                "currentScore": 0,
                "timeUsed": 60,
                "hasPlayed": false,
            })
        );
    }

    #[test]
    fn puzzle_uses_client_field_names() {
        let summary = PuzzleSummary::from(Puzzle {
            id: "Q1x_z".into(),
            digits: [1, 2, 3, 4, 5],
            target: 15,
        });
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            json!({
                "QID": "Q1x_z",
                "numbers": [1, 2, 3, 4, 5],
                "expectedAnswer": 15,
            })
        );
    }
}
