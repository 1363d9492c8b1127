use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::game::{PlayerSummary, PuzzleSummary, player_summaries},
    state::{game::SessionSnapshot, state_machine::SessionState},
};

/// Response returned when a room is opened.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRoomResponse {
    /// Code clients use to join.
    pub code: String,
}

/// Public view of a room and its session.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Room code.
    pub code: String,
    /// Roster capacity.
    pub max_players: usize,
    /// Lifecycle state of the session.
    pub state: SessionState,
    /// Seconds left in the current turn.
    pub remaining_time: u32,
    /// Player holding the turn, or the last winner.
    pub current_player: Option<String>,
    /// Puzzle in play.
    pub current_question: Option<PuzzleSummary>,
    /// Roster in turn order.
    pub players: Vec<PlayerSummary>,
}

impl RoomSummary {
    /// Combine a room's identity with a session snapshot.
    pub fn new(code: String, max_players: usize, snapshot: SessionSnapshot) -> Self {
        Self {
            code,
            max_players,
            state: snapshot.state,
            remaining_time: snapshot.remaining,
            current_player: snapshot.current_player,
            current_question: snapshot.current_puzzle.map(PuzzleSummary::from),
            players: player_summaries(snapshot.players),
        }
    }
}
