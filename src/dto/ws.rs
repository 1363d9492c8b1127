use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{
        game::{PlayerSummary, PuzzleSummary, player_summaries},
        validation::validate_display_name,
    },
    error::ServiceError,
    state::{game::SessionSnapshot, notifier::Notification, state_machine::SessionState},
};

/// Payload of a `JOIN_ROOM` message.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    /// Display name, trimmed before use.
    #[validate(custom(function = validate_display_name))]
    pub name: String,
    /// Room to join; the default room when omitted.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
/// Messages accepted from game clients.
#[serde(tag = "event", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    /// Open a new room.
    CreateRoom,
    /// Join a room as a player.
    JoinRoom(JoinRoomRequest),
    /// Leave the joined room.
    LeaveRoom,
    /// Start a game.
    Start,
    /// Abort the game and clear scores.
    Reset,
    /// Submit an expression for the puzzle in play.
    Submit(String),
}

impl InboundMessage {
    /// Parse and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, ServiceError> {
        let message: Self = serde_json::from_str(text)
            .map_err(|err| ServiceError::InvalidInput(format!("malformed message: {err}")))?;
        if let Self::JoinRoom(request) = &message {
            request.validate()?;
        }
        Ok(message)
    }

    /// Wrap the outcome of handling this message in the matching result event.
    pub fn result(&self, payload: ResultPayload) -> OutboundMessage {
        match self {
            Self::CreateRoom => OutboundMessage::CreateRoomResult(payload),
            Self::JoinRoom(_) => OutboundMessage::JoinRoomResult(payload),
            Self::LeaveRoom => OutboundMessage::LeaveRoomResult(payload),
            Self::Start => OutboundMessage::StartResult(payload),
            Self::Reset => OutboundMessage::ResetResult(payload),
            Self::Submit(_) => OutboundMessage::SubmitResult(payload),
        }
    }
}

/// Outcome of a client command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ResultPayload {
    /// Whether the command succeeded.
    #[serde(rename = "isOK")]
    pub is_ok: bool,
    /// Room code, for room commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error kind when the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResultPayload {
    /// Successful outcome.
    pub fn ok() -> Self {
        Self {
            is_ok: true,
            ..Self::default()
        }
    }

    /// Successful outcome of a room command.
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            is_ok: true,
            code: Some(code.into()),
            ..Self::default()
        }
    }

    /// Failed outcome.
    pub fn failure(err: &ServiceError) -> Self {
        Self {
            is_ok: false,
            error: Some(err.kind().to_string()),
            message: Some(err.to_string()),
            ..Self::default()
        }
    }
}

impl From<Result<ResultPayload, ServiceError>> for ResultPayload {
    fn from(result: Result<ResultPayload, ServiceError>) -> Self {
        result.unwrap_or_else(|err| Self::failure(&err))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Messages pushed to game clients.
#[serde(tag = "event", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    /// Outcome of `CREATE_ROOM`.
    CreateRoomResult(ResultPayload),
    /// Outcome of `JOIN_ROOM`.
    JoinRoomResult(ResultPayload),
    /// Outcome of `LEAVE_ROOM`.
    LeaveRoomResult(ResultPayload),
    /// Outcome of `START`.
    StartResult(ResultPayload),
    /// Outcome of `RESET`.
    ResetResult(ResultPayload),
    /// Outcome of `SUBMIT`.
    SubmitResult(ResultPayload),
    /// A frame that could not be understood.
    Error(ResultPayload),
    /// Seconds left in the current turn.
    SetRemainingTime(u32),
    /// Lifecycle state of the room's session.
    SetCurrentState(SessionState),
    /// Player holding the turn, or the winner once a game ends.
    SetCurrentPlayer(Option<String>),
    /// Puzzle in play.
    SetCurrentQuestion(Option<PuzzleSummary>),
    /// Roster in turn order.
    SetPlayers(Vec<PlayerSummary>),
    /// Number of open sockets on the server.
    SetConnectedClients(usize),
}

impl OutboundMessage {
    /// Messages that bring a freshly joined client up to date.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Vec<Self> {
        vec![
            Self::SetCurrentState(snapshot.state),
            Self::SetCurrentPlayer(snapshot.current_player),
            Self::SetCurrentQuestion(snapshot.current_puzzle.map(PuzzleSummary::from)),
            Self::SetPlayers(player_summaries(snapshot.players)),
            Self::SetRemainingTime(snapshot.remaining),
        ]
    }
}

impl From<Notification> for OutboundMessage {
    fn from(notification: Notification) -> Self {
        match notification {
            Notification::RemainingTimeChanged(remaining) => Self::SetRemainingTime(remaining),
            Notification::StateChanged(state) => Self::SetCurrentState(state),
            Notification::CurrentPlayerChanged(player) => Self::SetCurrentPlayer(player),
            Notification::CurrentPuzzleChanged(puzzle) => {
                Self::SetCurrentQuestion(puzzle.map(PuzzleSummary::from))
            }
            Notification::PlayersChanged(players) => Self::SetPlayers(player_summaries(players)),
        }
    }
}
