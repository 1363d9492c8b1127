use tokio::sync::broadcast;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dto::{room::RoomSummary, ws::JoinRoomRequest},
    error::ServiceError,
    state::{SharedState, game::SessionSnapshot, notifier::Notification, room::Room},
};

/// Open a new room with its own game session.
pub fn create_room(state: &SharedState) -> Room {
    let room = state.create_room();
    info!(code = %room.code(), "room created");
    room
}

/// Public view of a room.
pub async fn room_summary(state: &SharedState, code: &str) -> Result<RoomSummary, ServiceError> {
    let room = find_room(state, code)?;
    let snapshot = room.session().snapshot().await?;
    Ok(RoomSummary::new(
        room.code().to_string(),
        room.max_players(),
        snapshot,
    ))
}

/// Admit a connection into a room as a player.
///
/// Leaves the connection's previous room first. Returns the joined room together with a
/// notification subscription primed by a snapshot of the session.
pub async fn join_room(
    state: &SharedState,
    connection: &str,
    request: JoinRoomRequest,
) -> Result<(Room, SessionSnapshot, broadcast::Receiver<Notification>), ServiceError> {
    request.validate()?;

    let code = request
        .code
        .as_deref()
        .map(normalize_code)
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| state.default_room_code().to_string());
    let room = find_room(state, &code)?;

    if state
        .membership(connection)
        .is_some_and(|current| current != room.code())
    {
        leave_room(state, connection).await?;
    }

    let full = room
        .join(connection.to_string(), request.name.trim().to_string())
        .await
        .map_err(|err| match err {
            ServiceError::SessionClosed => ServiceError::RoomNotFound(room.code().to_string()),
            err => err,
        })?;
    state.set_membership(connection, room.code());
    info!(id = %connection, code = %room.code(), "player joined room");

    let (snapshot, receiver) = room.session().subscribe().await?;

    if full && state.config().autostart() {
        match room.session().start().await {
            Ok(()) => info!(code = %room.code(), "room full; game autostarted"),
            Err(err) => warn!(code = %room.code(), error = %err, "autostart failed"),
        }
    }

    Ok((room, snapshot, receiver))
}

/// Remove a connection from its room. Returns the code of the room it left.
///
/// Rooms other than the default one are closed once their roster is empty.
pub async fn leave_room(
    state: &SharedState,
    connection: &str,
) -> Result<Option<String>, ServiceError> {
    let Some(code) = state.clear_membership(connection) else {
        return Ok(None);
    };
    let Some(room) = state.room(&code) else {
        return Ok(None);
    };

    if room.session().leave(connection.to_string()).await? {
        info!(id = %connection, code = %code, "player left room");
    }

    if code != state.default_room_code() && room.session().close_if_empty().await? {
        state.remove_room(&code);
        info!(code = %code, "empty room closed");
    }

    Ok(Some(code))
}

/// Start the game in the connection's room.
pub async fn start(state: &SharedState, connection: &str) -> Result<(), ServiceError> {
    target_room(state, connection)?.session().start().await
}

/// Reset the game in the connection's room.
pub async fn reset(state: &SharedState, connection: &str) -> Result<(), ServiceError> {
    target_room(state, connection)?.session().reset().await
}

/// Submit an expression on behalf of the connection.
pub async fn submit(
    state: &SharedState,
    connection: &str,
    expression: String,
) -> Result<(), ServiceError> {
    target_room(state, connection)?
        .session()
        .submit(connection.to_string(), expression)
        .await
}

fn target_room(state: &SharedState, connection: &str) -> Result<Room, ServiceError> {
    state
        .room_for(connection)
        .ok_or_else(|| ServiceError::RoomNotFound(state.default_room_code().to_string()))
}

fn find_room(state: &SharedState, code: &str) -> Result<Room, ServiceError> {
    let code = normalize_code(code);
    state
        .room(&code)
        .ok_or(ServiceError::RoomNotFound(code))
}

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
