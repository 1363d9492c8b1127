use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::room::{CreateRoomResponse, RoomSummary},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Routes handling room creation and inspection.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{code}", get(get_room))
}

/// Open a room with its own game session.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    responses(
        (status = 201, description = "Room created", body = CreateRoomResponse)
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
) -> (StatusCode, Json<CreateRoomResponse>) {
    let room = room_service::create_room(&state);
    (
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            code: room.code().to_string(),
        }),
    )
}

/// Inspect a room and the state of its game.
#[utoipa::path(
    get,
    path = "/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Room found", body = RoomSummary),
        (status = 404, description = "No room with this code")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let summary = room_service::room_summary(&state, &code).await?;
    Ok(Json(summary))
}
