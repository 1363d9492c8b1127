use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for IQ180 Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::room::create_room,
        crate::routes::room::get_room,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomResponse,
            crate::dto::room::RoomSummary,
            crate::dto::game::PlayerSummary,
            crate::dto::game::PuzzleSummary,
            crate::dto::ws::InboundMessage,
            crate::dto::ws::JoinRoomRequest,
            crate::dto::ws::OutboundMessage,
            crate::dto::ws::ResultPayload,
            crate::state::state_machine::SessionState,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room management"),
        (name = "players", description = "WebSocket protocol for game clients"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/healthcheck", "/rooms", "/rooms/{code}", "/ws"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
