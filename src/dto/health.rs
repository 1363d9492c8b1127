use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok").
    pub status: String,
    /// Open rooms, the default one included.
    pub rooms: usize,
    /// Open WebSocket connections.
    pub connected: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(rooms: usize, connected: usize) -> Self {
        Self {
            status: "ok".to_string(),
            rooms,
            connected,
        }
    }
}
