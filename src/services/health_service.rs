use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness along with the number of open rooms and sockets.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let rooms = state.room_count();
    let connected = state.connected_clients();
    debug!(rooms, connected, "health check");
    HealthResponse::ok(rooms, connected)
}
