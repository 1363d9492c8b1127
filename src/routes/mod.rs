use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod room;
pub mod websocket;

/// Compose all route trees and wire in shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(room::router())
        .merge(websocket::router())
        .merge(docs::router())
        .with_state(state)
}
