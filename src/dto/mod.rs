/// Player and puzzle views.
pub mod game;
/// Health check payload.
pub mod health;
/// Room payloads.
pub mod room;
/// Validation helpers.
pub mod validation;
/// WebSocket protocol messages.
pub mod ws;
