/// Restartable one-second ticker.
pub mod clock;
/// Random short codes for rooms and puzzles.
pub mod code;
/// Per-turn countdown on top of a clock.
pub mod countdown;
/// Parsing and validation of submitted expressions.
pub mod expression;
/// Game engine.
pub mod game;
/// Broadcast of session changes.
pub mod notifier;
/// Puzzle model and generator.
pub mod puzzle;
/// Rooms binding codes to sessions.
pub mod room;
/// Ordered players of a session.
pub mod roster;
/// Session actor and its handle.
pub mod session;
/// Session lifecycle state machine.
pub mod state_machine;

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::watch;
use tracing::info;

use crate::config::AppConfig;

use self::{code::room_code, room::Room, session::spawn_session};

/// Application state shared across handlers.
pub type SharedState = Arc<AppState>;

/// Central application state: room registry, socket memberships and the connected-client count.
pub struct AppState {
    config: AppConfig,
    rooms: DashMap<String, Room>,
    default_room: String,
    memberships: DashMap<String, String>,
    connected: watch::Sender<usize>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The default room is created immediately, so this must run inside a Tokio runtime.
    pub fn new(config: AppConfig) -> SharedState {
        let (connected, _rx) = watch::channel(0);
        let mut state = Self {
            config,
            rooms: DashMap::new(),
            default_room: String::new(),
            memberships: DashMap::new(),
            connected,
        };
        let code = state.create_room().code().to_string();
        info!(code = %code, "default room ready");
        state.default_room = code;
        Arc::new(state)
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Code of the room used by sockets that did not join another one.
    pub fn default_room_code(&self) -> &str {
        &self.default_room
    }

    /// Look up a room by code.
    pub fn room(&self, code: &str) -> Option<Room> {
        self.rooms.get(code).map(|entry| entry.value().clone())
    }

    /// Number of open rooms, the default one included.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Open a room with a fresh code and its own game session.
    pub fn create_room(&self) -> Room {
        loop {
            let code = room_code(self.config.room_code_length());
            if let Entry::Vacant(entry) = self.rooms.entry(code.clone()) {
                let session = spawn_session(self.config.session_settings());
                let room = Room::new(code, self.config.max_players(), session);
                entry.insert(room.clone());
                return room;
            }
        }
    }

    /// Close a room. The default room is never removed.
    pub fn remove_room(&self, code: &str) -> Option<Room> {
        if code == self.default_room {
            return None;
        }
        self.rooms.remove(code).map(|(_, room)| room)
    }

    /// Room a connection joined.
    pub fn membership(&self, connection: &str) -> Option<String> {
        self.memberships
            .get(connection)
            .map(|entry| entry.value().clone())
    }

    /// Record that a connection joined `code`.
    pub fn set_membership(&self, connection: &str, code: &str) {
        self.memberships
            .insert(connection.to_string(), code.to_string());
    }

    /// Forget a connection's room, returning it.
    pub fn clear_membership(&self, connection: &str) -> Option<String> {
        self.memberships
            .remove(connection)
            .map(|(_, code)| code)
    }

    /// Room targeted by a connection's commands: its own, else the default one.
    pub fn room_for(&self, connection: &str) -> Option<Room> {
        self.membership(connection)
            .and_then(|code| self.room(&code))
            .or_else(|| self.room(&self.default_room))
    }

    /// Count a new socket, returning the updated total.
    pub fn client_connected(&self) -> usize {
        self.connected.send_modify(|count| *count += 1);
        *self.connected.borrow()
    }

    /// Count a closed socket, returning the updated total.
    pub fn client_disconnected(&self) -> usize {
        self.connected
            .send_modify(|count| *count = count.saturating_sub(1));
        *self.connected.borrow()
    }

    /// Sockets currently open.
    pub fn connected_clients(&self) -> usize {
        *self.connected.borrow()
    }

    /// Subscribe to connected-client count updates.
    pub fn connected_watcher(&self) -> watch::Receiver<usize> {
        self.connected.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_room_exists_and_cannot_be_removed() {
        let state = AppState::new(AppConfig::default());
        let code = state.default_room_code().to_string();

        assert_eq!(code.len(), 5);
        assert!(state.room(&code).is_some());
        assert!(state.remove_room(&code).is_none());
        assert_eq!(state.room_count(), 1);
    }

    #[tokio::test]
    async fn created_rooms_get_distinct_codes() {
        let state = AppState::new(AppConfig::default());
        let first = state.create_room();
        let second = state.create_room();

        assert_ne!(first.code(), second.code());
        assert_eq!(state.room_count(), 3);
        assert!(state.remove_room(first.code()).is_some());
        assert_eq!(state.room_count(), 2);
    }

    #[tokio::test]
    async fn connections_fall_back_to_the_default_room() {
        let state = AppState::new(AppConfig::default());
        let other = state.create_room();

        let fallback = state.room_for("socket").unwrap();
        assert_eq!(fallback.code(), state.default_room_code());

        state.set_membership("socket", other.code());
        assert_eq!(state.room_for("socket").unwrap().code(), other.code());
        assert_eq!(state.clear_membership("socket").as_deref(), Some(other.code()));
        assert!(state.membership("socket").is_none());
    }

    #[tokio::test]
    async fn connected_count_is_observable() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.connected_watcher();

        assert_eq!(state.client_connected(), 1);
        assert_eq!(state.client_connected(), 2);
        watcher.changed().await.unwrap();
        assert_eq!(*watcher.borrow_and_update(), 2);

        assert_eq!(state.client_disconnected(), 1);
        assert_eq!(state.client_disconnected(), 0);
        assert_eq!(state.client_disconnected(), 0);
        assert_eq!(state.connected_clients(), 0);
    }
}
