use crate::error::ServiceError;

use super::session::SessionHandle;

/// A game session reachable through a short code.
#[derive(Clone, Debug)]
pub struct Room {
    code: String,
    max_players: usize,
    session: SessionHandle,
}

impl Room {
    /// Bind `session` to `code`.
    pub fn new(code: String, max_players: usize, session: SessionHandle) -> Self {
        Self {
            code,
            max_players,
            session,
        }
    }

    /// Code clients use to join.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Roster capacity.
    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Handle to the room's session.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Admit a player, subject to the room's capacity. Returns whether the roster is now full.
    pub async fn join(&self, id: String, name: String) -> Result<bool, ServiceError> {
        let players = self.session.join(id, name, self.max_players).await?;
        Ok(players >= self.max_players)
    }
}
