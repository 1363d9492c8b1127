use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle state of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Players can join; no countdown is running.
    Waiting,
    /// Turns are being played.
    Ongoing,
    /// Final scores are in. Transient: the session settles back to waiting immediately.
    Finished,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Begin a game with the current roster.
    Start,
    /// Last puzzle played or not enough players left.
    Finish,
    /// Leave the finished state once the result has been announced.
    Settle,
    /// Abort whatever is going on and go back to waiting.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The state the machine was in when the invalid event was received.
    pub from: SessionState,
    /// The event that cannot be applied from this state.
    pub event: GameEvent,
}

/// State machine implementing the session lifecycle.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    state: SessionState,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            state: SessionState::Waiting,
        }
    }
}

impl GameStateMachine {
    /// Create a new state machine initialised in the waiting state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether turns are being played.
    pub fn is_ongoing(&self) -> bool {
        self.state == SessionState::Ongoing
    }

    /// Apply `event`, returning the new state.
    pub fn apply(&mut self, event: GameEvent) -> Result<SessionState, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.state = next;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: GameEvent) -> Result<SessionState, InvalidTransition> {
        let next = match (self.state, event) {
            (SessionState::Waiting | SessionState::Finished, GameEvent::Start) => {
                SessionState::Ongoing
            }
            (SessionState::Ongoing, GameEvent::Finish) => SessionState::Finished,
            (SessionState::Finished, GameEvent::Settle) => SessionState::Waiting,
            (_, GameEvent::Reset) => SessionState::Waiting,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
