use tokio::sync::broadcast;

use super::{puzzle::Puzzle, roster::Player, state_machine::SessionState};

/// Capacity of a session's notification channel.
pub const NOTIFICATION_CAPACITY: usize = 64;

/// Change published by a game session.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Seconds left in the current turn.
    RemainingTimeChanged(u32),
    /// Lifecycle state changed.
    StateChanged(SessionState),
    /// Player allowed to submit (or the winner once a game ends).
    CurrentPlayerChanged(Option<String>),
    /// Puzzle being played.
    CurrentPuzzleChanged(Option<Puzzle>),
    /// Roster content in turn order.
    PlayersChanged(Vec<Player>),
}

/// Broadcast hub fanning session notifications out to subscribers.
///
/// Publishing never waits on subscribers; a receiver only sees what was published after it
/// subscribed. Closing the hub drops the sender so receivers observe the end of the stream.
pub struct Notifier {
    sender: Option<broadcast::Sender<Notification>>,
}

impl Notifier {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender: Some(sender),
        }
    }

    /// Register a new subscriber, unless the hub is closed.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<Notification>> {
        self.sender.as_ref().map(broadcast::Sender::subscribe)
    }

    /// Send a notification to all current subscribers, ignoring delivery errors.
    pub fn publish(&self, notification: Notification) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(notification);
        }
    }

    /// Complete the stream. Idempotent.
    pub fn close(&mut self) {
        self.sender.take();
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(NOTIFICATION_CAPACITY)
    }
}
