//! Session actor: a task that owns one [`GameEngine`] and serialises commands and clock ticks.

use std::ops::ControlFlow;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::error::{GameError, ServiceError};

use super::{
    clock::{Clock, ClockTick, IntervalClock, TICK_PERIOD},
    game::{GameEngine, SessionSettings, SessionSnapshot},
    notifier::Notification,
};

/// Pending commands a session buffers before callers wait.
const COMMAND_CAPACITY: usize = 32;

type Reply<T> = oneshot::Sender<T>;
/// Snapshot of a session paired with a receiver for the notifications that follow it.
pub type Subscription = (SessionSnapshot, broadcast::Receiver<Notification>);

enum SessionCommand {
    Start {
        reply: Reply<Result<(), GameError>>,
    },
    Reset {
        reply: Reply<Result<(), GameError>>,
    },
    Join {
        id: String,
        name: String,
        max_players: usize,
        reply: Reply<Result<usize, GameError>>,
    },
    Leave {
        id: String,
        reply: Reply<Result<bool, GameError>>,
    },
    Submit {
        id: String,
        expression: String,
        reply: Reply<Result<(), GameError>>,
    },
    Subscribe {
        reply: Reply<Option<Subscription>>,
    },
    Snapshot {
        reply: Reply<SessionSnapshot>,
    },
    CloseIfEmpty {
        reply: Reply<bool>,
    },
}

/// Cloneable handle used to drive a running session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Start a game.
    pub async fn start(&self) -> Result<(), ServiceError> {
        Ok(self
            .request(|reply| SessionCommand::Start { reply })
            .await??)
    }

    /// Abort any game and clear scores.
    pub async fn reset(&self) -> Result<(), ServiceError> {
        Ok(self
            .request(|reply| SessionCommand::Reset { reply })
            .await??)
    }

    /// Add a player unless the roster already holds `max_players`. Returns the roster size.
    pub async fn join(
        &self,
        id: String,
        name: String,
        max_players: usize,
    ) -> Result<usize, ServiceError> {
        Ok(self
            .request(|reply| SessionCommand::Join {
                id,
                name,
                max_players,
                reply,
            })
            .await??)
    }

    /// Remove a player. `false` when the player was not in the roster.
    pub async fn leave(&self, id: String) -> Result<bool, ServiceError> {
        Ok(self
            .request(|reply| SessionCommand::Leave { id, reply })
            .await??)
    }

    /// Submit an expression for the current puzzle.
    pub async fn submit(&self, id: String, expression: String) -> Result<(), ServiceError> {
        Ok(self
            .request(|reply| SessionCommand::Submit {
                id,
                expression,
                reply,
            })
            .await??)
    }

    /// Subscribe to notifications, receiving the current projections atomically.
    pub async fn subscribe(&self) -> Result<Subscription, ServiceError> {
        self.request(|reply| SessionCommand::Subscribe { reply })
            .await?
            .ok_or(ServiceError::SessionClosed)
    }

    /// Current projections of the session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, ServiceError> {
        self.request(|reply| SessionCommand::Snapshot { reply })
            .await
    }

    /// Tear the session down if its roster is empty. Commands queued behind this one fail
    /// with [`ServiceError::SessionClosed`] once it went through.
    pub async fn close_if_empty(&self) -> Result<bool, ServiceError> {
        self.request(|reply| SessionCommand::CloseIfEmpty { reply })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| ServiceError::SessionClosed)?;
        response.await.map_err(|_| ServiceError::SessionClosed)
    }
}

/// Spawn a session driven by a one-second interval clock.
pub fn spawn_session(settings: SessionSettings) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (tick_tx, tick_rx) = mpsc::unbounded_channel();
    let engine = GameEngine::new(IntervalClock::new(TICK_PERIOD, tick_tx), settings);

    tokio::spawn(run(engine, command_rx, tick_rx));

    SessionHandle {
        commands: command_tx,
    }
}

/// Session loop. Ends when every handle is dropped or once an empty session is closed.
async fn run<C: Clock>(
    mut engine: GameEngine<C>,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut ticks: mpsc::UnboundedReceiver<ClockTick>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => {
                    if dispatch(&mut engine, command).is_break() {
                        break;
                    }
                }
                None => break,
            },
            Some(tick) = ticks.recv() => engine.on_tick(tick),
        }
    }

    engine.teardown();
    debug!("game session torn down");
}

fn dispatch<C: Clock>(engine: &mut GameEngine<C>, command: SessionCommand) -> ControlFlow<()> {
    match command {
        SessionCommand::Start { reply } => {
            let _ = reply.send(engine.start());
        }
        SessionCommand::Reset { reply } => {
            let _ = reply.send(engine.reset());
        }
        SessionCommand::Join {
            id,
            name,
            max_players,
            reply,
        } => {
            let result = if engine.roster().len() >= max_players {
                Err(GameError::Precondition(
                    "max number of players reached".into(),
                ))
            } else {
                engine.player_join(id, name)
            };
            let _ = reply.send(result);
        }
        SessionCommand::Leave { id, reply } => {
            let _ = reply.send(engine.player_leave(&id));
        }
        SessionCommand::Submit {
            id,
            expression,
            reply,
        } => {
            let _ = reply.send(engine.player_submit(&id, &expression));
        }
        SessionCommand::Subscribe { reply } => {
            let _ = reply.send(engine.subscribe());
        }
        SessionCommand::Snapshot { reply } => {
            let _ = reply.send(engine.snapshot());
        }
        SessionCommand::CloseIfEmpty { reply } => {
            let empty = engine.roster().is_empty();
            let _ = reply.send(empty);
            if empty {
                return ControlFlow::Break(());
            }
        }
    }
    ControlFlow::Continue(())
}
