//! Game engine: session lifecycle, turn rotation, scoring and puzzle sequencing.

use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::GameError;

use super::{
    clock::{Clock, ClockTick},
    countdown::{Countdown, CountdownTick},
    expression,
    notifier::{Notification, Notifier},
    puzzle::{Puzzle, PuzzleGenerator},
    roster::{Player, Roster},
    state_machine::{GameEvent, GameStateMachine, SessionState},
};

/// Default seconds per turn.
pub const DEFAULT_TIME_FRAME: u32 = 60;
/// Default number of puzzles per game.
pub const DEFAULT_ROUNDS: usize = 3;

/// Fixed parameters of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Seconds granted per turn.
    pub time_frame: u32,
    /// Puzzles played per game.
    pub rounds: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            time_frame: DEFAULT_TIME_FRAME,
            rounds: DEFAULT_ROUNDS,
        }
    }
}

/// Last known projections of a session, handed to new subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Lifecycle state.
    pub state: SessionState,
    /// Seconds left in the current turn.
    pub remaining: u32,
    /// Player whose turn it is, or the last winner.
    pub current_player: Option<String>,
    /// Puzzle in play.
    pub current_puzzle: Option<Puzzle>,
    /// Roster in turn order.
    pub players: Vec<Player>,
}

/// State machine of one game session.
///
/// Every command runs to completion and publishes its notifications before returning. The
/// engine is not shared: its owner feeds it commands and clock ticks one at a time.
pub struct GameEngine<C: Clock> {
    machine: GameStateMachine,
    roster: Roster,
    puzzles: Vec<Puzzle>,
    current_player: Option<String>,
    current_puzzle: Option<usize>,
    countdown: Countdown<C>,
    rounds: usize,
    first_start: bool,
    generator: PuzzleGenerator,
    rng: StdRng,
    notifier: Notifier,
}

impl<C: Clock> GameEngine<C> {
    /// Engine with OS-seeded randomness.
    pub fn new(clock: C, settings: SessionSettings) -> Self {
        Self::with_randomness(
            clock,
            settings,
            PuzzleGenerator::new(),
            StdRng::from_os_rng(),
        )
    }

    /// Engine with deterministic randomness.
    pub fn seeded(clock: C, settings: SessionSettings, seed: u64) -> Self {
        Self::with_randomness(
            clock,
            settings,
            PuzzleGenerator::seeded(seed),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        )
    }

    fn with_randomness(
        clock: C,
        settings: SessionSettings,
        generator: PuzzleGenerator,
        rng: StdRng,
    ) -> Self {
        Self {
            machine: GameStateMachine::new(),
            roster: Roster::new(),
            puzzles: Vec::new(),
            current_player: None,
            current_puzzle: None,
            countdown: Countdown::new(clock, settings.time_frame),
            rounds: settings.rounds,
            first_start: true,
            generator,
            rng,
            notifier: Notifier::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Players in turn order.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Identifier of the player whose turn it is.
    pub fn current_player(&self) -> Option<&str> {
        self.current_player.as_deref()
    }

    /// Puzzle in play.
    pub fn current_puzzle(&self) -> Option<&Puzzle> {
        self.current_puzzle.and_then(|index| self.puzzles.get(index))
    }

    /// Position of the puzzle in play within the game's sequence.
    pub fn current_puzzle_index(&self) -> Option<usize> {
        self.current_puzzle
    }

    /// Puzzles of the current game.
    pub fn puzzles(&self) -> &[Puzzle] {
        &self.puzzles
    }

    /// Seconds left in the current turn.
    pub fn remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    /// Whether the turn countdown is ticking.
    pub fn is_counting_down(&self) -> bool {
        self.countdown.is_running()
    }

    /// Collect the current projections.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.machine.state(),
            remaining: self.countdown.remaining(),
            current_player: self.current_player.clone(),
            current_puzzle: self.current_puzzle().cloned(),
            players: self.roster.to_vec(),
        }
    }

    /// Subscribe to notifications along with the projections they will update.
    /// Returns `None` once the engine was torn down.
    pub fn subscribe(&self) -> Option<(SessionSnapshot, broadcast::Receiver<Notification>)> {
        let receiver = self.notifier.subscribe()?;
        Some((self.snapshot(), receiver))
    }

    /// Start a game with the current roster.
    pub fn start(&mut self) -> Result<(), GameError> {
        if self.machine.is_ongoing() || self.roster.len() < 2 {
            return Err(GameError::Precondition(
                "cannot start while a game is ongoing or with fewer than 2 players".into(),
            ));
        }

        self.puzzles = self.generator.sequence(self.rounds);

        self.roster.reset_all();
        self.roster.restore_time_budget(self.countdown.time_frame());
        self.publish_players();

        let previous = if self.first_start {
            None
        } else {
            self.current_player
                .clone()
                .filter(|id| self.roster.contains(id))
        };
        self.first_start = false;
        let first = previous.or_else(|| self.random_player());
        self.set_current_player(first);

        self.set_current_puzzle(0);
        self.transition(GameEvent::Start)?;
        self.restart_countdown();
        Ok(())
    }

    /// Abort any game and go back to waiting with cleared scores.
    pub fn reset(&mut self) -> Result<(), GameError> {
        self.first_start = false;
        self.reset_countdown();

        self.roster.reset_all();
        self.roster.restore_time_budget(self.countdown.time_frame());
        self.publish_players();

        self.set_current_player(None);
        self.transition(GameEvent::Reset)
    }

    /// Add a player at the end of the turn order, returning the roster size.
    pub fn player_join(&mut self, id: String, name: String) -> Result<usize, GameError> {
        if self.machine.is_ongoing() {
            return Err(GameError::Precondition(
                "cannot join while a game is ongoing".into(),
            ));
        }

        self.roster.add(id, name, self.countdown.time_frame())?;
        self.publish_players();
        Ok(self.roster.len())
    }

    /// Remove a player. When the leaver holds the turn and enough players remain, the turn
    /// passes on first; when fewer than two players remain, the game ends.
    pub fn player_leave(&mut self, id: &str) -> Result<bool, GameError> {
        if !self.roster.contains(id) {
            return Ok(false);
        }

        if self.machine.is_ongoing()
            && self.current_player.as_deref() == Some(id)
            && self.roster.len() > 2
        {
            self.advance_turn()?;
        }

        self.roster.remove(id);
        self.publish_players();

        if self.machine.is_ongoing() && self.roster.len() < 2 {
            self.end()?;
        }

        Ok(true)
    }

    /// Submit an expression for the puzzle in play on behalf of the current player.
    pub fn player_submit(&mut self, id: &str, expression: &str) -> Result<(), GameError> {
        if !self.machine.is_ongoing() || self.current_player.as_deref() != Some(id) {
            return Err(GameError::Precondition(format!(
                "player `{id}` does not hold the turn"
            )));
        }

        let puzzle = self
            .current_puzzle()
            .ok_or_else(|| GameError::Precondition("no puzzle in play".into()))?;
        expression::validate(expression, puzzle)?;

        let time_used = self.countdown.elapsed();
        if let Some(player) = self.roster.get_mut(id) {
            player.time_used = time_used;
        }
        self.advance_turn()
    }

    /// Feed a clock tick. A timeout ends the current turn without a score.
    pub fn on_tick(&mut self, tick: ClockTick) {
        let remaining = match self.countdown.tick(tick) {
            None => return,
            Some(CountdownTick::Remaining(remaining)) => remaining,
            Some(CountdownTick::TimedOut { remaining }) => {
                if self.machine.is_ongoing() {
                    if let Err(err) = self.advance_turn() {
                        warn!(error = %err, "failed to advance turn after timeout");
                    }
                }
                remaining
            }
        };
        self.notifier
            .publish(Notification::RemainingTimeChanged(remaining));
    }

    /// Stop the countdown for good and complete the notification stream.
    pub fn teardown(&mut self) {
        self.countdown.teardown();
        self.notifier.close();
    }

    /// Close the current turn and hand it to the next player in roster order. Closes the round
    /// once everybody played, and the game after the last puzzle.
    fn advance_turn(&mut self) -> Result<(), GameError> {
        self.countdown.stop();

        let Some(current) = self.current_player.clone() else {
            return Err(GameError::Precondition("no player holds the turn".into()));
        };
        if let Some(player) = self.roster.get_mut(&current) {
            player.has_played = true;
        }

        let Some(next) = self.roster.next_after(&current).map(|player| player.id.clone()) else {
            return self.end();
        };

        if self.roster.all_played() {
            self.close_round();
            let next_puzzle = self.current_puzzle.map_or(0, |index| index + 1);
            if next_puzzle >= self.puzzles.len() {
                return self.end();
            }
            self.set_current_puzzle(next_puzzle);
        } else {
            self.publish_players();
        }

        self.set_current_player(Some(next));
        self.restart_countdown();
        Ok(())
    }

    /// Award a point to every player tied on the fastest time, then rearm everyone's budget.
    fn close_round(&mut self) {
        let time_frame = self.countdown.time_frame();
        let fastest = self.roster.min_time_used();

        for player in self.roster.iter_mut() {
            if Some(player.time_used) == fastest {
                player.score += 1;
            }
        }
        self.roster.restore_time_budget(time_frame);
        self.publish_players();
    }

    /// Stop the game, announce the winner and settle back to waiting.
    fn end(&mut self) -> Result<(), GameError> {
        self.reset_countdown();

        let winner = self.roster.leader().map(|player| player.id.clone());
        self.set_current_player(winner);

        self.transition(GameEvent::Finish)?;
        self.transition(GameEvent::Settle)
    }

    fn transition(&mut self, event: GameEvent) -> Result<(), GameError> {
        let state = self
            .machine
            .apply(event)
            .map_err(|err| GameError::Precondition(err.to_string()))?;
        self.notifier.publish(Notification::StateChanged(state));
        Ok(())
    }

    fn random_player(&mut self) -> Option<String> {
        if self.roster.is_empty() {
            return None;
        }
        let index = self.rng.random_range(0..self.roster.len());
        self.roster.get_index(index).map(|player| player.id.clone())
    }

    fn set_current_player(&mut self, id: Option<String>) {
        self.current_player = id.clone();
        self.notifier
            .publish(Notification::CurrentPlayerChanged(id));
    }

    fn set_current_puzzle(&mut self, index: usize) {
        self.current_puzzle = Some(index);
        self.notifier.publish(Notification::CurrentPuzzleChanged(
            self.puzzles.get(index).cloned(),
        ));
    }

    fn publish_players(&self) {
        self.notifier
            .publish(Notification::PlayersChanged(self.roster.to_vec()));
    }

    fn restart_countdown(&mut self) {
        let remaining = self.countdown.restart();
        self.notifier
            .publish(Notification::RemainingTimeChanged(remaining));
    }

    fn reset_countdown(&mut self) {
        let remaining = self.countdown.reset();
        self.notifier
            .publish(Notification::RemainingTimeChanged(remaining));
    }
}
