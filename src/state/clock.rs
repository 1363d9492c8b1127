//! One-second periodic ticker driving the per-turn countdown.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::debug;

/// Default tick period used by the game.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Tick emitted by a [`Clock`], stamped with the generation of the task that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    /// Generation of the periodic task that emitted this tick.
    pub generation: u64,
}

/// Contract of a restartable periodic ticker.
///
/// At most one periodic task is alive per clock. Every `start` opens a new generation, and
/// [`Clock::accepts`] only admits ticks of the live generation, so a tick that was already
/// queued when its task got cancelled is discarded by the owner.
pub trait Clock: Send + 'static {
    /// Begin ticking, cancelling any task that is still running.
    fn start(&mut self);

    /// Stop ticking. Safe to call when nothing runs.
    fn stop(&mut self);

    /// Stop then start again.
    fn restart(&mut self) {
        self.stop();
        self.start();
    }

    /// Stop without starting again.
    fn reset(&mut self) {
        self.stop();
    }

    /// Stop for good and release the periodic task; later `start` calls do nothing.
    fn teardown(&mut self);

    /// Whether a periodic task is currently alive.
    fn is_running(&self) -> bool;

    /// Whether `tick` was produced by the live periodic task.
    fn accepts(&self, tick: ClockTick) -> bool;
}

/// [`Clock`] backed by a tokio interval task pushing ticks into an unbounded channel.
///
/// Must be started from within a tokio runtime.
pub struct IntervalClock {
    period: Duration,
    sink: mpsc::UnboundedSender<ClockTick>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    torn_down: bool,
}

impl IntervalClock {
    /// Build a clock that ticks every `period` into `sink`.
    pub fn new(period: Duration, sink: mpsc::UnboundedSender<ClockTick>) -> Self {
        Self {
            period,
            sink,
            generation: 0,
            task: None,
            torn_down: false,
        }
    }
}

impl Clock for IntervalClock {
    fn start(&mut self) {
        self.stop();
        if self.torn_down {
            debug!("ignoring start on a torn down clock");
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let period = self.period;
        let sink = self.sink.clone();

        self.task = Some(tokio::spawn(async move {
            // First tick one full period after start, not immediately.
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if sink.send(ClockTick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn teardown(&mut self) {
        self.stop();
        self.torn_down = true;
    }

    fn is_running(&self) -> bool {
        self.task.is_some()
    }

    fn accepts(&self, tick: ClockTick) -> bool {
        self.task.is_some() && tick.generation == self.generation
    }
}

impl Drop for IntervalClock {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Clock driven by hand, for deterministic tests of countdown consumers.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    generation: u64,
    running: bool,
    torn_down: bool,
    /// Number of effective `start` calls.
    pub starts: usize,
}

#[cfg(test)]
impl ManualClock {
    /// Produce the tick the live task would emit next.
    pub fn pulse(&self) -> ClockTick {
        ClockTick {
            generation: self.generation,
        }
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn start(&mut self) {
        self.stop();
        if self.torn_down {
            return;
        }
        self.generation += 1;
        self.running = true;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn teardown(&mut self) {
        self.stop();
        self.torn_down = true;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn accepts(&self, tick: ClockTick) -> bool {
        self.running && tick.generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn interval_clock_ticks_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = IntervalClock::new(TICK_PERIOD, tx);
        clock.start();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first, ClockTick { generation: 1 });
        assert_eq!(second, first);
        assert!(clock.accepts(first));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_invalidates_ticks_from_previous_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = IntervalClock::new(TICK_PERIOD, tx);
        clock.start();
        let stale = rx.recv().await.unwrap();

        clock.restart();
        assert!(!clock.accepts(stale));

        let fresh = rx.recv().await.unwrap();
        assert_eq!(fresh.generation, 2);
        assert!(clock.accepts(fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_and_teardown_are_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut clock = IntervalClock::new(TICK_PERIOD, tx);
        clock.stop();
        clock.teardown();
        clock.teardown();
        clock.start();
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_without_restarting() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = IntervalClock::new(TICK_PERIOD, tx);
        clock.start();
        clock.reset();
        assert!(!clock.is_running());

        tokio::time::advance(TICK_PERIOD * 3).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn manual_clock_only_accepts_live_generation() {
        let mut clock = ManualClock::default();
        assert!(!clock.accepts(clock.pulse()));

        clock.start();
        let tick = clock.pulse();
        assert!(clock.accepts(tick));

        clock.restart();
        assert!(!clock.accepts(tick));
        assert_eq!(clock.starts, 2);
    }
}
