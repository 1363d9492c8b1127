use super::clock::{Clock, ClockTick};

/// Outcome of feeding a clock tick into a [`Countdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// One second elapsed; carries the new remaining time.
    Remaining(u32),
    /// The time frame elapsed. The countdown already wrapped back to the full time frame.
    TimedOut {
        /// Remaining time after the wrap (always the full time frame).
        remaining: u32,
    },
}

/// Turn countdown composed over a [`Clock`].
///
/// The remaining time runs `time_frame - 1, ..., 0` across ticks; the tick after reaching zero
/// wraps back to `time_frame` and reports [`CountdownTick::TimedOut`] exactly once.
#[derive(Debug)]
pub struct Countdown<C> {
    clock: C,
    time_frame: u32,
    remaining: u32,
}

impl<C: Clock> Countdown<C> {
    /// Wrap `clock` with a countdown over `time_frame` seconds.
    pub fn new(clock: C, time_frame: u32) -> Self {
        Self {
            clock,
            time_frame,
            remaining: time_frame,
        }
    }

    /// Length of a turn in seconds.
    pub fn time_frame(&self) -> u32 {
        self.time_frame
    }

    /// Seconds left in the current turn.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Seconds consumed since the turn started.
    pub fn elapsed(&self) -> u32 {
        self.time_frame - self.remaining
    }

    /// Whether the underlying clock is ticking.
    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Borrow the underlying clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Pause ticking while keeping the remaining time.
    pub fn stop(&mut self) {
        self.clock.stop();
    }

    /// Start a fresh turn and return the (full) remaining time to publish.
    pub fn restart(&mut self) -> u32 {
        self.clock.restart();
        self.remaining = self.time_frame;
        self.remaining
    }

    /// Stop ticking, rewind to the full time frame and return it to publish.
    pub fn reset(&mut self) -> u32 {
        self.clock.reset();
        self.remaining = self.time_frame;
        self.remaining
    }

    /// Release the clock for good.
    pub fn teardown(&mut self) {
        self.clock.teardown();
    }

    /// Advance by one tick. Returns `None` when the tick belongs to a cancelled clock task.
    pub fn tick(&mut self, tick: ClockTick) -> Option<CountdownTick> {
        if !self.clock.accepts(tick) {
            return None;
        }

        if self.remaining == 0 {
            self.remaining = self.time_frame;
            Some(CountdownTick::TimedOut {
                remaining: self.remaining,
            })
        } else {
            self.remaining -= 1;
            Some(CountdownTick::Remaining(self.remaining))
        }
    }
}
