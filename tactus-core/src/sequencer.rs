//! Cycle-accurate sequencer state machine.
//!
//! The sequencer is a model of a tiny independently clocked execution
//! unit: it consumes instruction word pairs from the input queue, drives
//! a square wave on its output pin, optionally polls a trigger pin during
//! waits, and pushes wait-result words onto the output queue.
//!
//! One call to [`Sequencer::step`] is one core clock cycle. Only the
//! high hold, the low hold and the wait poll consume cycles; word fetches
//! and path selection are resolved inside the boundary cycle. That keeps
//! the central timing invariant exact: a run instruction with half-period
//! `h` and `r` reps occupies `r * 2 * h` cycles, with no extra or missing
//! edges at instruction boundaries.

use crate::traits::SequencerBus;

/// How a single core clock cycle was spent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// Executed one cycle of a run or wait instruction
    Active,
    /// Blocked in idle waiting for the release signal
    Idle,
    /// Blocked on an empty input queue mid-program (caller bug; the
    /// driver's watchdog turns sustained starvation into a diagnostic)
    Starved,
    /// Blocked pushing a wait result onto a full output queue
    Backpressured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Blocked on the release signal
    Idle,
    /// Reading the first word of the next pair (reps, or the wait marker)
    FetchReps,
    /// Reading the half-period of a run instruction
    FetchPeriod,
    /// Holding the output high while `x` counts down
    HighLoop,
    /// Holding the output low while `x` counts down
    LowLoop,
    /// Reading the timeout of a wait instruction (or the stop sentinel)
    FetchTimeout,
    /// Polling the trigger pin while `x` counts down
    WaitLoop,
    /// Pushing a resolved wait result, retried until the queue has space
    EmitResult { remaining: u32 },
}

/// The pseudoclock sequencer core
#[derive(Debug)]
pub struct Sequencer {
    state: State,
    /// Countdown register: half-period cycles or wait timeout
    x: u32,
    /// Repeat counter for the current run instruction
    y: u32,
    /// Latched half-period, reloaded once per level
    half_period: u32,
    /// Current output pin level
    output_high: bool,
}

impl Sequencer {
    /// Create a sequencer in idle with the output low
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            x: 0,
            y: 0,
            half_period: 0,
            output_high: false,
        }
    }

    /// Current output pin level
    pub fn output_high(&self) -> bool {
        self.output_high
    }

    /// Check if the sequencer is blocked on the release signal
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Check if the sequencer is polling the trigger pin
    pub fn is_waiting(&self) -> bool {
        matches!(self.state, State::WaitLoop)
    }

    /// Force the sequencer back to idle with the output low.
    ///
    /// This is the abort path: the driver drains both queues and resets
    /// the core. Any in-flight instruction is discarded.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.x = 0;
        self.y = 0;
        self.half_period = 0;
        self.output_high = false;
    }

    /// Execute one core clock cycle.
    ///
    /// `trigger` is the level of the input pin; it is sampled only while
    /// a wait instruction is polling.
    pub fn step(&mut self, bus: &impl SequencerBus, trigger: bool) -> Tick {
        loop {
            match self.state {
                State::Idle => {
                    if bus.take_release() {
                        self.state = State::FetchReps;
                        continue;
                    }
                    return Tick::Idle;
                }

                State::FetchReps => match bus.pull_instruction() {
                    Some(0) => {
                        // reps == 0: the next word is a wait timeout
                        self.state = State::FetchTimeout;
                    }
                    Some(reps) => {
                        self.y = reps;
                        self.state = State::FetchPeriod;
                    }
                    None => return Tick::Starved,
                },

                State::FetchPeriod => match bus.pull_instruction() {
                    Some(period) => {
                        // A zero half-period cannot be produced by the
                        // encoder; clamp rather than underflow.
                        self.half_period = period.max(1);
                        self.x = self.half_period;
                        self.state = State::HighLoop;
                    }
                    None => return Tick::Starved,
                },

                State::HighLoop => {
                    self.output_high = true;
                    self.x -= 1;
                    if self.x == 0 {
                        self.x = self.half_period;
                        self.state = State::LowLoop;
                    }
                    return Tick::Active;
                }

                State::LowLoop => {
                    self.output_high = false;
                    self.x -= 1;
                    if self.x == 0 {
                        self.y -= 1;
                        if self.y != 0 {
                            // Continue path: another pass with the same
                            // half-period.
                            self.x = self.half_period;
                            self.state = State::HighLoop;
                        } else {
                            // New-instruction path. The fetch states are
                            // zero-cycle, so the first high cycle of the
                            // next run instruction lands on the very next
                            // tick - exactly where the continue path puts
                            // it. Spending any cycles here would skew the
                            // edge timing between the two paths.
                            self.state = State::FetchReps;
                        }
                    }
                    return Tick::Active;
                }

                State::FetchTimeout => match bus.pull_instruction() {
                    Some(0) => {
                        // Stop sentinel: back to idle. Any release fired
                        // while we were running is discarded, so the next
                        // run needs a fresh release.
                        bus.clear_release();
                        self.reset();
                    }
                    Some(timeout) => {
                        self.x = timeout;
                        self.state = State::WaitLoop;
                    }
                    None => return Tick::Starved,
                },

                State::WaitLoop => {
                    // Pin check strictly before the timeout check, so a
                    // trigger on the last poll cycle still reports a
                    // nonzero remainder and zero is reserved for a true
                    // timeout.
                    if trigger {
                        self.state = State::EmitResult { remaining: self.x };
                        continue;
                    }
                    self.x -= 1;
                    if self.x == 0 {
                        self.state = State::EmitResult { remaining: 0 };
                    }
                    return Tick::Active;
                }

                State::EmitResult { remaining } => {
                    if bus.push_wait_result(remaining) {
                        // Resume at the next instruction immediately; no
                        // new release is needed after a wait.
                        self.state = State::FetchReps;
                        continue;
                    }
                    return Tick::Backpressured;
                }
            }
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
