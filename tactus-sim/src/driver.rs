//! Queue feed/drain driver.
//!
//! Host-side counterpart of the sequencer: keeps the instruction queue
//! topped up without ever suspending the caller indefinitely, and drains
//! wait results as they appear so the core never wedges on a full output
//! queue. Backpressure from a full instruction queue is normal operation;
//! the driver simply resumes feeding on the next pump.

use log::{debug, trace};

use tactus_core::{Program, Sequencer};

use crate::bus::PseudoclockBus;
use crate::simulator::SimError;

/// Feed/drain driver for one pseudoclock run
pub struct ClockDriver<'a> {
    bus: &'a PseudoclockBus,
    words: Vec<u32>,
    cursor: usize,
    waits: Vec<u32>,
    /// Wait results a complete run will produce, when known
    expected_waits: Option<usize>,
}

impl<'a> ClockDriver<'a> {
    /// Create a driver for a sealed program
    pub fn new(bus: &'a PseudoclockBus, program: &Program) -> Result<Self, SimError> {
        if !program.is_sealed() {
            return Err(SimError::UnsealedProgram);
        }
        Ok(Self {
            bus,
            words: program.words().to_vec(),
            cursor: 0,
            waits: Vec::new(),
            expected_waits: Some(program.wait_count()),
        })
    }

    /// Create a driver over a raw word stream.
    ///
    /// No structure is checked; this exists to reproduce caller bugs
    /// (truncated streams, missing stop sentinel) against the core's
    /// starvation diagnostics.
    pub fn from_words(bus: &'a PseudoclockBus, words: &[u32]) -> Self {
        Self {
            bus,
            words: words.to_vec(),
            cursor: 0,
            waits: Vec::new(),
            expected_waits: None,
        }
    }

    /// Gate the first pulse on the external trigger pin by injecting a
    /// wait instruction ahead of the program.
    ///
    /// The injected wait behaves like any other: it emits one extra wait
    /// result (reported first) and falls through to the program on
    /// timeout.
    pub fn with_hw_trigger(mut self, timeout: u32) -> Self {
        // A zero timeout would encode the stop sentinel.
        let timeout = timeout.max(1);
        self.words.splice(0..0, [0, timeout]);
        self.expected_waits = self.expected_waits.map(|n| n + 1);
        self
    }

    /// Feed as many instruction words as the queue accepts and drain
    /// every available wait result. Never suspends.
    pub fn pump(&mut self) {
        while self.cursor < self.words.len() && self.bus.try_feed(self.words[self.cursor]) {
            self.cursor += 1;
        }
        self.drain();
    }

    /// Drain available wait results without feeding
    pub fn drain(&mut self) {
        while let Some(remaining) = self.bus.try_take_result() {
            trace!("wait resolved with {} cycles remaining", remaining);
            self.waits.push(remaining);
        }
    }

    /// Feed the rest of the word stream, suspending on backpressure.
    ///
    /// For use from an async context running alongside the core; the
    /// synchronous harness uses [`pump`](Self::pump) instead.
    pub async fn feed_remaining(&mut self) {
        while self.cursor < self.words.len() {
            self.bus.feed(self.words[self.cursor]).await;
            self.cursor += 1;
        }
    }

    /// Check if every program word has been pushed to the queue
    pub fn fed_all(&self) -> bool {
        self.cursor == self.words.len()
    }

    /// Wait results recovered so far, in resolution order
    pub fn waits(&self) -> &[u32] {
        &self.waits
    }

    /// Number of wait results recovered so far
    pub fn waits_processed(&self) -> usize {
        self.waits.len()
    }

    /// Check if the run has produced every expected wait result.
    ///
    /// Always `false` for raw word streams, where the count is unknown.
    pub fn all_waits_recovered(&self) -> bool {
        self.expected_waits == Some(self.waits.len())
    }

    /// Consume the driver, returning the recovered wait results
    pub fn take_waits(self) -> Vec<u32> {
        self.waits
    }

    /// Tear down an in-progress run: stop feeding, reset the core and
    /// empty both queues. Results recovered before the abort are kept;
    /// anything still in flight is discarded.
    pub fn abort(&mut self, seq: &mut Sequencer) {
        debug!(
            "aborting run: {} of {} words fed, {} waits recovered",
            self.cursor,
            self.words.len(),
            self.waits.len()
        );
        self.cursor = self.words.len();
        seq.reset();
        self.bus.purge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tactus_core::{Instruction, Sequencer, SequencerBus, Tick, FIFO_DEPTH};

    fn run(half_period: u32, reps: u32) -> Instruction {
        Instruction::Run { half_period, reps }
    }

    fn program(instructions: &[Instruction]) -> Program {
        let mut program = Program::new();
        for &inst in instructions {
            program.push(inst).unwrap();
        }
        program.seal().unwrap();
        program
    }

    #[test]
    fn test_unsealed_program_rejected() {
        let bus = PseudoclockBus::new();
        let mut unsealed = Program::new();
        unsealed.push(run(10, 1)).unwrap();
        assert!(matches!(
            ClockDriver::new(&bus, &unsealed),
            Err(SimError::UnsealedProgram)
        ));
    }

    #[test]
    fn test_pump_respects_fifo_depth() {
        let bus = PseudoclockBus::new();
        let program = program(&[run(10, 1), run(20, 1), run(30, 1)]);
        let mut driver = ClockDriver::new(&bus, &program).unwrap();

        driver.pump();
        assert_eq!(bus.queued_instructions(), FIFO_DEPTH);
        assert!(!driver.fed_all());

        // The core consumes a pair; the next pump tops the queue up.
        assert_eq!(bus.pull_instruction(), Some(1));
        assert_eq!(bus.pull_instruction(), Some(10));
        driver.pump();
        assert_eq!(bus.queued_instructions(), FIFO_DEPTH);
    }

    #[test]
    fn test_full_feed_and_drain_cycle() {
        let bus = PseudoclockBus::new();
        let program = program(&[run(2, 1), Instruction::Wait { timeout: 7 }]);
        let mut driver = ClockDriver::new(&bus, &program).unwrap();
        let mut seq = Sequencer::new();
        bus.release();

        let mut cycles = 0;
        loop {
            driver.pump();
            let tick = seq.step(&bus, false);
            driver.drain();
            if tick == Tick::Idle {
                break;
            }
            cycles += 1;
            assert!(cycles < 100, "run did not stop");
        }

        assert!(driver.fed_all());
        assert!(driver.all_waits_recovered());
        assert_eq!(driver.waits(), &[0]);
    }

    #[test]
    fn test_hw_trigger_prepends_wait() {
        let bus = PseudoclockBus::new();
        let program = program(&[run(5, 1)]);
        let driver = ClockDriver::new(&bus, &program)
            .unwrap()
            .with_hw_trigger(1000);

        assert_eq!(driver.words[..2], [0, 1000]);
        assert_eq!(driver.expected_waits, Some(1));
    }

    #[test]
    fn test_many_waits_drained_before_fifo_fills() {
        // More wait results than the output FIFO holds; per-cycle
        // draining keeps the core from wedging.
        let bus = PseudoclockBus::new();
        let instructions: Vec<_> = (0..FIFO_DEPTH as u32 + 2)
            .map(|_| Instruction::Wait { timeout: 1 })
            .collect();
        let program = program(&instructions);
        let mut driver = ClockDriver::new(&bus, &program).unwrap();
        let mut seq = Sequencer::new();
        bus.release();

        let mut cycles = 0;
        loop {
            driver.pump();
            let tick = seq.step(&bus, false);
            driver.drain();
            assert_ne!(tick, Tick::Backpressured);
            if tick == Tick::Idle {
                break;
            }
            cycles += 1;
            assert!(cycles < 100, "run did not stop");
        }

        assert_eq!(driver.waits(), &[0; FIFO_DEPTH + 2]);
        assert!(driver.all_waits_recovered());
    }

    #[test]
    fn test_feed_remaining_suspends_on_backpressure() {
        use embassy_futures::join::join;
        use embassy_futures::{block_on, yield_now};

        // 14 words against a 4-deep queue: the feeder must suspend and
        // resume several times before the core reaches the stop sentinel.
        let instructions: Vec<_> = (0..6).map(|_| run(2, 1)).collect();
        let program = program(&instructions);
        let bus = PseudoclockBus::new();
        let mut driver = ClockDriver::new(&bus, &program).unwrap();
        let mut seq = Sequencer::new();
        bus.release();

        let runner = async {
            let mut cycles = 0;
            while seq.step(&bus, false) != Tick::Idle {
                cycles += 1;
                assert!(cycles < 100, "run did not stop");
                yield_now().await;
            }
            cycles
        };

        let ((), cycles) = block_on(join(driver.feed_remaining(), runner));
        assert_eq!(cycles, 6 * 4);
        assert!(driver.fed_all());
    }

    #[test]
    fn test_abort_discards_in_flight_state() {
        let bus = PseudoclockBus::new();
        let program = program(&[run(50, 10), Instruction::Wait { timeout: 99 }]);
        let mut driver = ClockDriver::new(&bus, &program).unwrap();
        let mut seq = Sequencer::new();
        bus.release();

        for _ in 0..30 {
            driver.pump();
            seq.step(&bus, false);
        }
        assert!(seq.output_high());

        driver.abort(&mut seq);
        assert!(seq.is_idle());
        assert!(!seq.output_high());
        assert_eq!(bus.queued_instructions(), 0);
        assert!(driver.fed_all());

        // The core stays idle: the release was purged with the queues.
        assert_eq!(seq.step(&bus, false), Tick::Idle);
    }
}
