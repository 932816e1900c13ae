//! Deterministic co-simulation harness.
//!
//! Pumps the feed/drain driver and the sequencer core one cycle at a
//! time in a single thread, so every cycle of a run is observable and
//! reproducible: the output level trace, the wait results, and the
//! run-status lifecycle. This is the in-process stand-in for the real
//! co-processor arrangement, where the driver and the core would run in
//! separate execution contexts against the same bus.

use log::debug;
use thiserror::Error;

use tactus_core::{Program, RunEvent, RunStatus, Sequencer, Tick};

use crate::bus::PseudoclockBus;
use crate::driver::ClockDriver;

/// Consecutive starved cycles after the feed is exhausted before the
/// watchdog declares the run wedged
pub const STARVATION_WATCHDOG_CYCLES: u32 = 64;

/// Errors surfaced by the harness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimError {
    /// The program does not end in a stop sentinel
    #[error("program is not sealed with a stop sentinel")]
    UnsealedProgram,
    /// The core stalled on an empty instruction queue mid-program
    /// (truncated stream or missing stop sentinel: a caller bug the
    /// watchdog turns into a diagnostic)
    #[error("sequencer starved of instructions at cycle {cycle}")]
    Starved { cycle: u64 },
    /// The run did not stop within the configured cycle budget
    #[error("cycle budget exhausted before the program stopped")]
    CycleBudgetExhausted,
}

/// When the external trigger pin reads high, in global harness cycles
#[derive(Debug, Clone, Default)]
pub struct TriggerSchedule {
    /// Half-open [start, end) windows in which the pin is high
    windows: Vec<(u64, u64)>,
}

impl TriggerSchedule {
    /// Pin held low forever
    pub fn never() -> Self {
        Self::default()
    }

    /// Pin high for `len` cycles starting at `start`
    pub fn pulse(start: u64, len: u64) -> Self {
        Self {
            windows: vec![(start, start + len)],
        }
    }

    /// Pin high from `start` onward
    pub fn high_from(start: u64) -> Self {
        Self {
            windows: vec![(start, u64::MAX)],
        }
    }

    /// Add another high window
    pub fn and_pulse(mut self, start: u64, len: u64) -> Self {
        self.windows.push((start, start + len));
        self
    }

    /// Pin level at the given cycle
    pub fn is_high(&self, cycle: u64) -> bool {
        self.windows
            .iter()
            .any(|&(start, end)| cycle >= start && cycle < end)
    }
}

/// Per-run harness options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Hard cap on simulated cycles
    pub max_cycles: u64,
    /// Gate the first pulse on the trigger pin by injecting a leading
    /// wait with this timeout
    pub hw_trigger: Option<u32>,
    /// Abort the run from the driver side at this cycle
    pub abort_at: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_cycles: 1_000_000,
            hw_trigger: None,
            abort_at: None,
        }
    }
}

/// What a completed (or aborted) run looked like
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Cycles simulated, including idle and stalled ones
    pub total_cycles: u64,
    /// Cycles the core spent executing instructions
    pub active_cycles: u64,
    /// Wait results in resolution order
    pub waits: Vec<u32>,
    /// Output pin level after each simulated cycle
    pub trace: Vec<bool>,
    /// Run was torn down by the abort path rather than the stop sentinel
    pub aborted: bool,
}

/// Co-simulation of one pseudoclock: bus, core and run status
pub struct Simulator {
    bus: PseudoclockBus,
    seq: Sequencer,
    status: RunStatus,
}

impl Simulator {
    /// Create a simulator with an idle core and empty queues
    pub fn new() -> Self {
        Self {
            bus: PseudoclockBus::new(),
            seq: Sequencer::new(),
            status: RunStatus::Stopped,
        }
    }

    /// Current run status
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Execute a sealed program to completion
    pub fn run(
        &mut self,
        program: &Program,
        schedule: &TriggerSchedule,
        opts: RunOptions,
    ) -> Result<RunReport, SimError> {
        if !program.is_sealed() {
            return Err(SimError::UnsealedProgram);
        }
        self.run_words(program.words(), schedule, opts)
    }

    /// Execute a raw word stream.
    ///
    /// No structure is checked, so a truncated stream or a missing stop
    /// sentinel starves the core and trips the watchdog; this is how the
    /// starvation diagnostic is exercised.
    pub fn run_raw(
        &mut self,
        words: &[u32],
        schedule: &TriggerSchedule,
        opts: RunOptions,
    ) -> Result<RunReport, SimError> {
        self.run_words(words, schedule, opts)
    }

    fn run_words(
        &mut self,
        words: &[u32],
        schedule: &TriggerSchedule,
        opts: RunOptions,
    ) -> Result<RunReport, SimError> {
        // Fresh start regardless of how the previous run ended.
        self.bus.purge();
        self.seq.reset();

        let mut driver = ClockDriver::from_words(&self.bus, words);
        if let Some(timeout) = opts.hw_trigger {
            driver = driver.with_hw_trigger(timeout);
        }

        self.status = self.status.transition(RunEvent::StartRequested);
        self.bus.release();

        let mut trace = Vec::new();
        let mut active_cycles: u64 = 0;
        let mut starved_streak: u32 = 0;
        let mut cycle: u64 = 0;
        let mut aborted = false;
        let mut completed = false;

        while cycle < opts.max_cycles {
            if opts.abort_at == Some(cycle) {
                abort_run(&mut self.status, &mut self.seq, &mut driver);
                aborted = true;
                break;
            }

            driver.pump();
            let tick = self.seq.step(&self.bus, schedule.is_high(cycle));
            driver.drain();
            trace.push(self.seq.output_high());
            cycle += 1;

            match tick {
                Tick::Active => {
                    active_cycles += 1;
                    starved_streak = 0;
                    if self.status == RunStatus::TransitionToRunning {
                        self.status = self.status.transition(RunEvent::Launched);
                    }
                }
                Tick::Idle => {
                    // The core is back on the release block: the stop
                    // sentinel was consumed.
                    self.status = self.status.transition(RunEvent::SequenceComplete);
                    driver.drain();
                    self.status = self.status.transition(RunEvent::CleanupComplete);
                    completed = true;
                    break;
                }
                Tick::Starved => {
                    starved_streak += 1;
                    if driver.fed_all() && starved_streak >= STARVATION_WATCHDOG_CYCLES {
                        abort_run(&mut self.status, &mut self.seq, &mut driver);
                        return Err(SimError::Starved { cycle });
                    }
                }
                Tick::Backpressured => {
                    // Resolved by the drain above on the next cycle.
                    starved_streak = 0;
                }
            }
        }

        if !completed && !aborted {
            abort_run(&mut self.status, &mut self.seq, &mut driver);
            return Err(SimError::CycleBudgetExhausted);
        }

        debug!(
            "run finished: {} cycles ({} active), {} waits, status {:?}",
            cycle,
            active_cycles,
            driver.waits_processed(),
            self.status
        );

        Ok(RunReport {
            total_cycles: cycle,
            active_cycles,
            waits: driver.take_waits(),
            trace,
            aborted,
        })
    }
}

/// Run the abort leg of the status machine and tear the run down
fn abort_run(status: &mut RunStatus, seq: &mut Sequencer, driver: &mut ClockDriver<'_>) {
    *status = status.transition(RunEvent::AbortIssued);
    *status = status.transition(RunEvent::AbortAcknowledged);
    driver.abort(seq);
    *status = status.transition(RunEvent::CleanupComplete);
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tactus_core::Instruction;

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
    fn test_run_program_waveform_and_stop() {
        // [(reps=3, half_period=10), stop]: 3 full 10-cycle half-period
        // cycles, 60 active cycles, no wait results.
        let mut sim = Simulator::new();
        let report = sim
            .run(
                &program(&[run(10, 3)]),
                &TriggerSchedule::never(),
                RunOptions::default(),
            )
            .unwrap();

        assert_eq!(report.active_cycles, 60);
        assert!(report.waits.is_empty());
        assert!(!report.aborted);
        assert_eq!(sim.status(), RunStatus::Stopped);

        for (i, &high) in report.trace[..60].iter().enumerate() {
            assert_eq!(high, (i / 10) % 2 == 0, "wrong level at cycle {}", i);
        }
    }

    #[test]
    fn test_wait_triggered_mid_timeout() {
        // [(reps=2, half_period=5), (wait 100), stop] with the trigger
        // rising at local wait cycle 30: one wait result of 70.
        let mut sim = Simulator::new();
        let report = sim
            .run(
                &program(&[run(5, 2), Instruction::Wait { timeout: 100 }]),
                // The wait starts at global cycle 20.
                &TriggerSchedule::pulse(50, 5),
                RunOptions::default(),
            )
            .unwrap();

        assert_eq!(report.waits, vec![70]);
        assert_eq!(report.active_cycles, 50);
        assert_eq!(sim.status(), RunStatus::Stopped);
    }

    #[test]
    fn test_wait_timeout_reports_zero() {
        let mut sim = Simulator::new();
        let report = sim
            .run(
                &program(&[Instruction::Wait { timeout: 10 }]),
                &TriggerSchedule::never(),
                RunOptions::default(),
            )
            .unwrap();

        assert_eq!(report.waits, vec![0]);
        assert_eq!(report.active_cycles, 10);
    }

    #[test]
    fn test_consecutive_waits_under_held_trigger() {
        // The trigger stays high across both waits: the first resolves
        // mid-timeout, the second immediately with its full timeout.
        let mut sim = Simulator::new();
        let report = sim
            .run(
                &program(&[
                    Instruction::Wait { timeout: 20 },
                    Instruction::Wait { timeout: 30 },
                ]),
                &TriggerSchedule::high_from(5),
                RunOptions::default(),
            )
            .unwrap();

        assert_eq!(report.waits, vec![15, 30]);
    }

    #[test]
    fn test_hw_trigger_gates_first_pulse() {
        let mut sim = Simulator::new();
        let report = sim
            .run(
                &program(&[run(5, 1)]),
                &TriggerSchedule::pulse(7, 1),
                RunOptions {
                    hw_trigger: Some(1000),
                    ..Default::default()
                },
            )
            .unwrap();

        // The output stays low until the trigger arrives...
        assert!(report.trace[..7].iter().all(|&high| !high));
        // ...then the program runs normally.
        assert!(report.trace[7..12].iter().all(|&high| high));
        assert!(report.trace[12..17].iter().all(|&high| !high));
        // The injected wait reports its unused timeout first.
        assert_eq!(report.waits, vec![993]);
    }

    #[test]
    fn test_abort_tears_the_run_down() {
        let mut sim = Simulator::new();
        let report = sim
            .run(
                &program(&[run(50, 100)]),
                &TriggerSchedule::never(),
                RunOptions {
                    abort_at: Some(25),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(report.aborted);
        assert_eq!(report.total_cycles, 25);
        assert_eq!(sim.status(), RunStatus::Aborted);
        assert_eq!(sim.status().code(), 5);

        // A fresh run works after an abort.
        let report = sim
            .run(
                &program(&[run(2, 1)]),
                &TriggerSchedule::never(),
                RunOptions::default(),
            )
            .unwrap();
        assert_eq!(report.active_cycles, 4);
        assert_eq!(sim.status(), RunStatus::Stopped);
    }

    #[test]
    fn test_starvation_watchdog_trips() {
        // Truncated stream: reps word without its half-period, and no
        // stop sentinel. The core starves; the watchdog reports it.
        let mut sim = Simulator::new();
        let err = sim
            .run_raw(&[3], &TriggerSchedule::never(), RunOptions::default())
            .unwrap_err();

        assert!(matches!(err, SimError::Starved { .. }));
        assert_eq!(sim.status(), RunStatus::Aborted);
    }

    #[test]
    fn test_cycle_budget_exhaustion() {
        // An untriggered long wait cannot finish in 100 cycles.
        let mut sim = Simulator::new();
        let err = sim
            .run(
                &program(&[Instruction::Wait { timeout: 100_000 }]),
                &TriggerSchedule::never(),
                RunOptions {
                    max_cycles: 100,
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert_eq!(err, SimError::CycleBudgetExhausted);
        assert_eq!(sim.status(), RunStatus::Aborted);
    }

    #[test]
    fn test_unsealed_program_rejected() {
        let mut sim = Simulator::new();
        let mut unsealed = Program::new();
        unsealed.push(run(10, 1)).unwrap();

        let err = sim
            .run(&unsealed, &TriggerSchedule::never(), RunOptions::default())
            .unwrap_err();
        assert_eq!(err, SimError::UnsealedProgram);
    }

    #[test]
    fn test_empty_program_stops_immediately() {
        // A bare stop sentinel completes without driving the output.
        let mut sim = Simulator::new();
        let mut program = Program::new();
        program.seal().unwrap();

        let report = sim
            .run(&program, &TriggerSchedule::never(), RunOptions::default())
            .unwrap();

        assert_eq!(report.active_cycles, 0);
        assert!(report.trace.iter().all(|&high| !high));
        assert_eq!(sim.status(), RunStatus::Stopped);
    }

    mod properties {
        use super::*;
        use proptest::collection::vec;
        use proptest::prelude::*;

        proptest! {
            /// A program of run instructions takes exactly the cycle
            /// count the timing arithmetic predicts, wherever the
            /// instruction boundaries fall.
            #[test]
            fn active_cycles_match_timing_arithmetic(
                runs in vec((1u32..20, 1u32..4), 1..6)
            ) {
                let mut program = Program::new();
                let mut expected: u64 = 0;
                for &(half_period, reps) in &runs {
                    program.push(run(half_period, reps)).unwrap();
                    expected += tactus_core::timing::run_duration_cycles(half_period, reps);
                }
                program.seal().unwrap();

                let mut sim = Simulator::new();
                let report = sim
                    .run(&program, &TriggerSchedule::never(), RunOptions::default())
                    .unwrap();
                prop_assert_eq!(report.active_cycles, expected);
                prop_assert!(report.waits.is_empty());
                prop_assert_eq!(sim.status(), RunStatus::Stopped);
            }
        }
    }

    #[test]
    fn test_back_to_back_runs_need_fresh_release() {
        // Two runs on the same simulator; each gets its own release and
        // both complete. (The release is issued per run by the harness.)
        let mut sim = Simulator::new();
        for _ in 0..2 {
            let report = sim
                .run(
                    &program(&[run(4, 2)]),
                    &TriggerSchedule::never(),
                    RunOptions::default(),
                )
                .unwrap();
            assert_eq!(report.active_cycles, 16);
            assert_eq!(sim.status(), RunStatus::Stopped);
        }
    }
}
