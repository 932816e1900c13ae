//! Run-status state machine
//!
//! Tracks a pseudoclock run through its lifecycle as seen by the
//! controlling process. The sequencer core itself has no error states;
//! abort is purely a driver-side affair, which is why the abort leg
//! lives here and not in the sequencer.

/// Lifecycle states of a pseudoclock run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunStatus {
    /// No run in progress; a new program may be loaded and started
    Stopped,
    /// Release issued, queues being primed, core not yet past idle
    TransitionToRunning,
    /// Core executing the instruction stream
    Running,
    /// Abort requested by the caller, not yet acted on by the driver
    AbortRequested,
    /// Driver draining queues and resetting the core
    Aborting,
    /// Run ended by abort; wait results are incomplete
    Aborted,
    /// Core reached the stop sentinel, driver draining final results
    TransitionToStop,
}

/// Events that advance the run status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunEvent {
    /// Caller started a run (release issued)
    StartRequested,
    /// Core observed past idle for the first time
    Launched,
    /// Caller requested an abort
    AbortIssued,
    /// Driver began tearing the run down
    AbortAcknowledged,
    /// Core consumed the stop sentinel and returned to idle
    SequenceComplete,
    /// Driver finished draining and releasing resources
    CleanupComplete,
}

impl RunStatus {
    /// Check if a new run may be started from this state
    pub fn can_start(&self) -> bool {
        matches!(self, RunStatus::Stopped | RunStatus::Aborted)
    }

    /// Check if a run is in progress in any form
    pub fn is_busy(&self) -> bool {
        !self.can_start()
    }

    /// Check if an abort may be requested from this state
    pub fn can_abort(&self) -> bool {
        matches!(self, RunStatus::TransitionToRunning | RunStatus::Running)
    }

    /// Numeric status code reported to callers
    pub fn code(&self) -> u8 {
        match self {
            RunStatus::Stopped => 0,
            RunStatus::TransitionToRunning => 1,
            RunStatus::Running => 2,
            RunStatus::AbortRequested => 3,
            RunStatus::Aborting => 4,
            RunStatus::Aborted => 5,
            RunStatus::TransitionToStop => 6,
        }
    }

    /// Process an event and return the next status
    pub fn transition(self, event: RunEvent) -> Self {
        use RunEvent::*;
        use RunStatus::*;

        match (self, event) {
            (Stopped, StartRequested) => TransitionToRunning,
            (Aborted, StartRequested) => TransitionToRunning,

            (TransitionToRunning, Launched) => Running,
            (TransitionToRunning, AbortIssued) => AbortRequested,
            // A program whose first instruction is the stop sentinel
            // completes without ever leaving idle
            (TransitionToRunning, SequenceComplete) => TransitionToStop,

            (Running, AbortIssued) => AbortRequested,
            (Running, SequenceComplete) => TransitionToStop,

            (AbortRequested, AbortAcknowledged) => Aborting,
            (Aborting, CleanupComplete) => Aborted,

            (TransitionToStop, CleanupComplete) => Stopped,

            // Default: stay in current state
            _ => self,
        }
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        RunStatus::Stopped
    }
}
