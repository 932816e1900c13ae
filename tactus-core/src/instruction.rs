//! Instruction encoding for the sequencer input queue.
//!
//! Wire format (unsigned 32-bit words, two per instruction):
//! - Run:  `[reps, half_period]`
//! - Wait: `[0, timeout]`
//! - Stop: `[0, 0]`
//!
//! `reps == 0` in the first word marks the pair as a wait, and a wait
//! with `timeout == 0` marks the end of the whole program. Because those
//! field values are sentinels, a run with zero reps or a wait with zero
//! timeout cannot be expressed on the wire and is rejected at encode time.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors that can occur when encoding an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InstructionError {
    /// A run instruction must emit at least one full cycle
    ZeroReps,
    /// A run level must be held for at least one core cycle
    ZeroHalfPeriod,
    /// A wait with zero timeout would encode as the stop sentinel
    ZeroTimeout,
}

/// One logical sequencer instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Instruction {
    /// Emit `reps` full high+low cycles, holding each level for
    /// `half_period` core cycles
    Run { half_period: u32, reps: u32 },
    /// Hold the output and poll the trigger pin for up to `timeout`
    /// cycles, reporting the unused remainder on the output queue
    Wait { timeout: u32 },
    /// End of program; the sequencer returns to idle
    Stop,
}

impl Instruction {
    /// Encode this instruction as the word pair consumed by the sequencer
    pub fn encode(self) -> Result<[u32; 2], InstructionError> {
        match self {
            Instruction::Run { half_period, reps } => {
                if reps == 0 {
                    return Err(InstructionError::ZeroReps);
                }
                if half_period == 0 {
                    return Err(InstructionError::ZeroHalfPeriod);
                }
                Ok([reps, half_period])
            }
            Instruction::Wait { timeout } => {
                if timeout == 0 {
                    return Err(InstructionError::ZeroTimeout);
                }
                Ok([0, timeout])
            }
            Instruction::Stop => Ok([0, 0]),
        }
    }

    /// Decode a word pair back into a logical instruction
    pub fn decode(words: [u32; 2]) -> Self {
        match words {
            [0, 0] => Instruction::Stop,
            [0, timeout] => Instruction::Wait { timeout },
            [reps, half_period] => Instruction::Run { half_period, reps },
        }
    }

    /// Check if this instruction resolves to a wait result on the output
    /// queue when executed
    pub fn produces_result(&self) -> bool {
        matches!(self, Instruction::Wait { .. })
    }
}
