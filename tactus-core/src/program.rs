//! Bounded word storage for an encoded pseudoclock program.
//!
//! The controlling process assembles a program one instruction at a time;
//! the result is the flat word stream that the feed driver pushes into
//! the instruction queue. `seal()` appends the stop sentinel, after which
//! the program is immutable.

use heapless::Vec;

use crate::instruction::{Instruction, InstructionError};

/// Maximum encoded program length in words (two words per instruction,
/// including the final stop sentinel)
pub const MAX_PROGRAM_WORDS: usize = 1024;

/// Errors that can occur while building a program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProgramError {
    /// Instruction carries a reserved sentinel field value
    Invalid(InstructionError),
    /// Program storage is full
    Full,
    /// Program is already sealed with a stop sentinel
    Sealed,
}

impl From<InstructionError> for ProgramError {
    fn from(err: InstructionError) -> Self {
        ProgramError::Invalid(err)
    }
}

/// An encoded pseudoclock program
#[derive(Debug, Clone, Default)]
pub struct Program {
    words: Vec<u32, MAX_PROGRAM_WORDS>,
    wait_count: usize,
    sealed: bool,
}

impl Program {
    /// Create an empty program
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            wait_count: 0,
            sealed: false,
        }
    }

    /// Append one instruction
    pub fn push(&mut self, inst: Instruction) -> Result<(), ProgramError> {
        if self.sealed {
            return Err(ProgramError::Sealed);
        }
        let words = inst.encode()?;
        if self.words.len() + 2 > MAX_PROGRAM_WORDS {
            return Err(ProgramError::Full);
        }
        // Cannot fail after the length check above
        let _ = self.words.extend_from_slice(&words);
        if inst.produces_result() {
            self.wait_count += 1;
        }
        if inst == Instruction::Stop {
            self.sealed = true;
        }
        Ok(())
    }

    /// Append the stop sentinel, making the program immutable.
    ///
    /// Idempotent: sealing a sealed program is a no-op.
    pub fn seal(&mut self) -> Result<(), ProgramError> {
        if self.sealed {
            return Ok(());
        }
        self.push(Instruction::Stop)
    }

    /// Check if the program ends in a stop sentinel
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The encoded word stream, in queue order
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Number of instructions, including the stop sentinel once sealed
    pub fn instruction_count(&self) -> usize {
        self.words.len() / 2
    }

    /// Number of wait results a complete (untriggered-abort) run of this
    /// program will deposit on the output queue
    pub fn wait_count(&self) -> usize {
        self.wait_count
    }

    /// Check if the program contains no instructions at all
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Decode the instruction at the given index, if present
    pub fn get(&self, index: usize) -> Option<Instruction> {
        let base = index * 2;
        if base + 1 >= self.words.len() {
            return None;
        }
        Some(Instruction::decode([self.words[base], self.words[base + 1]]))
    }
}
