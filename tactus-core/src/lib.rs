//! Board-agnostic core logic for the Tactus pseudoclock
//!
//! This crate models the dedicated timing co-processor without depending
//! on any specific hardware:
//!
//! - Instruction encoding (run / wait / stop word pairs)
//! - The cycle-accurate sequencer state machine
//! - Bounded program word storage
//! - Run-status state machine
//! - Timeout and elapsed-time arithmetic
//! - The bus port trait between the sequencer and its queues

#![no_std]
#![deny(unsafe_code)]

pub mod instruction;
pub mod program;
pub mod sequencer;
pub mod status;
pub mod timing;
pub mod traits;

pub use instruction::{Instruction, InstructionError};
pub use program::{Program, ProgramError, MAX_PROGRAM_WORDS};
pub use sequencer::{Sequencer, Tick};
pub use status::{RunEvent, RunStatus};
pub use timing::ClockConfig;
pub use traits::SequencerBus;

/// Depth of the instruction and wait-result hardware FIFOs, in words.
pub const FIFO_DEPTH: usize = 4;
