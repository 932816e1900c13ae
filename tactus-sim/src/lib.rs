//! Host-side half of the Tactus pseudoclock.
//!
//! The sequencer core in `tactus-core` models the independently clocked
//! execution unit; this crate provides everything that lives on the
//! controlling-process side of the two bounded queues:
//!
//! - [`bus::PseudoclockBus`] - the shared queue pair plus the
//!   edge-triggered release signal, built from `embassy-sync` primitives
//! - [`driver::ClockDriver`] - the queue feed/drain driver
//! - [`simulator::Simulator`] - a deterministic co-simulation harness
//!   that pumps driver and core cycle by cycle
//!
//! On real hardware the bus would be the co-processor's FIFO registers;
//! here it is an in-process channel object, which keeps the protocol
//! identical while making every cycle observable in tests.

pub mod bus;
pub mod driver;
pub mod simulator;

pub use bus::PseudoclockBus;
pub use driver::ClockDriver;
pub use simulator::{RunOptions, RunReport, SimError, Simulator, TriggerSchedule};
