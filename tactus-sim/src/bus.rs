//! Shared bus between the controlling process and the sequencer core.
//!
//! The only state the two execution contexts share: two bounded FIFOs
//! (instruction words in, wait-result words out) and the edge-triggered
//! release signal. Each queue has exactly one producer and one consumer,
//! so the channels are the sole synchronization primitive; no extra
//! locking is layered on top.
//!
//! Queue depth matches the hardware FIFOs being modeled (4 words), so
//! backpressure behaves the way it would on the real co-processor: the
//! feed side suspends on a full instruction queue, the core stalls on a
//! full result queue.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use tactus_core::{SequencerBus, FIFO_DEPTH};

/// The queue pair and release line shared by both execution contexts
pub struct PseudoclockBus {
    /// Instruction words, controlling process -> core
    instructions: Channel<CriticalSectionRawMutex, u32, FIFO_DEPTH>,
    /// Wait-result words, core -> controlling process
    results: Channel<CriticalSectionRawMutex, u32, FIFO_DEPTH>,
    /// Release signal, consumed by the core at idle only
    start: Signal<CriticalSectionRawMutex, ()>,
}

impl PseudoclockBus {
    /// Create an empty bus
    pub const fn new() -> Self {
        Self {
            instructions: Channel::new(),
            results: Channel::new(),
            start: Signal::new(),
        }
    }

    /// Issue the release edge that unblocks the core from idle.
    ///
    /// Fire-and-forget: a release issued while the core is mid-run is
    /// discarded when the core next returns to idle. Callers must not
    /// release again before the previous run has fully stopped.
    pub fn release(&self) {
        self.start.signal(());
    }

    /// Try to push one instruction word without suspending.
    ///
    /// Returns `false` when the queue is full - expected steady-state
    /// backpressure, not an error.
    pub fn try_feed(&self, word: u32) -> bool {
        self.instructions.try_send(word).is_ok()
    }

    /// Push one instruction word, suspending while the queue is full
    pub async fn feed(&self, word: u32) {
        self.instructions.send(word).await;
    }

    /// Take one wait result if available
    pub fn try_take_result(&self) -> Option<u32> {
        self.results.try_receive().ok()
    }

    /// Take one wait result, suspending while the queue is empty
    pub async fn take_result(&self) -> u32 {
        self.results.receive().await
    }

    /// Number of instruction words currently queued
    pub fn queued_instructions(&self) -> usize {
        self.instructions.len()
    }

    /// Empty both queues and drop any latched release.
    ///
    /// Abort-only: this deliberately breaks the SPSC discipline by
    /// pulling from the instruction queue on the driver side, which is
    /// safe exactly because the core has been reset and is not reading.
    pub fn purge(&self) {
        while self.instructions.try_receive().is_ok() {}
        while self.results.try_receive().is_ok() {}
        self.start.reset();
    }
}

impl SequencerBus for PseudoclockBus {
    fn pull_instruction(&self) -> Option<u32> {
        self.instructions.try_receive().ok()
    }

    fn push_wait_result(&self, remaining: u32) -> bool {
        self.results.try_send(remaining).is_ok()
    }

    fn take_release(&self) -> bool {
        self.start.try_take().is_some()
    }

    fn clear_release(&self) {
        self.start.reset();
    }
}

impl Default for PseudoclockBus {
    fn default() -> Self {
        Self::new()
    }
}
