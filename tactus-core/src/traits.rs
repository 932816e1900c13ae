//! Bus port between the sequencer and the controlling process.
//!
//! The only shared state between the two execution contexts is the pair
//! of bounded FIFOs and the release signal. All methods take `&self`
//! because the implementation is shared hardware (or a shared channel
//! object) with interior synchronization; single-producer/single-consumer
//! discipline per direction is the implementor's contract.

/// Sequencer-side view of the shared queues and the release line.
pub trait SequencerBus {
    /// Pull the next instruction word from the input queue, or `None` if
    /// the queue is empty (the sequencer stalls on the cycle).
    fn pull_instruction(&self) -> Option<u32>;

    /// Push a wait-result word onto the output queue. Returns `false` if
    /// the queue is full; the sequencer retries the push each cycle until
    /// it succeeds, so no result is ever dropped.
    fn push_wait_result(&self, remaining: u32) -> bool;

    /// Consume a pending release edge. Returns `true` at most once per
    /// release issued by the controlling process.
    fn take_release(&self) -> bool;

    /// Discard any latched release edge. Called on entry to idle so a
    /// release fired mid-run is lost rather than carried over.
    fn clear_release(&self);
}
