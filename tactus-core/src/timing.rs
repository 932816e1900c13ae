//! Timeout and elapsed-time arithmetic.
//!
//! The sequencer counts in core clock cycles; translating those counts
//! into wall time is the controlling process's job. One wait poll
//! iteration spans two base clock ticks in the hardware loop, which is
//! where the factor of two in the wait arithmetic comes from.

/// System clock frequency the core is derived from by default (Hz)
pub const SYS_CLK_HZ: u32 = 100_000_000;

/// Base clock ticks consumed per wait poll iteration
pub const TICKS_PER_WAIT_CYCLE: u32 = 2;

/// Total core cycles occupied by a run instruction.
///
/// Exact by construction: each of `reps` passes holds the output high
/// for `half_period` cycles and low for `half_period` cycles.
pub fn run_duration_cycles(half_period: u32, reps: u32) -> u64 {
    reps as u64 * 2 * half_period as u64
}

/// Base clock ticks elapsed inside a resolved wait.
///
/// `remaining` is the wait-result word (`0` means the full timeout
/// elapsed). Returns `None` if `remaining` exceeds the timeout, which a
/// well-formed run can never produce.
pub fn wait_elapsed_ticks(timeout: u32, remaining: u32) -> Option<u64> {
    if remaining > timeout {
        return None;
    }
    Some((timeout - remaining) as u64 * TICKS_PER_WAIT_CYCLE as u64)
}

/// Wall-clock nanoseconds elapsed inside a resolved wait, for a base
/// clock tick of `tick_period_ns`.
pub fn wait_elapsed_ns(timeout: u32, remaining: u32, tick_period_ns: u64) -> Option<u64> {
    wait_elapsed_ticks(timeout, remaining).map(|ticks| ticks * tick_period_ns)
}

/// Calculate the clock divider for a target core frequency.
///
/// The core runs at SYS_CLK / divider Hz. With 2 base ticks per core
/// cycle, the cycle frequency is:
/// freq = SYS_CLK / (divider * 2)
///
/// Therefore: divider = SYS_CLK / (freq * 2)
///
/// Returns (integer_part, fractional_part) for the 16.8 fixed-point divider.
pub fn calc_clock_divider(freq_hz: u32) -> (u16, u8) {
    if freq_hz == 0 {
        return (0xFFFF, 0xFF); // Maximum divider = stopped
    }

    // To get 8-bit fractional precision, multiply by 256 first
    let divisor = freq_hz as u64 * TICKS_PER_WAIT_CYCLE as u64;
    let divider_x256 = (SYS_CLK_HZ as u64 * 256) / divisor;

    // Split into integer and fractional parts
    let int_part = divider_x256 / 256;
    let frac_part = divider_x256 % 256;

    // Clamp to valid range
    let int_part = int_part.min(0xFFFF) as u16;
    let frac_part = frac_part.min(0xFF) as u8;

    (int_part, frac_part)
}

/// Core clock rate configuration.
///
/// Bundles a target cycle frequency with the divider and wall-time
/// conversions derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockConfig {
    /// Target core cycle frequency in Hz
    pub freq_hz: u32,
}

impl ClockConfig {
    pub const fn new(freq_hz: u32) -> Self {
        Self { freq_hz }
    }

    /// The 16.8 fixed-point divider that produces this cycle rate
    pub fn divider(&self) -> (u16, u8) {
        calc_clock_divider(self.freq_hz)
    }

    /// Base clock tick period in nanoseconds (two ticks per core cycle)
    pub fn tick_period_ns(&self) -> u64 {
        if self.freq_hz == 0 {
            return 0;
        }
        1_000_000_000 / (self.freq_hz as u64 * TICKS_PER_WAIT_CYCLE as u64)
    }

    /// Wall-clock nanoseconds spent inside a resolved wait
    pub fn wait_elapsed_ns(&self, timeout: u32, remaining: u32) -> Option<u64> {
        wait_elapsed_ns(timeout, remaining, self.tick_period_ns())
    }
}

impl Default for ClockConfig {
    /// Fastest cycle rate the system clock supports (divider 1)
    fn default() -> Self {
        Self::new(SYS_CLK_HZ / TICKS_PER_WAIT_CYCLE)
    }
}
