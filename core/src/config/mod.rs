//! Timing configuration for the orchestration loop.

pub mod region;

pub use region::Region;

/// CPU master-clock divisor: one CPU cycle elapses per this many PPU ticks.
pub const PPU_TICKS_PER_CPU_TICK: u32 = 3;

/// Master cycles per NTSC frame (≈29,780.5, rounded for pacing purposes).
pub const MASTER_CYCLES_PER_FRAME: u32 = 29_780;

/// Nominal NTSC refresh rate in Hz.
pub const NTSC_REFRESH_HZ: f64 = 60.0988;

/// Open-bus bit decay period in CPU cycles (~3.22 million, ≈600 ms).
pub const OPEN_BUS_DECAY_CYCLES: u64 = 3_220_000;

/// CPU-bus open-bus bit decay period, in CPU cycles (~1 second at 1.79 MHz).
/// Shorter than the PPU's decay constant since the CPU bus is driven far
/// more often and its capacitance drains faster in practice.
pub const CPU_OPEN_BUS_DECAY_CYCLES: u64 = 1_789_000;
