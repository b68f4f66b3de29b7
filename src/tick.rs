//! # Tick Source
//!
//! Monotonic millisecond counter abstraction used for send pacing and deadline
//! accounting.
//!
//! The counter is a fixed-width value that wraps back to zero when it reaches
//! a configured maximum, so every elapsed-time computation on it goes through
//! [`elapsed`], which stays correct across a single wrap. Waits that may span
//! several wraps, like the link deadline, use [`TickSource::uptime_ms`].

use embassy_time::Instant;

/// Width of the hardware system tick register in bits
const SYSTICK_NB_BITS: u32 = 24;

/// Largest value of the down-counting system tick register
const SYSTICK_MAX_VAL: u32 = (1 << SYSTICK_NB_BITS) - 1;

/// System tick frequency: 64 MHz
const TICKS_IN_SECOND: u32 = 64_000_000;

const TICKS_IN_MS: u32 = TICKS_IN_SECOND / 1000;

/// Source of wrapping millisecond ticks
pub trait TickSource {
    /// Current tick value, always in `0..wrap_max_ms()`
    fn now_ms(&self) -> u32;

    /// Value at which the counter wraps back to zero
    fn wrap_max_ms(&self) -> u32;

    /// Milliseconds since boot, never wrapping
    fn uptime_ms(&self) -> u64;
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }

    fn wrap_max_ms(&self) -> u32 {
        (**self).wrap_max_ms()
    }

    fn uptime_ms(&self) -> u64 {
        (**self).uptime_ms()
    }
}

/// Milliseconds elapsed between two readings of a wrapping counter
///
/// When `new < old` the counter wrapped once in between, and the elapsed time
/// is the distance to the wrap point plus the new reading.
///
/// # Example
/// ```rust
/// use nus_link::tick::elapsed;
///
/// assert_eq!(elapsed(240, 10, 250), 20);
/// assert_eq!(elapsed(10, 40, 250), 30);
/// ```
pub const fn elapsed(old: u32, new: u32, wrap_max: u32) -> u32 {
    if new >= old {
        new - old
    } else {
        wrap_max.saturating_sub(old).saturating_add(new)
    }
}

/// Spins on the tick source until `duration_ms` milliseconds have passed
///
/// This is the pacing wait of the chunked drain: the channel offers no
/// transmit-complete signal, so the only option is to let time pass. The
/// elapsed time is accumulated reading by reading, which keeps the wait
/// correct across any number of counter wraps as long as two consecutive
/// readings are less than one wrap apart.
pub fn busy_wait<T: TickSource>(ticks: &T, duration_ms: u32) {
    let wrap_max = ticks.wrap_max_ms();
    let mut current = ticks.now_ms();
    let mut waited_ms: u32 = 0;
    while waited_ms < duration_ms {
        let old = current;
        current = ticks.now_ms();
        waited_ms = waited_ms.saturating_add(elapsed(old, current, wrap_max));
        core::hint::spin_loop();
    }
}

/// Converts a raw reading of the 24-bit down-counting system tick into
/// milliseconds since the counter was last reloaded
pub const fn systick_ms_from_raw(raw: u32) -> u32 {
    let counted = SYSTICK_MAX_VAL.saturating_sub(raw & SYSTICK_MAX_VAL);
    counted / TICKS_IN_MS
}

/// [`TickSource`] backed by the embassy time driver
#[derive(Debug, Clone, Copy)]
pub struct EmbassyTicks {
    wrap_max_ms: u32,
}

impl EmbassyTicks {
    /// Creates a tick source wrapping at `wrap_max_ms` (clamped to at least 1)
    pub const fn new(wrap_max_ms: u32) -> Self {
        let wrap_max_ms = if wrap_max_ms == 0 { 1 } else { wrap_max_ms };
        Self { wrap_max_ms }
    }
}

impl Default for EmbassyTicks {
    fn default() -> Self {
        Self::new(crate::DEFAULT_WRAP_MAX_MS)
    }
}

impl TickSource for EmbassyTicks {
    fn now_ms(&self) -> u32 {
        (Instant::now().as_millis() % self.wrap_max_ms as u64) as u32
    }

    fn wrap_max_ms(&self) -> u32 {
        self.wrap_max_ms
    }

    fn uptime_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::test_support::ManualTicks;

    #[test]
    fn elapsed_without_wrap_is_plain_difference() {
        assert_eq!(elapsed(100, 130, 250), 30);
        assert_eq!(elapsed(7, 7, 250), 0);
    }

    #[test]
    fn elapsed_across_wrap_counts_distance_to_wrap_point() {
        // (250 - 240) + 10
        assert_eq!(elapsed(240, 10, 250), 20);
        assert_eq!(elapsed(249, 0, 250), 1);
    }

    #[test]
    fn elapsed_never_underflows_on_out_of_range_reading() {
        assert_eq!(elapsed(300, 5, 250), 5);
    }

    #[test]
    fn busy_wait_returns_after_requested_duration() {
        let ticks = ManualTicks::new(0, 250, 1);
        busy_wait(&ticks, 25);
        assert!(ticks.peek() >= 25, "waited only until {}", ticks.peek());
        assert!(ticks.peek() <= 27);
    }

    #[test]
    fn busy_wait_survives_counter_wrap() {
        let ticks = ManualTicks::new(240, 250, 3);
        busy_wait(&ticks, 25);
        // Started at 240, wrapped once, at least 25 ms accumulated
        let end = ticks.peek();
        assert!(end < 240);
        assert!(elapsed(240, end, 250) >= 25);
    }

    #[test]
    fn busy_wait_zero_duration_does_not_spin() {
        let ticks = ManualTicks::new(10, 250, 1);
        busy_wait(&ticks, 0);
        // Only the initial reading was taken
        assert_eq!(ticks.peek(), 11);
    }

    #[test]
    fn systick_conversion_counts_down_from_reload_value() {
        assert_eq!(systick_ms_from_raw(SYSTICK_MAX_VAL), 0);
        assert_eq!(systick_ms_from_raw(SYSTICK_MAX_VAL - 64_000), 1);
        assert_eq!(systick_ms_from_raw(0), SYSTICK_MAX_VAL / 64_000);
    }

    #[test]
    fn embassy_ticks_stay_below_wrap_max() {
        let ticks = EmbassyTicks::new(250);
        for _ in 0..100 {
            assert!(ticks.now_ms() < 250);
        }
        assert_eq!(EmbassyTicks::new(0).wrap_max_ms(), 1);
    }

    #[test]
    fn embassy_uptime_is_monotonic() {
        let ticks = EmbassyTicks::default();
        let first = ticks.uptime_ms();
        assert!(ticks.uptime_ms() >= first);
    }
}
