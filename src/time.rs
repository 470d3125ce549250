//! Wrapping microsecond timebase.

/// Microseconds from a free-running clock that wraps at its maximum.
pub type MonotonicMicros = u32;

/// Source of [`MonotonicMicros`] timestamps.
pub trait Clock {
    /// Current time; wraps back to zero after `u32::MAX`.
    fn now_micros(&self) -> MonotonicMicros;
}

/// Time elapsed from `reference` to `now` on a clock spanning the full `u32` range.
pub const fn elapsed(now: MonotonicMicros, reference: MonotonicMicros) -> u32 {
    elapsed_within(now, reference, MonotonicMicros::MAX)
}

/// Time elapsed from `reference` to `now` on a clock that wraps at `max`.
///
/// A `now` smaller than `reference` means the clock wrapped in between.
/// Both inputs must be `<= max`.
pub const fn elapsed_within(
    now: MonotonicMicros,
    reference: MonotonicMicros,
    max: MonotonicMicros,
) -> u32 {
    if now >= reference {
        now - reference
    } else {
        now + (max - reference)
    }
}
