//! Conversions between hertz, counter ticks and nanoseconds.
//!
//! All conversions go through `f64` and truncate toward zero. Using one
//! rounding rule everywhere keeps a period computed here identical to the
//! one a caller computes for the same rate, which matters when periods are
//! compared or summed over long runs.

use crate::error::{Result, TimerError};

/// Number of nanoseconds in one second.
pub const NANOSECONDS_IN_SECOND: i64 = 1_000_000_000;

/// Convert a rate in hertz into a period in nanoseconds.
///
/// 60 Hz yields 16_666_666ns.
///
/// # Errors
///
/// Returns [`TimerError::InvalidFrequency`] if `hertz` is zero or negative.
pub fn hertz_to_nanoseconds(hertz: i64) -> Result<i64> {
    if hertz <= 0 {
        return Err(TimerError::InvalidFrequency(hertz));
    }
    Ok(ticks_to_nanoseconds(1, hertz))
}

/// Convert a period in nanoseconds back into an approximate rate in hertz.
///
/// Returns `f64::INFINITY` for a zero period.
pub fn nanoseconds_to_hertz(period: i64) -> f64 {
    NANOSECONDS_IN_SECOND as f64 / period as f64
}

/// Convert counter ticks into nanoseconds for a counter running at `frequency` ticks per second.
#[inline]
pub fn ticks_to_nanoseconds(ticks: i64, frequency: i64) -> i64 {
    (NANOSECONDS_IN_SECOND as f64 / frequency as f64 * ticks as f64) as i64
}

/// Convert nanoseconds into counter ticks for a counter running at `frequency` ticks per second.
#[inline]
pub fn nanoseconds_to_ticks(nanoseconds: i64, frequency: i64) -> i64 {
    (nanoseconds as f64 / NANOSECONDS_IN_SECOND as f64 * frequency as f64) as i64
}

/// Split nanoseconds into a `(seconds, nanoseconds)` pair, as a `timespec` expects.
///
/// Both halves carry the sign of the input.
#[inline]
pub fn split_nanoseconds(nanoseconds: i64) -> (i64, i64) {
    (
        nanoseconds / NANOSECONDS_IN_SECOND,
        nanoseconds % NANOSECONDS_IN_SECOND,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_refresh_rates() {
        assert_eq!(hertz_to_nanoseconds(60).unwrap(), 16_666_666);
        assert_eq!(hertz_to_nanoseconds(30).unwrap(), 33_333_333);
        assert_eq!(hertz_to_nanoseconds(144).unwrap(), 6_944_444);
        assert_eq!(hertz_to_nanoseconds(1).unwrap(), NANOSECONDS_IN_SECOND);
        assert_eq!(hertz_to_nanoseconds(1_000).unwrap(), 1_000_000);
    }

    #[test]
    fn test_non_positive_frequency_rejected() {
        assert!(matches!(
            hertz_to_nanoseconds(0),
            Err(TimerError::InvalidFrequency(0))
        ));
        assert!(matches!(
            hertz_to_nanoseconds(-60),
            Err(TimerError::InvalidFrequency(-60))
        ));
    }

    #[test]
    fn test_hertz_round_trip() {
        for hertz in 1..=20_000 {
            let period = hertz_to_nanoseconds(hertz).unwrap();
            assert_eq!(period, hertz_to_nanoseconds(hertz).unwrap());
            let back = nanoseconds_to_hertz(period).round() as i64;
            assert_eq!(back, hertz, "{hertz}Hz -> {period}ns -> {back}Hz");
        }
    }

    #[test]
    fn test_tick_conversions() {
        // 10 MHz counter, as commonly reported by QueryPerformanceFrequency.
        assert_eq!(ticks_to_nanoseconds(10_000_000, 10_000_000), NANOSECONDS_IN_SECOND);
        assert_eq!(ticks_to_nanoseconds(1, 10_000_000), 100);
        assert_eq!(nanoseconds_to_ticks(1_000, 10_000_000), 10);
        // Truncation toward zero.
        assert_eq!(nanoseconds_to_ticks(199, 10_000_000), 1);
        // Identity at 1 GHz.
        assert_eq!(ticks_to_nanoseconds(123_456_789, NANOSECONDS_IN_SECOND), 123_456_789);
    }

    #[test]
    fn test_split_nanoseconds() {
        assert_eq!(split_nanoseconds(2_500_000_000), (2, 500_000_000));
        assert_eq!(split_nanoseconds(999_999_999), (0, 999_999_999));
        assert_eq!(split_nanoseconds(0), (0, 0));
        assert_eq!(split_nanoseconds(-5), (0, -5));
    }
}
