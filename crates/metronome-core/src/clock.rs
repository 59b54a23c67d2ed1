//! Monotonic time sources.
//!
//! The timer loop reads time as raw counter ticks plus a tick frequency,
//! converting to nanoseconds with [`ticks_to_nanoseconds`]. The frequency is
//! queried once when a loop starts; a source must report a stable value.
//!
//! - [`MonotonicClock`]: `std::time::Instant`, reported at 1 GHz.
//! - `PerformanceCounter` (Windows only): `QueryPerformanceCounter`.
//! - [`VirtualClock`]: time that only moves when told to, for deterministic tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use crate::convert::{NANOSECONDS_IN_SECOND, ticks_to_nanoseconds};
#[cfg(target_os = "windows")]
use crate::logging::targets;

/// A monotonic counter with a fixed tick frequency.
pub trait TimeSource: Send + Sync {
    /// Counter frequency, in ticks per second.
    fn frequency(&self) -> i64;

    /// Current counter value.
    fn ticks(&self) -> i64;

    /// Current counter value converted to nanoseconds.
    fn nanoseconds(&self) -> i64 {
        ticks_to_nanoseconds(self.ticks(), self.frequency())
    }
}

/// Wall clock time source backed by [`Instant`].
///
/// Ticks are nanoseconds since the clock was created.
#[derive(Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Creates a new monotonic clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn frequency(&self) -> i64 {
        NANOSECONDS_IN_SECOND
    }

    fn ticks(&self) -> i64 {
        self.epoch.elapsed().as_nanos() as i64
    }
}

/// The Win32 high-resolution performance counter.
#[cfg(target_os = "windows")]
#[derive(Debug)]
pub struct PerformanceCounter {
    frequency: i64,
}

#[cfg(target_os = "windows")]
impl PerformanceCounter {
    /// Query the counter frequency.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TimerError::Unsupported`] if the host has no
    /// performance counter.
    pub fn new() -> crate::Result<Self> {
        use windows::Win32::System::Performance::QueryPerformanceFrequency;

        let mut frequency = 0i64;
        // SAFETY: `frequency` is a valid, writable i64 for the duration of the call.
        unsafe { QueryPerformanceFrequency(&mut frequency) }
            .map_err(|_| crate::TimerError::Unsupported("QueryPerformanceFrequency"))?;
        if frequency <= 0 {
            return Err(crate::TimerError::Unsupported("QueryPerformanceFrequency"));
        }
        tracing::debug!(target: targets::CLOCK, frequency, "performance counter ready");
        Ok(Self { frequency })
    }
}

#[cfg(target_os = "windows")]
impl TimeSource for PerformanceCounter {
    fn frequency(&self) -> i64 {
        self.frequency
    }

    fn ticks(&self) -> i64 {
        use windows::Win32::System::Performance::QueryPerformanceCounter;

        let mut counter = 0i64;
        // SAFETY: `counter` is a valid, writable i64. The call cannot fail on
        // any host where QueryPerformanceFrequency succeeded.
        let _ = unsafe { QueryPerformanceCounter(&mut counter) };
        counter
    }
}

/// Returns the preferred clock for this host.
///
/// Windows uses the performance counter when available; everything else uses
/// [`MonotonicClock`].
pub fn platform_clock() -> Arc<dyn TimeSource> {
    #[cfg(target_os = "windows")]
    {
        match PerformanceCounter::new() {
            Ok(counter) => return Arc::new(counter),
            Err(err) => {
                tracing::warn!(target: targets::CLOCK, %err, "falling back to Instant");
            }
        }
    }
    Arc::new(MonotonicClock::new())
}

/// Virtual time source for deterministic testing.
///
/// Time only advances when explicitly told to do so.
///
/// # Example
///
/// ```
/// use metronome_core::clock::{TimeSource, VirtualClock};
///
/// let clock = VirtualClock::new();
/// assert_eq!(clock.nanoseconds(), 0);
///
/// clock.advance(1_000_000_000); // 1 second
/// assert_eq!(clock.nanoseconds(), 1_000_000_000);
/// ```
#[derive(Debug)]
pub struct VirtualClock {
    now: AtomicI64,
    frequency: i64,
}

impl VirtualClock {
    /// Creates a new virtual clock at time zero, ticking in nanoseconds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_frequency(NANOSECONDS_IN_SECOND)
    }

    /// Creates a virtual clock at time zero with a custom tick frequency.
    ///
    /// # Panics
    ///
    /// Panics if `frequency` is not positive.
    #[must_use]
    pub fn with_frequency(frequency: i64) -> Self {
        assert!(frequency > 0, "clock frequency must be positive");
        Self {
            now: AtomicI64::new(0),
            frequency,
        }
    }

    /// Advances the clock by the given number of ticks.
    pub fn advance(&self, ticks: i64) {
        self.now.fetch_add(ticks, Ordering::AcqRel);
    }

    /// Sets the counter to an absolute value.
    ///
    /// Moving backwards breaks the monotonic contract; only tests that
    /// exercise that failure should do it.
    pub fn set(&self, ticks: i64) {
        self.now.store(ticks, Ordering::Release);
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for VirtualClock {
    fn frequency(&self) -> i64 {
        self.frequency
    }

    fn ticks(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }
}
