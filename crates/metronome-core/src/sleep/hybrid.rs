//! Native-sleep-then-spin sleeper.
//!
//! Combines native sleep for the bulk of the wait period with spin-waiting
//! for the final portion, achieving consistent sub-millisecond timing without
//! spinning for the whole wait.

use spin_sleep::{SpinSleeper, SpinStrategy};

use super::HighResSleeper;
use crate::config::{DEFAULT_SPIN_THRESHOLD_NS, TimerConfig};
use crate::error::{Result, TimerError};

/// Wrapper around `spin_sleep` implementing [`HighResSleeper`].
///
/// # Example
///
/// ```
/// use metronome_core::sleep::{HighResSleeper, HybridSleeper};
///
/// let sleeper = HybridSleeper::new();
/// sleeper.sleep_nanos(500_000)?; // Sleep for 500 microseconds
/// # Ok::<(), metronome_core::TimerError>(())
/// ```
pub struct HybridSleeper {
    sleeper: SpinSleeper,
    threshold_ns: u32,
}

impl HybridSleeper {
    /// Create a hybrid sleeper that spins for the last
    /// [`DEFAULT_SPIN_THRESHOLD_NS`] of each wait, yielding between checks.
    pub fn new() -> Self {
        Self::with_parts(DEFAULT_SPIN_THRESHOLD_NS, SpinStrategy::YieldThread)
    }

    /// Create a hybrid sleeper using the spin settings from `config`.
    pub fn with_config(config: &TimerConfig) -> Self {
        Self::with_parts(config.spin_threshold_ns, config.spin_strategy.into())
    }

    fn with_parts(threshold_ns: u32, strategy: SpinStrategy) -> Self {
        Self {
            sleeper: SpinSleeper::new(threshold_ns).with_spin_strategy(strategy),
            threshold_ns,
        }
    }

    /// How much of each wait is spent spinning instead of in native sleep.
    pub fn spin_threshold_ns(&self) -> u32 {
        self.threshold_ns
    }
}

impl Default for HybridSleeper {
    fn default() -> Self {
        Self::new()
    }
}

impl HighResSleeper for HybridSleeper {
    fn sleep_nanos(&self, nanoseconds: i64) -> Result<()> {
        if nanoseconds < 0 {
            return Err(TimerError::invalid_duration(nanoseconds));
        }
        self.sleeper.sleep_ns(nanoseconds as u64);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}
