//! Sleeper that advances virtual time instead of blocking.

use std::sync::Arc;

use parking_lot::Mutex;

use super::HighResSleeper;
use crate::clock::{TimeSource, VirtualClock};
use crate::convert::{nanoseconds_to_ticks, ticks_to_nanoseconds};
use crate::error::{Result, TimerError};

/// Advances a [`VirtualClock`] by each requested duration and returns at once.
///
/// Clones share the clock and the request log, so a test can hand one clone
/// to a timer and inspect another afterwards.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use metronome_core::clock::{TimeSource, VirtualClock};
/// use metronome_core::sleep::{HighResSleeper, VirtualSleeper};
///
/// let clock = Arc::new(VirtualClock::new());
/// let sleeper = VirtualSleeper::new(clock.clone());
/// sleeper.sleep_nanos(16_666_666)?;
/// assert_eq!(clock.nanoseconds(), 16_666_666);
/// assert_eq!(sleeper.requests(), vec![16_666_666]);
/// # Ok::<(), metronome_core::TimerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct VirtualSleeper {
    clock: Arc<VirtualClock>,
    requests: Arc<Mutex<Vec<i64>>>,
}

impl VirtualSleeper {
    /// Create a sleeper driving `clock`.
    pub fn new(clock: Arc<VirtualClock>) -> Self {
        Self {
            clock,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every duration requested so far, in order.
    pub fn requests(&self) -> Vec<i64> {
        self.requests.lock().clone()
    }

    /// Total nanoseconds requested so far.
    pub fn total_requested(&self) -> i64 {
        self.requests.lock().iter().sum()
    }
}

impl HighResSleeper for VirtualSleeper {
    fn sleep_nanos(&self, nanoseconds: i64) -> Result<()> {
        if nanoseconds < 0 {
            return Err(TimerError::invalid_duration(nanoseconds));
        }

        let frequency = self.clock.frequency();
        let mut ticks = nanoseconds_to_ticks(nanoseconds, frequency);
        if ticks_to_nanoseconds(ticks, frequency) < nanoseconds {
            ticks += 1;
        }
        self.clock.advance(ticks);
        self.requests.lock().push(nanoseconds);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "virtual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advances_shared_clock() {
        let clock = Arc::new(VirtualClock::new());
        let sleeper = VirtualSleeper::new(clock.clone());
        let observer = sleeper.clone();

        sleeper.sleep_nanos(1_000).unwrap();
        sleeper.sleep_nanos(0).unwrap();
        sleeper.sleep_nanos(2_500).unwrap();

        assert_eq!(clock.nanoseconds(), 3_500);
        assert_eq!(observer.requests(), vec![1_000, 0, 2_500]);
        assert_eq!(observer.total_requested(), 3_500);
    }

    #[test]
    fn test_coarse_clock_never_undershoots() {
        // 1 kHz: one tick is a millisecond.
        let clock = Arc::new(VirtualClock::with_frequency(1_000));
        let sleeper = VirtualSleeper::new(clock.clone());
        sleeper.sleep_nanos(1_500_000).unwrap();
        assert_eq!(clock.ticks(), 2);
        assert!(clock.nanoseconds() >= 1_500_000);
    }

    #[test]
    fn test_negative_request_rejected() {
        let sleeper = VirtualSleeper::new(Arc::new(VirtualClock::new()));
        assert!(sleeper.sleep_nanos(-10).unwrap_err().is_fatal());
        assert!(sleeper.requests().is_empty());
    }
}
