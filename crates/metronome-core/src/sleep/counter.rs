//! Counter-polling sleeper.

use std::sync::Arc;

use super::HighResSleeper;
use crate::clock::TimeSource;
use crate::convert::{nanoseconds_to_ticks, ticks_to_nanoseconds};
use crate::error::{Result, TimerError};

/// Spins on a high-resolution counter until enough ticks have elapsed.
///
/// This is the fallback for hosts without an interruptible native sleep
/// (on Windows the counter is `QueryPerformanceCounter`). It occupies a core
/// for the whole wait.
pub struct CounterSleeper {
    clock: Arc<dyn TimeSource>,
    frequency: i64,
}

impl CounterSleeper {
    /// Create a sleeper polling `clock`. The clock frequency is read once, here.
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        let frequency = clock.frequency();
        Self { clock, frequency }
    }

    /// Number of counter ticks to wait for a request of `nanoseconds`.
    ///
    /// Rounds up by one tick when truncation would cut the wait short.
    fn ticks_for(&self, nanoseconds: i64) -> i64 {
        let ticks = nanoseconds_to_ticks(nanoseconds, self.frequency);
        if ticks_to_nanoseconds(ticks, self.frequency) < nanoseconds {
            ticks + 1
        } else {
            ticks
        }
    }
}

impl HighResSleeper for CounterSleeper {
    fn sleep_nanos(&self, nanoseconds: i64) -> Result<()> {
        if nanoseconds < 0 {
            return Err(TimerError::invalid_duration(nanoseconds));
        }

        let ticks = self.ticks_for(nanoseconds);
        let start = self.clock.ticks();
        while self.clock.ticks() - start < ticks {
            std::hint::spin_loop();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "counter"
    }
}
