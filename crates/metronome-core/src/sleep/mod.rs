//! High-resolution sleep primitives.
//!
//! Every sleeper implements [`HighResSleeper`] and guarantees that a
//! successful call returns only after *at least* the requested duration has
//! elapsed. Overshoot is expected; early return is not.
//!
//! | Sleeper | Mechanism | Availability |
//! |---------|-----------|--------------|
//! | [`NanosleepSleeper`] | `nanosleep`, resumed after `EINTR` | POSIX |
//! | [`CounterSleeper`] | busy-polls a [`TimeSource`] counter | everywhere |
//! | [`HybridSleeper`] | native sleep, then a short spin | everywhere |
//! | [`VirtualSleeper`] | advances a [`VirtualClock`](crate::clock::VirtualClock) | tests |
//!
//! The timer loop picks one once, through [`select_sleeper`], rather than
//! branching on the platform for every sleep.

mod counter;
mod hybrid;
#[cfg(unix)]
mod posix;
mod simulated;

use std::sync::Arc;

pub use counter::CounterSleeper;
pub use hybrid::HybridSleeper;
#[cfg(unix)]
pub use posix::NanosleepSleeper;
pub use simulated::VirtualSleeper;

use crate::clock::TimeSource;
use crate::config::{SleepStrategy, TimerConfig};
use crate::error::Result;
use crate::logging::targets;

/// A primitive that suspends the calling thread for a number of nanoseconds.
pub trait HighResSleeper: Send {
    /// Sleep for at least `nanoseconds`.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidDuration`](crate::TimerError::InvalidDuration)
    /// for a negative request, or a platform error if the primitive itself
    /// fails. Transient interruptions are retried internally.
    fn sleep_nanos(&self, nanoseconds: i64) -> Result<()>;

    /// A short, human-readable name for logging.
    fn name(&self) -> &'static str;
}

/// Pick the sleeper described by `config`.
///
/// `clock` is used by the counter sleeper; the other sleepers rely on the
/// operating system's own monotonic clock.
///
/// # Errors
///
/// Returns [`TimerError::Unsupported`](crate::TimerError::Unsupported) if
/// [`SleepStrategy::Native`] is requested on a host without `nanosleep`.
pub fn select_sleeper(
    config: &TimerConfig,
    clock: Arc<dyn TimeSource>,
) -> Result<Box<dyn HighResSleeper>> {
    let sleeper: Box<dyn HighResSleeper> = match config.sleep_strategy {
        SleepStrategy::Auto => native_or_counter(clock),
        SleepStrategy::Native => native()?,
        SleepStrategy::Counter => Box::new(CounterSleeper::new(clock)),
        SleepStrategy::Hybrid => Box::new(HybridSleeper::with_config(config)),
    };
    tracing::info!(
        target: targets::SLEEP,
        sleeper = sleeper.name(),
        strategy = ?config.sleep_strategy,
        "selected high-resolution sleeper"
    );
    Ok(sleeper)
}

#[cfg(unix)]
fn native_or_counter(_clock: Arc<dyn TimeSource>) -> Box<dyn HighResSleeper> {
    Box::new(NanosleepSleeper::new())
}

#[cfg(not(unix))]
fn native_or_counter(clock: Arc<dyn TimeSource>) -> Box<dyn HighResSleeper> {
    Box::new(CounterSleeper::new(clock))
}

#[cfg(unix)]
fn native() -> Result<Box<dyn HighResSleeper>> {
    Ok(Box::new(NanosleepSleeper::new()))
}

#[cfg(not(unix))]
fn native() -> Result<Box<dyn HighResSleeper>> {
    Err(crate::TimerError::Unsupported("nanosleep"))
}
