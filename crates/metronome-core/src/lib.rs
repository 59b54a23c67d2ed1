//! Core systems for Metronome.
//!
//! This crate provides the timing foundation used by the `metronome` frame
//! loop:
//!
//! - **Timer**: A single-threaded loop multiplexing any number of periodic
//!   callbacks, each with its own period, fired in registration order
//! - **Clocks**: Monotonic tick sources, plus a virtual clock for tests
//! - **Sleep**: High-resolution sleep primitives that never return early
//! - **Conversions**: Hertz, nanoseconds and counter ticks
//!
//! # Timer Example
//!
//! ```no_run
//! use metronome_core::{Timer, convert::hertz_to_nanoseconds};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut timer = Timer::new()?;
//!     let handle = timer.handle();
//!
//!     // Game logic at 60 Hz.
//!     timer.add_timer(|delta| println!("update after {delta}ns"), hertz_to_nanoseconds(60)?)?;
//!
//!     // Rendering at 30 Hz, stopping after ten seconds' worth of frames.
//!     let mut frames = 0;
//!     timer.add_timer(
//!         move |_| {
//!             frames += 1;
//!             if frames == 300 {
//!                 handle.stop();
//!             }
//!         },
//!         hertz_to_nanoseconds(30)?,
//!     )?;
//!
//!     timer.start_timer_loop()?;
//!     Ok(())
//! }
//! ```
//!
//! # Deterministic Example
//!
//! A [`VirtualClock`](clock::VirtualClock) paired with a
//! [`VirtualSleeper`](sleep::VirtualSleeper) runs the loop without blocking:
//!
//! ```
//! use std::sync::Arc;
//! use metronome_core::{Timer, TimerConfig};
//! use metronome_core::clock::VirtualClock;
//! use metronome_core::sleep::VirtualSleeper;
//!
//! let clock = Arc::new(VirtualClock::new());
//! let sleeper = VirtualSleeper::new(clock.clone());
//! let mut timer = Timer::with_parts(clock, Box::new(sleeper.clone()), TimerConfig::default());
//!
//! let handle = timer.handle();
//! let mut ticks = 0;
//! timer.add_timer(
//!     move |_| {
//!         ticks += 1;
//!         if ticks == 10 {
//!             handle.stop();
//!         }
//!     },
//!     1_000_000,
//! )?;
//!
//! timer.start_timer_loop()?;
//! assert_eq!(sleeper.total_requested(), 9_000_000);
//! # Ok::<(), metronome_core::TimerError>(())
//! ```

pub mod clock;
pub mod config;
pub mod convert;
mod error;
pub mod logging;
mod scheduler;
pub mod sleep;
mod timer;

pub use config::{SleepStrategy, SpinStrategyConfig, TimerConfig};
pub use convert::{NANOSECONDS_IN_SECOND, hertz_to_nanoseconds, nanoseconds_to_hertz};
pub use error::{Result, TimerError};
pub use logging::PerfSpan;
pub use scheduler::{LoopStats, StopHandle, Timer, TimerHandle};
pub use timer::{SkipPolicy, TimerCallback, TimerId, TimerStats};
