//! Metronome: fixed-rate frame loops on a periodic multiplexed timer.
//!
//! This crate builds an application frame loop on top of
//! [`metronome_core`]'s [`Timer`]:
//!
//! - **Application**: Logic and video ticks at independent rates
//! - **Settings**: Rates and timer configuration loaded from TOML
//!
//! The timer itself, its clocks and its sleep primitives are re-exported
//! from [`metronome_core`].
//!
//! # Example
//!
//! ```no_run
//! use metronome::{AppSettings, Application, Control, FrameHandler};
//!
//! struct Spinner {
//!     angle: f64,
//! }
//!
//! impl FrameHandler for Spinner {
//!     fn update(&mut self, delta: i64, _control: &Control<'_>) {
//!         // One revolution per second.
//!         self.angle = (self.angle + delta as f64 / 1e9 * 360.0) % 360.0;
//!     }
//!
//!     fn render(&mut self) {
//!         println!("angle: {:.1}", self.angle);
//!     }
//! }
//!
//! fn main() -> Result<(), metronome::AppError> {
//!     let settings = AppSettings::load("metronome.toml")?;
//!     let mut app = Application::new(settings, Spinner { angle: 0.0 })?;
//!     app.run()
//! }
//! ```

pub mod app;
mod error;
pub mod settings;

pub use app::{Application, Control, FrameHandler};
pub use error::{AppError, Result};
pub use settings::AppSettings;

pub use metronome_core::{
    LoopStats, NANOSECONDS_IN_SECOND, SkipPolicy, SleepStrategy, StopHandle, Timer, TimerConfig,
    TimerError, TimerHandle, TimerId, TimerStats, clock, hertz_to_nanoseconds, logging, sleep,
};
