//! Logging facilities for Metronome.
//!
//! Metronome uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     // Initialize tracing (you can customize this)
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! The timer loop logs at these levels:
//!
//! - `info`: loop start/stop, sleeper selection
//! - `warn`: a pass with no registered timers, unexpected `errno` values
//! - `error`: fatal sleep errors that terminate the loop
//! - `trace`: individual timer fires and interrupted sleeps

/// Span names used throughout Metronome for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// Timer loop span.
    pub const TIMER_LOOP: &str = "metronome::timer_loop";
    /// Frame rendering span.
    pub const FRAME: &str = "metronome::frame";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "metronome_core";
    /// Timer registry and loop target.
    pub const TIMER: &str = "metronome_core::timer";
    /// High-resolution sleep target.
    pub const SLEEP: &str = "metronome_core::sleep";
    /// Clock source target.
    pub const CLOCK: &str = "metronome_core::clock";
    /// Frame loop target.
    pub const APP: &str = "metronome::app";
    /// [`PerfSpan`](super::PerfSpan) target.
    pub const PERF: &str = "metronome::perf";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Logs a debug event on the [`targets::CORE`] target.
#[macro_export]
macro_rules! metronome_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: $crate::logging::targets::CORE, $($arg)*)
    };
}

/// Logs an error event on the [`targets::CORE`] target.
#[macro_export]
macro_rules! metronome_error {
    ($($arg:tt)*) => {
        tracing::error!(target: $crate::logging::targets::CORE, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        // Just ensure it compiles and doesn't panic
        let _span = PerfSpan::new("test_operation");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [targets::TIMER, targets::SLEEP, targets::CLOCK] {
            assert!(target.starts_with(targets::CORE));
        }
    }
}
