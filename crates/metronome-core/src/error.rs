//! Error types for Metronome.

/// Result type alias for timer operations.
pub type Result<T> = std::result::Result<T, TimerError>;

/// Errors that can occur while registering timers or running the timer loop.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// A sleep was requested with a malformed duration.
    ///
    /// This means a negative delay, or a sub-second component outside
    /// `0..1_000_000_000`. It always indicates a bug in the caller.
    #[error("invalid sleep duration: tv_sec is {seconds}; tv_nsec is {nanoseconds}")]
    InvalidDuration { seconds: i64, nanoseconds: i64 },

    /// The sleep primitive reported that its arguments point outside the
    /// process address space (`EFAULT`).
    #[error("nanosleep() returned EFAULT")]
    BadAddress,

    /// The requested high-resolution sleep primitive is not available on this host.
    #[error("{0} is not supported by this platform")]
    Unsupported(&'static str),

    /// A timer was registered with a negative period.
    #[error("timer period must not be negative, got {0}ns")]
    NegativePeriod(i64),

    /// A frequency conversion was requested for a non-positive rate.
    #[error("frequency must be positive, got {0}Hz")]
    InvalidFrequency(i64),

    /// The timer a handle refers to has already been dropped.
    #[error("the timer behind this handle has been dropped")]
    TimerDropped,
}

impl TimerError {
    /// Create an invalid-duration error from a raw nanosecond request.
    pub fn invalid_duration(nanoseconds: i64) -> Self {
        let (seconds, nanoseconds) = crate::convert::split_nanoseconds(nanoseconds);
        Self::InvalidDuration {
            seconds,
            nanoseconds,
        }
    }

    /// Whether this error must terminate the timer loop.
    ///
    /// Only malformed sleep requests and missing platform primitives are fatal.
    /// Registration errors are reported to the caller that made the request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidDuration { .. } | Self::BadAddress | Self::Unsupported(_)
        )
    }
}
