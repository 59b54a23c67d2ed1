//! `nanosleep`-based sleeper for POSIX hosts.

use std::sync::atomic::{AtomicU64, Ordering};

use super::HighResSleeper;
use crate::convert::split_nanoseconds;
use crate::error::{Result, TimerError};
use crate::logging::targets;

/// Sleeps with `nanosleep`, resuming with the remaining time whenever a
/// signal interrupts the wait.
#[derive(Debug, Default)]
pub struct NanosleepSleeper {
    interruptions: AtomicU64,
}

impl NanosleepSleeper {
    /// Create a new sleeper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times a sleep was interrupted by a signal and resumed.
    pub fn interruptions(&self) -> u64 {
        self.interruptions.load(Ordering::Relaxed)
    }
}

fn timespec(seconds: i64, nanoseconds: i64) -> libc::timespec {
    // SAFETY: `timespec` is plain old data; all-zero is a valid value, and
    // zeroing covers any platform-specific padding fields.
    let mut spec: libc::timespec = unsafe { std::mem::zeroed() };
    spec.tv_sec = seconds as libc::time_t;
    spec.tv_nsec = nanoseconds as _;
    spec
}

impl HighResSleeper for NanosleepSleeper {
    fn sleep_nanos(&self, nanoseconds: i64) -> Result<()> {
        let (seconds, nanos) = split_nanoseconds(nanoseconds);
        let mut request = timespec(seconds, nanos);
        let mut remaining = timespec(0, 0);

        loop {
            // SAFETY: both pointers refer to live, aligned timespec values owned by this frame.
            if unsafe { libc::nanosleep(&request, &mut remaining) } == 0 {
                return Ok(());
            }

            match std::io::Error::last_os_error().raw_os_error() {
                Some(libc::EINVAL) => {
                    return Err(TimerError::InvalidDuration {
                        seconds: request.tv_sec as i64,
                        nanoseconds: request.tv_nsec as i64,
                    });
                }
                Some(libc::EFAULT) => return Err(TimerError::BadAddress),
                Some(libc::ENOSYS) => return Err(TimerError::Unsupported("nanosleep")),
                Some(libc::EINTR) => {
                    self.interruptions.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(
                        target: targets::SLEEP,
                        remaining_s = remaining.tv_sec as i64,
                        remaining_ns = remaining.tv_nsec as i64,
                        "nanosleep interrupted; resuming"
                    );
                    request = remaining;
                }
                errno => {
                    // `remaining` is only defined after EINTR; retry the whole request.
                    tracing::warn!(
                        target: targets::SLEEP,
                        ?errno,
                        "unexpected nanosleep failure; retrying"
                    );
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "nanosleep"
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_sleeps_at_least_requested() {
        let sleeper = NanosleepSleeper::new();
        for request in [1_000i64, 250_000, 2_000_000, 10_000_000] {
            let start = Instant::now();
            sleeper.sleep_nanos(request).unwrap();
            assert!(start.elapsed() >= Duration::from_nanos(request as u64));
        }
    }

    #[test]
    fn test_zero_returns_immediately() {
        let sleeper = NanosleepSleeper::new();
        let start = Instant::now();
        sleeper.sleep_nanos(0).unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_negative_request_reports_einval() {
        let sleeper = NanosleepSleeper::new();
        match sleeper.sleep_nanos(-1_500_000_000) {
            Err(TimerError::InvalidDuration {
                seconds,
                nanoseconds,
            }) => {
                assert_eq!(seconds, -1);
                assert_eq!(nanoseconds, -500_000_000);
            }
            other => panic!("expected InvalidDuration, got {other:?}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_resumes_after_signal_interruption() {
        extern "C" fn ignore_signal(_: libc::c_int) {}

        // SAFETY: installs a handler that does nothing; SIGUSR1 is otherwise unused by the test harness.
        unsafe {
            libc::signal(
                libc::SIGUSR1,
                ignore_signal as extern "C" fn(libc::c_int) as libc::sighandler_t,
            );
        }

        let sleeper = NanosleepSleeper::new();
        // SAFETY: pthread_self has no preconditions.
        let sleeping_thread = unsafe { libc::pthread_self() };

        let interrupter = std::thread::spawn(move || {
            for _ in 0..3 {
                std::thread::sleep(Duration::from_millis(10));
                // SAFETY: the target thread is alive: it is blocked in the sleep below
                // until well after the last signal is sent.
                unsafe {
                    libc::pthread_kill(sleeping_thread, libc::SIGUSR1);
                }
            }
        });

        let request = Duration::from_millis(100);
        let start = Instant::now();
        sleeper.sleep_nanos(request.as_nanos() as i64).unwrap();
        let elapsed = start.elapsed();
        interrupter.join().unwrap();

        assert!(elapsed >= request, "woke after {elapsed:?}");
        assert!(sleeper.interruptions() >= 1);
    }
}
