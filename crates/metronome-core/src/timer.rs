//! Timer registrations.
//!
//! A registration pairs a callback with a period and tracks when it is next
//! due. All times are nanoseconds since the start of the timer loop.

use slotmap::new_key_type;

new_key_type! {
    /// A unique identifier for a registered timer.
    ///
    /// Returned by [`Timer::add_timer`](crate::Timer::add_timer) and accepted
    /// by [`Timer::delete_timer`](crate::Timer::delete_timer). An id is never
    /// reused, even after its timer is deleted.
    pub struct TimerId;
}

/// The callback invoked when a timer fires.
///
/// The argument is the time since this timer last fired, in nanoseconds.
/// On the first fire it is the time since the loop started, or since the
/// timer was added if that happened while the loop was running.
pub type TimerCallback = Box<dyn FnMut(i64) + 'static>;

/// What a timer does once it has fallen more than a period behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipPolicy {
    /// Jump the next due time forward to the current time and drop the
    /// remaining missed ticks.
    ///
    /// The late fire that detects the gap leaves the timer due at that same
    /// instant, so it fires once more on the next pass. That catch-up fire
    /// usually sees a delta of zero, since no time has passed since the late
    /// fire. Regular spacing resumes one period after it.
    #[default]
    AllowSkip,
    /// Fire once for every missed tick, in consecutive passes, until caught up.
    FireEveryTick,
}

/// Counters describing how a timer has been serviced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// How many times the callback has been invoked.
    pub fire_count: u64,
    /// Nominal ticks dropped by [`SkipPolicy::AllowSkip`].
    pub skipped_ticks: u64,
    /// The largest gap between a fire's scheduled and actual time, in nanoseconds.
    pub max_lateness_ns: i64,
    /// The delta passed to the most recent fire, in nanoseconds.
    pub last_delta_ns: i64,
}

/// Internal timer data.
pub(crate) struct TimerDefinition {
    /// The callback. `None` only while the callback is running.
    pub(crate) callback: Option<TimerCallback>,
    /// How often this timer should fire.
    period: i64,
    /// When this timer was last fired.
    last_fired: i64,
    /// When this timer should next fire.
    next_due: i64,
    /// Catch-up behaviour.
    skip_policy: SkipPolicy,
    stats: TimerStats,
}

impl TimerDefinition {
    /// Create a registration that is first due at `anchor`.
    pub(crate) fn new(
        callback: TimerCallback,
        period: i64,
        skip_policy: SkipPolicy,
        anchor: i64,
    ) -> Self {
        debug_assert!(period >= 0, "period validated by the registry");
        Self {
            callback: Some(callback),
            period,
            last_fired: anchor,
            next_due: anchor,
            skip_policy,
            stats: TimerStats::default(),
        }
    }

    /// Rewind to the loop origin. Done for every timer when a loop starts.
    pub(crate) fn reset(&mut self) {
        self.last_fired = 0;
        self.next_due = 0;
        self.stats = TimerStats::default();
    }

    pub(crate) fn period(&self) -> i64 {
        self.period
    }

    pub(crate) fn next_due(&self) -> i64 {
        self.next_due
    }

    pub(crate) fn stats(&self) -> TimerStats {
        self.stats
    }

    pub(crate) fn is_due(&self, now: i64) -> bool {
        self.next_due <= now
    }

    /// Record a fire at `now` and return the delta to pass to the callback.
    pub(crate) fn update(&mut self, now: i64) -> i64 {
        let delta = now - self.last_fired;
        let lateness = now - self.next_due;

        // Saturates, so a huge period leaves the timer parked at i64::MAX.
        self.next_due = self.next_due.saturating_add(self.period);
        self.last_fired = now;

        if self.skip_policy == SkipPolicy::AllowSkip && self.next_due < now {
            if self.period > 0 {
                self.stats.skipped_ticks += ((now - self.next_due) / self.period) as u64;
            }
            self.next_due = now;
        }

        self.stats.fire_count += 1;
        self.stats.max_lateness_ns = self.stats.max_lateness_ns.max(lateness);
        self.stats.last_delta_ns = delta;
        delta
    }
}

impl std::fmt::Debug for TimerDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerDefinition")
            .field("period", &self.period)
            .field("last_fired", &self.last_fired)
            .field("next_due", &self.next_due)
            .field("skip_policy", &self.skip_policy)
            .field("running", &self.callback.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(period: i64, policy: SkipPolicy) -> TimerDefinition {
        TimerDefinition::new(Box::new(|_| {}), period, policy, 0)
    }

    #[test]
    fn test_delta_reflects_actual_elapsed_time() {
        let mut timer = definition(10, SkipPolicy::AllowSkip);
        assert!(timer.is_due(0));
        assert_eq!(timer.update(3), 3);
        assert_eq!(timer.next_due(), 10);

        // Fired late: delta is the real gap, not the period.
        assert!(timer.is_due(17));
        assert_eq!(timer.update(17), 14);
        assert_eq!(timer.next_due(), 20);
        assert_eq!(timer.stats().max_lateness_ns, 7);
        assert_eq!(timer.stats().last_delta_ns, 14);
        assert_eq!(timer.stats().fire_count, 2);
    }

    #[test]
    fn test_allow_skip_jumps_to_now() {
        let mut timer = definition(10, SkipPolicy::AllowSkip);
        assert_eq!(timer.update(55), 55);
        // Ticks at 10..=50 were missed; one catch-up fire remains.
        assert_eq!(timer.next_due(), 55);
        assert_eq!(timer.stats().skipped_ticks, 4);

        assert_eq!(timer.update(55), 0);
        assert_eq!(timer.next_due(), 65);
        assert_eq!(timer.stats().skipped_ticks, 4);
    }

    #[test]
    fn test_huge_period_saturates() {
        let mut timer = TimerDefinition::new(Box::new(|_| {}), i64::MAX, SkipPolicy::AllowSkip, 40);
        assert_eq!(timer.update(45), 5);
        assert_eq!(timer.next_due(), i64::MAX);
        assert!(!timer.is_due(i64::MAX - 1));
        assert_eq!(timer.stats().skipped_ticks, 0);
    }

    #[test]
    fn test_fire_every_tick_never_clamps() {
        let mut timer = definition(10, SkipPolicy::FireEveryTick);
        let mut fires = 0;
        while timer.is_due(55) {
            timer.update(55);
            fires += 1;
        }
        // Ticks at 0, 10, 20, 30, 40, 50.
        assert_eq!(fires, 6);
        assert_eq!(timer.next_due(), 60);
        assert_eq!(timer.stats().skipped_ticks, 0);
    }

    #[test]
    fn test_zero_period_is_always_due() {
        let mut timer = definition(0, SkipPolicy::AllowSkip);
        for now in [0, 5, 5, 9] {
            assert!(timer.is_due(now));
            timer.update(now);
        }
        assert_eq!(timer.stats().fire_count, 4);
        assert_eq!(timer.stats().skipped_ticks, 0);
    }

    #[test]
    fn test_next_due_is_monotonic() {
        for policy in [SkipPolicy::AllowSkip, SkipPolicy::FireEveryTick] {
            let mut timer = definition(7, policy);
            let mut previous = timer.next_due();
            for now in [0, 3, 30, 31, 32, 100, 100, 101] {
                if timer.is_due(now) {
                    timer.update(now);
                }
                assert!(timer.next_due() >= previous);
                previous = timer.next_due();
            }
        }
    }

    #[test]
    fn test_anchor_sets_first_deadline() {
        let mut timer = TimerDefinition::new(Box::new(|_| {}), 10, SkipPolicy::AllowSkip, 42);
        assert!(!timer.is_due(41));
        assert!(timer.is_due(42));
        assert_eq!(timer.update(45), 3);
        assert_eq!(timer.next_due(), 52);
    }

    #[test]
    fn test_reset_rewinds_to_origin() {
        let mut timer = definition(10, SkipPolicy::AllowSkip);
        timer.update(42);
        timer.reset();
        assert_eq!(timer.next_due(), 0);
        assert_eq!(timer.stats(), TimerStats::default());
        assert_eq!(timer.update(5), 5);
    }
}
