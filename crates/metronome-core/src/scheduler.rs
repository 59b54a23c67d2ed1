//! The periodic multiplexed timer loop.
//!
//! A [`Timer`] runs any number of periodic callbacks on the calling thread.
//! Each pass of the loop reads the clock once, fires every due timer in
//! registration order, then sleeps until the earliest next deadline.
//!
//! # Example
//!
//! ```no_run
//! use metronome_core::{Timer, convert::hertz_to_nanoseconds};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut timer = Timer::new()?;
//!     let stop = timer.stop_handle();
//!
//!     let mut frames = 0;
//!     timer.add_timer(
//!         move |delta| {
//!             frames += 1;
//!             println!("frame {frames}, {delta}ns since the last one");
//!             if frames == 600 {
//!                 stop.stop();
//!             }
//!         },
//!         hertz_to_nanoseconds(60)?,
//!     )?;
//!
//!     // Blocks until stopped.
//!     timer.start_timer_loop()?;
//!     Ok(())
//! }
//! ```
//!
//! # Threading
//!
//! The registry lives behind `Rc<RefCell<..>>`, so a `Timer` and its
//! [`TimerHandle`]s cannot leave the thread that created them. Callbacks may
//! use a `TimerHandle` to add or delete timers while the loop runs; those
//! changes are picked up by the next pass. A timer added mid-run is anchored
//! at the loop time it was added, so its first delta is measured from then.
//! Only [`StopHandle`] crosses threads.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use slotmap::SlotMap;

use crate::clock::{TimeSource, platform_clock};
use crate::config::TimerConfig;
use crate::convert::ticks_to_nanoseconds;
use crate::error::{Result, TimerError};
use crate::logging::{span_names, targets};
use crate::sleep::{HighResSleeper, select_sleeper};
use crate::timer::{SkipPolicy, TimerCallback, TimerDefinition, TimerId, TimerStats};

/// Counters describing the most recent (or current) run of the timer loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Completed passes.
    pub passes: u64,
    /// Callback invocations across all timers.
    pub fires: u64,
    /// Passes that found no registered timers.
    pub idle_passes: u64,
    /// Total time requested from the sleeper, in nanoseconds.
    pub slept_ns: i64,
}

/// All registered timers, in registration order.
#[derive(Default)]
struct Registry {
    timers: SlotMap<TimerId, TimerDefinition>,
    order: Vec<TimerId>,
    /// Loop time of the most recent clock read. New registrations start here.
    now: i64,
}

impl Registry {
    fn insert(&mut self, callback: TimerCallback, period: i64, policy: SkipPolicy) -> Result<TimerId> {
        if period < 0 {
            return Err(TimerError::NegativePeriod(period));
        }
        let id = self
            .timers
            .insert(TimerDefinition::new(callback, period, policy, self.now));
        self.order.push(id);
        tracing::debug!(target: targets::TIMER, ?id, period, ?policy, "timer added");
        Ok(id)
    }

    fn remove(&mut self, id: TimerId) -> bool {
        if self.timers.remove(id).is_none() {
            return false;
        }
        self.order.retain(|&existing| existing != id);
        tracing::debug!(target: targets::TIMER, ?id, "timer deleted");
        true
    }

    fn reset(&mut self) {
        self.now = 0;
        for timer in self.timers.values_mut() {
            timer.reset();
        }
    }

    /// The earliest deadline among all registered timers.
    fn next_wake(&self) -> Option<i64> {
        self.timers.values().map(TimerDefinition::next_due).min()
    }
}

/// Reads loop-relative time from a [`TimeSource`].
struct LoopClock {
    clock: Arc<dyn TimeSource>,
    origin: i64,
    frequency: i64,
}

impl LoopClock {
    fn start(clock: Arc<dyn TimeSource>) -> Self {
        let frequency = clock.frequency();
        let origin = clock.ticks();
        Self {
            clock,
            origin,
            frequency,
        }
    }

    /// Nanoseconds since the loop started.
    fn now(&self) -> i64 {
        ticks_to_nanoseconds(self.clock.ticks() - self.origin, self.frequency)
    }
}

/// Clears the running flag when the loop exits, including by panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A callback taken out of its registration while it runs.
///
/// Dropping the slot puts the callback back, including while unwinding from a
/// panic in the callback. If the timer was deleted in the meantime, the
/// callback is dropped after the registry borrow is released.
struct CallbackSlot<'a> {
    registry: &'a RefCell<Registry>,
    id: TimerId,
    callback: Option<TimerCallback>,
}

impl CallbackSlot<'_> {
    fn call(&mut self, delta: i64) {
        if let Some(callback) = self.callback.as_mut() {
            callback(delta);
        }
    }
}

impl Drop for CallbackSlot<'_> {
    fn drop(&mut self) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        let orphaned = {
            let Ok(mut registry) = self.registry.try_borrow_mut() else {
                return;
            };
            match registry.timers.get_mut(self.id) {
                Some(timer) => {
                    timer.callback = Some(callback);
                    None
                }
                None => Some(callback),
            }
        };
        drop(orphaned);
    }
}

/// A single-threaded scheduler for periodic callbacks.
///
/// Callbacks fire synchronously on the thread running
/// [`start_timer_loop`](Self::start_timer_loop). A panicking callback is not
/// caught: the panic unwinds out of the loop, which is left stopped. The
/// callback stays registered and runs again the next time the loop starts.
pub struct Timer {
    registry: Rc<RefCell<Registry>>,
    running: Arc<AtomicBool>,
    clock: Arc<dyn TimeSource>,
    sleeper: Box<dyn HighResSleeper>,
    config: TimerConfig,
    stats: LoopStats,
}

impl Timer {
    /// Create a timer using the host's preferred clock and sleeper.
    ///
    /// # Errors
    ///
    /// See [`with_config`](Self::with_config).
    pub fn new() -> Result<Self> {
        Self::with_config(TimerConfig::default())
    }

    /// Create a timer using the host's preferred clock and the sleeper
    /// described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Unsupported`] if the configured sleep primitive
    /// is not available on this host.
    pub fn with_config(config: TimerConfig) -> Result<Self> {
        let clock = platform_clock();
        let sleeper = select_sleeper(&config, Arc::clone(&clock))?;
        Ok(Self::with_parts(clock, sleeper, config))
    }

    /// Create a timer from an explicit clock and sleeper.
    ///
    /// Pairing a [`VirtualClock`](crate::clock::VirtualClock) with a
    /// [`VirtualSleeper`](crate::sleep::VirtualSleeper) gives a fully
    /// deterministic loop.
    pub fn with_parts(
        clock: Arc<dyn TimeSource>,
        sleeper: Box<dyn HighResSleeper>,
        config: TimerConfig,
    ) -> Self {
        crate::metronome_debug!(sleeper = sleeper.name(), "timer created");
        Self {
            registry: Rc::new(RefCell::new(Registry::default())),
            running: Arc::new(AtomicBool::new(false)),
            clock,
            sleeper,
            config,
            stats: LoopStats::default(),
        }
    }

    /// Register a periodic callback with the default [`SkipPolicy`].
    ///
    /// `period` is in nanoseconds; zero fires the callback on every pass.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::NegativePeriod`] if `period` is negative.
    pub fn add_timer<F>(&self, callback: F, period: i64) -> Result<TimerId>
    where
        F: FnMut(i64) + 'static,
    {
        self.add_timer_with_policy(callback, period, SkipPolicy::default())
    }

    /// Register a periodic callback with an explicit [`SkipPolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::NegativePeriod`] if `period` is negative.
    pub fn add_timer_with_policy<F>(
        &self,
        callback: F,
        period: i64,
        policy: SkipPolicy,
    ) -> Result<TimerId>
    where
        F: FnMut(i64) + 'static,
    {
        self.registry
            .borrow_mut()
            .insert(Box::new(callback), period, policy)
    }

    /// Unregister a timer. Unknown ids are ignored.
    pub fn delete_timer(&self, id: TimerId) {
        self.registry.borrow_mut().remove(id);
    }

    /// Whether `id` refers to a registered timer.
    pub fn contains(&self, id: TimerId) -> bool {
        self.registry.borrow().timers.contains_key(id)
    }

    /// Number of registered timers.
    pub fn timer_count(&self) -> usize {
        self.registry.borrow().timers.len()
    }

    /// Service counters for a registered timer.
    pub fn timer_stats(&self, id: TimerId) -> Option<TimerStats> {
        self.registry.borrow().timers.get(id).map(TimerDefinition::stats)
    }

    /// Counters for the most recent run of the loop.
    pub fn loop_stats(&self) -> LoopStats {
        self.stats
    }

    /// The name of the sleeper in use.
    pub fn sleeper_name(&self) -> &'static str {
        self.sleeper.name()
    }

    /// The configuration this timer was built with.
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the loop to exit once the current pass completes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// A same-thread handle for callbacks that need to manage timers.
    pub fn handle(&self) -> TimerHandle {
        TimerHandle {
            registry: Rc::downgrade(&self.registry),
            running: Arc::clone(&self.running),
        }
    }

    /// A thread-safe handle that can only stop the loop.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Run the timer loop on the current thread until stopped.
    ///
    /// Every registered timer is rewound to the loop origin first, so all
    /// timers fire on the first pass.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`TimerError`] if the sleep primitive fails. The loop
    /// is stopped when this returns, whether normally or by error.
    pub fn start_timer_loop(&mut self) -> Result<()> {
        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let _guard = RunningGuard(&running);

        self.registry.borrow_mut().reset();
        self.stats = LoopStats::default();

        let clock = LoopClock::start(Arc::clone(&self.clock));
        let _span = tracing::info_span!(
            target: targets::TIMER,
            span_names::TIMER_LOOP,
            sleeper = self.sleeper.name()
        )
        .entered();
        tracing::info!(
            target: targets::TIMER,
            timers = self.timer_count(),
            frequency = clock.frequency,
            "timer loop started"
        );

        while running.load(Ordering::Acquire) {
            if let Err(err) = self.run_pass(&clock) {
                crate::metronome_error!(%err, passes = self.stats.passes, "timer loop aborted");
                return Err(err);
            }
        }

        tracing::info!(
            target: targets::TIMER,
            passes = self.stats.passes,
            fires = self.stats.fires,
            "timer loop stopped"
        );
        Ok(())
    }

    /// One pass: fire due timers in registration order, then sleep unless a
    /// stop was requested during the pass.
    fn run_pass(&mut self, clock: &LoopClock) -> Result<()> {
        let mut now = clock.now();
        self.registry.borrow_mut().now = now;

        // Callbacks may add or delete timers, so walk a snapshot of the order.
        let snapshot = self.registry.borrow().order.clone();
        for id in snapshot {
            let due = {
                let mut registry = self.registry.borrow_mut();
                match registry.timers.get_mut(id) {
                    Some(timer) if timer.is_due(now) => {
                        let delta = timer.update(now);
                        tracing::trace!(
                            target: targets::TIMER,
                            ?id,
                            now,
                            delta,
                            period = timer.period(),
                            "timer fired"
                        );
                        timer.callback.take().map(|callback| (callback, delta))
                    }
                    _ => None,
                }
            };

            let Some((callback, delta)) = due else {
                continue;
            };

            let mut slot = CallbackSlot {
                registry: &self.registry,
                id,
                callback: Some(callback),
            };
            slot.call(delta);
            drop(slot);
            self.stats.fires += 1;

            now = clock.now();
            self.registry.borrow_mut().now = now;
        }

        self.stats.passes += 1;
        if !self.running.load(Ordering::Acquire) {
            return Ok(());
        }

        let next_wake = self.registry.borrow().next_wake();
        match next_wake {
            None => {
                self.stats.idle_passes += 1;
                tracing::warn!(
                    target: targets::TIMER,
                    "unable to calculate wait time (all timers have been removed)"
                );
                if self.config.idle_backoff_ns > 0 {
                    self.sleep(self.config.idle_backoff_ns)?;
                }
            }
            Some(next_wake) if next_wake > now => self.sleep(next_wake - now)?,
            Some(_) => {}
        }
        Ok(())
    }

    fn sleep(&mut self, nanoseconds: i64) -> Result<()> {
        self.sleeper.sleep_nanos(nanoseconds)?;
        self.stats.slept_ns += nanoseconds;
        Ok(())
    }
}

/// A same-thread handle to a [`Timer`]'s registry.
///
/// Hand clones of this to callbacks that need to add or delete timers while
/// the loop is running. The handle does not keep the timer alive.
#[derive(Clone)]
pub struct TimerHandle {
    registry: Weak<RefCell<Registry>>,
    running: Arc<AtomicBool>,
}

impl TimerHandle {
    fn registry(&self) -> Result<Rc<RefCell<Registry>>> {
        self.registry.upgrade().ok_or(TimerError::TimerDropped)
    }

    /// Register a periodic callback with the default [`SkipPolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::NegativePeriod`] for a negative period, or
    /// [`TimerError::TimerDropped`] if the timer no longer exists.
    pub fn add_timer<F>(&self, callback: F, period: i64) -> Result<TimerId>
    where
        F: FnMut(i64) + 'static,
    {
        self.add_timer_with_policy(callback, period, SkipPolicy::default())
    }

    /// Register a periodic callback with an explicit [`SkipPolicy`].
    ///
    /// # Errors
    ///
    /// Same as [`add_timer`](Self::add_timer).
    pub fn add_timer_with_policy<F>(
        &self,
        callback: F,
        period: i64,
        policy: SkipPolicy,
    ) -> Result<TimerId>
    where
        F: FnMut(i64) + 'static,
    {
        self.registry()?
            .borrow_mut()
            .insert(Box::new(callback), period, policy)
    }

    /// Unregister a timer. Unknown ids, and a dropped timer, are ignored.
    pub fn delete_timer(&self, id: TimerId) {
        if let Ok(registry) = self.registry() {
            registry.borrow_mut().remove(id);
        }
    }

    /// Whether `id` refers to a registered timer.
    pub fn contains(&self, id: TimerId) -> bool {
        self.registry()
            .is_ok_and(|registry| registry.borrow().timers.contains_key(id))
    }

    /// Service counters for a registered timer.
    pub fn timer_stats(&self, id: TimerId) -> Option<TimerStats> {
        let registry = self.registry().ok()?;
        let registry = registry.borrow();
        registry.timers.get(id).map(TimerDefinition::stats)
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the loop to exit once the current pass completes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// A thread-safe handle that can stop a running [`Timer`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the loop to exit once the current pass completes.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

static_assertions::assert_impl_all!(StopHandle: Send, Sync);
static_assertions::assert_not_impl_any!(Timer: Send, Sync);
static_assertions::assert_not_impl_any!(TimerHandle: Send, Sync);
