//! Integration tests for the frame loop and settings loading.

use std::io::Write;
use std::sync::Arc;

use metronome::clock::{TimeSource, VirtualClock};
use metronome::sleep::VirtualSleeper;
use metronome::{
    AppError, AppSettings, Application, Control, FrameHandler, SleepStrategy, Timer, TimerConfig,
};

const SECOND: i64 = 1_000_000_000;

fn virtual_timer() -> (Timer, Arc<VirtualClock>) {
    let clock = Arc::new(VirtualClock::new());
    let sleeper = VirtualSleeper::new(clock.clone());
    let timer = Timer::with_parts(clock.clone(), Box::new(sleeper), TimerConfig::default());
    (timer, clock)
}

/// Counts updates and frames for one virtual second, optionally switching
/// the refresh rate halfway through.
struct Counter {
    clock: Arc<VirtualClock>,
    updates: u32,
    frames: u32,
    frame_deltas: Vec<i64>,
    switch_to: Option<i64>,
}

impl Counter {
    fn new(clock: Arc<VirtualClock>) -> Self {
        Self {
            clock,
            updates: 0,
            frames: 0,
            frame_deltas: Vec::new(),
            switch_to: None,
        }
    }
}

impl FrameHandler for Counter {
    fn update(&mut self, _delta: i64, control: &Control<'_>) {
        let now = self.clock.nanoseconds();
        if now >= SECOND {
            control.stop();
            return;
        }
        if now >= SECOND / 2 {
            if let Some(hertz) = self.switch_to.take() {
                control.set_refresh_rate(hertz).unwrap();
                assert_eq!(control.refresh_rate(), hertz);
            }
        }
        self.updates += 1;
    }

    fn pre_render(&mut self, delta: i64) {
        self.frame_deltas.push(delta);
    }

    fn render(&mut self) {
        self.frames += 1;
    }
}

#[test]
fn test_logic_and_video_run_at_their_own_rates() {
    let (timer, clock) = virtual_timer();
    let settings = AppSettings::default()
        .with_logic_rate(60)
        .with_refresh_rate(30);
    let mut app = Application::with_timer(settings, Counter::new(clock), timer).unwrap();
    app.run().unwrap();

    let handler = app.handler();
    assert!((handler.updates as i64 - 60).abs() <= 1, "{} updates", handler.updates);
    assert!((handler.frames as i64 - 30).abs() <= 1, "{} frames", handler.frames);
    assert!(handler.frame_deltas[1..].iter().all(|&delta| delta == 33_333_333));
    assert_eq!(app.frame_count(), handler.frames as u64);
}

#[test]
fn test_refresh_rate_change_from_update() {
    let (timer, clock) = virtual_timer();
    let mut counter = Counter::new(clock);
    counter.switch_to = Some(120);

    let settings = AppSettings::default()
        .with_logic_rate(60)
        .with_refresh_rate(30);
    let mut app = Application::with_timer(settings, counter, timer).unwrap();
    app.run().unwrap();

    assert_eq!(app.refresh_rate(), 120);
    // About 15 frames in the first half second, then about 60.
    let frames = app.handler().frames as i64;
    assert!((70..=80).contains(&frames), "{frames} frames");
}

#[test]
fn test_extra_timer_shares_the_loop() {
    let (timer, clock) = virtual_timer();
    let app = Application::with_timer(AppSettings::default(), Counter::new(clock), timer).unwrap();
    let ticks = std::rc::Rc::new(std::cell::Cell::new(0));
    let count = ticks.clone();
    app.add_timer(move |_| count.set(count.get() + 1), SECOND / 10)
        .unwrap();

    let mut app = app;
    app.run().unwrap();
    // 0, 100ms, ..., 1000ms; the loop stops on the first update past one second.
    assert_eq!(ticks.get(), 11);
}

#[test]
fn test_settings_file_roundtrip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
name = "bench"
refresh_rate = 75
logic_rate = 120

[timer]
sleep_strategy = "hybrid"
spin_threshold_ns = 250000
"#
    )
    .unwrap();

    let settings = AppSettings::load(file.path()).unwrap();
    assert_eq!(settings.name, "bench");
    assert_eq!(settings.refresh_rate, 75);
    assert_eq!(settings.logic_rate, 120);
    assert_eq!(settings.timer.sleep_strategy, SleepStrategy::Hybrid);
    assert_eq!(settings.timer.spin_threshold_ns, 250_000);
}

#[test]
fn test_missing_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = AppSettings::load(&path).unwrap_err();
    assert!(matches!(err, AppError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}
