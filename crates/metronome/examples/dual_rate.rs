//! Dual-rate frame loop example: a logic tick and a video tick at
//! independent rates, reporting the rates actually achieved.
//!
//! Run with: cargo run -p metronome --example dual_rate [settings.toml]
//!
//! Set `RUST_LOG=metronome=debug` (or `trace`) for more detail.

use metronome::{AppSettings, Application, Control, FrameHandler, NANOSECONDS_IN_SECOND};
use tracing_subscriber::EnvFilter;

/// How long to run, in seconds.
const RUN_SECONDS: i64 = 3;

struct Demo {
    elapsed: i64,
    updates: u64,
    frames: u64,
    worst_frame_delta: i64,
    frame_delta_sum: i64,
    switched: bool,
}

impl Demo {
    fn new() -> Self {
        Self {
            elapsed: 0,
            updates: 0,
            frames: 0,
            worst_frame_delta: 0,
            frame_delta_sum: 0,
            switched: false,
        }
    }
}

impl FrameHandler for Demo {
    fn update(&mut self, delta: i64, control: &Control<'_>) {
        self.elapsed += delta;
        self.updates += 1;

        // Halfway through, double the refresh rate.
        if !self.switched && self.elapsed >= RUN_SECONDS * NANOSECONDS_IN_SECOND / 2 {
            self.switched = true;
            let hertz = control.refresh_rate() * 2;
            match control.set_refresh_rate(hertz) {
                Ok(()) => tracing::info!(hertz, "refresh rate changed"),
                Err(err) => tracing::error!(%err, "failed to change refresh rate"),
            }
        }

        if self.elapsed >= RUN_SECONDS * NANOSECONDS_IN_SECOND {
            control.stop();
        }
    }

    fn pre_render(&mut self, delta: i64) {
        if self.frames > 0 {
            self.worst_frame_delta = self.worst_frame_delta.max(delta);
            self.frame_delta_sum += delta;
        }
    }

    fn render(&mut self) {
        self.frames += 1;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => AppSettings::load(path)?,
        None => AppSettings::default().with_logic_rate(60).with_refresh_rate(30),
    };
    tracing::info!(?settings, "loaded settings");

    let mut app = Application::new(settings, Demo::new())?;
    tracing::info!(sleeper = app.timer().sleeper_name(), "using sleeper");
    app.run()?;

    let demo = app.handler();
    let seconds = demo.elapsed as f64 / NANOSECONDS_IN_SECOND as f64;
    let mean_frame_delta = if demo.frames > 1 {
        demo.frame_delta_sum / (demo.frames as i64 - 1)
    } else {
        0
    };
    let stats = app.timer().loop_stats();

    println!("Ran for {seconds:.3}s");
    println!(
        "  logic: {} updates ({:.2} Hz)",
        demo.updates,
        demo.updates as f64 / seconds
    );
    println!(
        "  video: {} frames ({:.2} Hz), mean delta {:.3}ms, worst {:.3}ms",
        demo.frames,
        demo.frames as f64 / seconds,
        mean_frame_delta as f64 / 1e6,
        demo.worst_frame_delta as f64 / 1e6
    );
    println!(
        "  loop: {} passes, {:.3}s asleep",
        stats.passes,
        stats.slept_ns as f64 / NANOSECONDS_IN_SECOND as f64
    );
    Ok(())
}
