//! Fixed-rate frame loop.
//!
//! An [`Application`] drives a [`FrameHandler`] from two timers sharing one
//! [`Timer`] loop: a logic tick calling [`FrameHandler::update`], and a video
//! tick running the render sequence
//! ([`pre_render`](FrameHandler::pre_render), [`render`](FrameHandler::render),
//! [`post_render`](FrameHandler::post_render)). The video tick is registered
//! first, so when both are due in the same pass, the frame runs before the
//! update. Changing the refresh rate re-registers the video tick after the
//! logic tick, which reverses that order from then on.
//!
//! # Example
//!
//! ```no_run
//! use metronome::{AppSettings, Application, Control, FrameHandler};
//!
//! struct Game {
//!     elapsed: i64,
//! }
//!
//! impl FrameHandler for Game {
//!     fn update(&mut self, delta: i64, control: &Control<'_>) {
//!         self.elapsed += delta;
//!         if self.elapsed >= 5_000_000_000 {
//!             control.stop();
//!         }
//!     }
//!
//!     fn render(&mut self) {
//!         // Draw and present.
//!     }
//! }
//!
//! fn main() -> Result<(), metronome::AppError> {
//!     let settings = AppSettings::default().with_refresh_rate(144);
//!     let mut app = Application::new(settings, Game { elapsed: 0 })?;
//!     app.run()
//! }
//! ```

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use metronome_core::logging::{PerfSpan, span_names, targets};
use metronome_core::{
    StopHandle, Timer, TimerCallback, TimerHandle, TimerId, hertz_to_nanoseconds,
};

use crate::error::Result;
use crate::settings::AppSettings;

/// Per-application callbacks driven by the frame loop.
///
/// All deltas are nanoseconds since the same callback last ran.
pub trait FrameHandler {
    /// Advance the simulation by `delta` nanoseconds.
    fn update(&mut self, delta: i64, control: &Control<'_>);

    /// Prepare a frame. `delta` is the time since the previous frame.
    fn pre_render(&mut self, _delta: i64) {}

    /// Composite and present the frame.
    fn render(&mut self) {}

    /// Clean up after the frame has been presented.
    fn post_render(&mut self) {}
}

/// The video tick's registration, rebuilt whenever the refresh rate changes.
struct VideoTimer {
    id: Cell<Option<TimerId>>,
    refresh_rate: Cell<i64>,
    frames: Rc<Cell<u64>>,
    make_frame: Box<dyn Fn() -> TimerCallback>,
}

impl VideoTimer {
    /// Replace the current video registration with one at `hertz`.
    ///
    /// The existing registration is left alone if `hertz` is invalid.
    fn register(&self, timer: &TimerHandle, hertz: i64) -> Result<()> {
        let period = hertz_to_nanoseconds(hertz)?;
        if let Some(previous) = self.id.take() {
            timer.delete_timer(previous);
        }
        let id = timer.add_timer((self.make_frame)(), period)?;
        self.id.set(Some(id));
        self.refresh_rate.set(hertz);
        tracing::debug!(target: targets::APP, hertz, period, "video timer registered");
        Ok(())
    }
}

/// Loop controls available to [`FrameHandler::update`].
pub struct Control<'a> {
    timer: &'a TimerHandle,
    video: &'a VideoTimer,
}

impl Control<'_> {
    /// Stop the frame loop once the current pass completes.
    pub fn stop(&self) {
        self.timer.stop();
    }

    /// Change the video refresh rate. The new rate takes effect on the next pass.
    ///
    /// # Errors
    ///
    /// Returns an error if `hertz` is not positive.
    pub fn set_refresh_rate(&self, hertz: i64) -> Result<()> {
        self.video.register(self.timer, hertz)
    }

    /// The current video refresh rate, in hertz.
    pub fn refresh_rate(&self) -> i64 {
        self.video.refresh_rate.get()
    }

    /// Frames rendered since the application was created.
    pub fn frame_count(&self) -> u64 {
        self.video.frames.get()
    }

    /// The underlying timer, for registering extra ticks.
    pub fn timer(&self) -> &TimerHandle {
        self.timer
    }
}

/// A frame loop running a [`FrameHandler`] at fixed logic and refresh rates.
pub struct Application<H: FrameHandler + 'static> {
    settings: AppSettings,
    timer: Timer,
    handler: Rc<RefCell<H>>,
    video: Rc<VideoTimer>,
    logic: TimerId,
}

impl<H: FrameHandler + 'static> Application<H> {
    /// Create an application with a timer built from `settings.timer`.
    ///
    /// # Errors
    ///
    /// Returns an error if either rate is not positive, or if the configured
    /// sleep primitive is unavailable.
    pub fn new(settings: AppSettings, handler: H) -> Result<Self> {
        let timer = Timer::with_config(settings.timer.clone())?;
        Self::with_timer(settings, handler, timer)
    }

    /// Create an application on an existing timer.
    ///
    /// # Errors
    ///
    /// Returns an error if either rate is not positive.
    pub fn with_timer(settings: AppSettings, handler: H, timer: Timer) -> Result<Self> {
        settings.validate()?;
        let handler = Rc::new(RefCell::new(handler));
        let frames = Rc::new(Cell::new(0u64));

        let make_frame = {
            let handler = Rc::clone(&handler);
            let frames = Rc::clone(&frames);
            Box::new(move || -> TimerCallback {
                let handler = Rc::clone(&handler);
                let frames = Rc::clone(&frames);
                Box::new(move |delta| {
                    let mut handler = handler.borrow_mut();
                    handler.pre_render(delta);
                    {
                        let _span = PerfSpan::new(span_names::FRAME);
                        handler.render();
                    }
                    handler.post_render();
                    frames.set(frames.get() + 1);
                    tracing::trace!(target: targets::APP, frame = frames.get(), delta, "frame rendered");
                })
            })
        };

        let video = Rc::new(VideoTimer {
            id: Cell::new(None),
            refresh_rate: Cell::new(settings.refresh_rate),
            frames,
            make_frame,
        });

        video.register(&timer.handle(), settings.refresh_rate)?;

        let logic = {
            let handler = Rc::clone(&handler);
            let video = Rc::clone(&video);
            let timer_handle = timer.handle();
            timer.add_timer(
                move |delta| {
                    let control = Control {
                        timer: &timer_handle,
                        video: &video,
                    };
                    handler.borrow_mut().update(delta, &control);
                },
                hertz_to_nanoseconds(settings.logic_rate)?,
            )?
        };

        Ok(Self {
            settings,
            timer,
            handler,
            video,
            logic,
        })
    }

    /// Run the frame loop on this thread until stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer loop hits a fatal sleep error.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(
            target: targets::APP,
            name = %self.settings.name,
            logic_rate = self.settings.logic_rate,
            refresh_rate = self.refresh_rate(),
            "starting frame loop"
        );
        self.timer.start_timer_loop()?;
        tracing::info!(
            target: targets::APP,
            name = %self.settings.name,
            frames = self.frame_count(),
            "frame loop finished"
        );
        Ok(())
    }

    /// Stop the frame loop once the current pass completes.
    pub fn stop(&self) {
        self.timer.stop();
    }

    /// A thread-safe handle that can stop the frame loop.
    pub fn stop_handle(&self) -> StopHandle {
        self.timer.stop_handle()
    }

    /// Change the video refresh rate.
    ///
    /// # Errors
    ///
    /// Returns an error if `hertz` is not positive.
    pub fn set_refresh_rate(&self, hertz: i64) -> Result<()> {
        self.video.register(&self.timer.handle(), hertz)
    }

    /// The current video refresh rate, in hertz.
    pub fn refresh_rate(&self) -> i64 {
        self.video.refresh_rate.get()
    }

    /// Frames rendered since the application was created.
    pub fn frame_count(&self) -> u64 {
        self.video.frames.get()
    }

    /// Register an extra periodic callback on the frame loop's timer.
    ///
    /// # Errors
    ///
    /// Returns an error if `period` is negative.
    pub fn add_timer<F>(&self, callback: F, period: i64) -> Result<TimerId>
    where
        F: FnMut(i64) + 'static,
    {
        Ok(self.timer.add_timer(callback, period)?)
    }

    /// Unregister an extra callback. The logic and video ticks cannot be removed.
    pub fn delete_timer(&self, id: TimerId) {
        if id == self.logic || Some(id) == self.video.id.get() {
            tracing::warn!(target: targets::APP, ?id, "refusing to delete a frame loop timer");
            return;
        }
        self.timer.delete_timer(id);
    }

    /// The underlying timer.
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// The settings this application was created with.
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// The frame handler.
    ///
    /// # Panics
    ///
    /// Panics if called from inside one of the handler's own callbacks.
    pub fn handler(&self) -> Ref<'_, H> {
        self.handler.borrow()
    }

    /// The frame handler, mutably.
    ///
    /// # Panics
    ///
    /// Panics if called from inside one of the handler's own callbacks.
    pub fn handler_mut(&self) -> RefMut<'_, H> {
        self.handler.borrow_mut()
    }
}
