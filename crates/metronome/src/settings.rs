//! Application settings, loaded from TOML.
//!
//! ```toml
//! name = "my-game"
//! refresh_rate = 144
//! logic_rate = 60
//!
//! [timer]
//! sleep_strategy = "hybrid"
//! spin_threshold_ns = 500000
//! ```
//!
//! Every key is optional.

use std::path::Path;

use metronome_core::logging::targets;
use metronome_core::{TimerConfig, hertz_to_nanoseconds};
use serde::Deserialize;

use crate::error::{AppError, Result};

/// Default video refresh rate, in hertz.
pub const DEFAULT_REFRESH_RATE: i64 = 60;

/// Default logic update rate, in hertz.
pub const DEFAULT_LOGIC_RATE: i64 = 60;

/// Settings for an [`Application`](crate::Application).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Application name, used in log output.
    pub name: String,
    /// How often frames are rendered, in hertz.
    pub refresh_rate: i64,
    /// How often the logic update runs, in hertz.
    pub logic_rate: i64,
    /// Timer loop configuration.
    pub timer: TimerConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "metronome".to_string(),
            refresh_rate: DEFAULT_REFRESH_RATE,
            logic_rate: DEFAULT_LOGIC_RATE,
            timer: TimerConfig::default(),
        }
    }
}

impl AppSettings {
    /// Parse settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Settings`] for malformed TOML, or
    /// [`AppError::Timer`] if either rate is not positive.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Self = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and parse a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        let settings = Self::from_toml_str(&content)?;
        tracing::debug!(target: targets::APP, path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Check that both rates convert to a timer period.
    pub fn validate(&self) -> Result<()> {
        hertz_to_nanoseconds(self.refresh_rate)?;
        hertz_to_nanoseconds(self.logic_rate)?;
        Ok(())
    }

    /// Use a specific refresh rate.
    pub fn with_refresh_rate(mut self, hertz: i64) -> Self {
        self.refresh_rate = hertz;
        self
    }

    /// Use a specific logic rate.
    pub fn with_logic_rate(mut self, hertz: i64) -> Self {
        self.logic_rate = hertz;
        self
    }

    /// Use a specific timer configuration.
    pub fn with_timer_config(mut self, timer: TimerConfig) -> Self {
        self.timer = timer;
        self
    }
}
