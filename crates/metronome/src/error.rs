//! Error types for the frame loop.

use std::path::PathBuf;

use metronome_core::TimerError;

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors that can occur while configuring or running an [`Application`](crate::Application).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The timer rejected a registration, or the loop hit a fatal sleep error.
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// Settings file I/O error.
    #[error("Failed to read settings '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings were not valid TOML, or did not match the expected shape.
    #[error("Invalid settings: {0}")]
    Settings(#[from] toml::de::Error),
}

impl AppError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error ended a running loop rather than its setup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Timer(err) if err.is_fatal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_error_is_transparent() {
        let err = AppError::from(TimerError::InvalidFrequency(0));
        assert_eq!(err.to_string(), TimerError::InvalidFrequency(0).to_string());
        assert!(!err.is_fatal());

        let err = AppError::from(TimerError::BadAddress);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_io_error_names_path() {
        let err = AppError::io(
            "missing.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("missing.toml"));
    }
}
