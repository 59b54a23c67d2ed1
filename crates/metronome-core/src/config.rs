//! Timer loop configuration.

use serde::Deserialize;
use spin_sleep::SpinStrategy;

/// Default native sleep accuracy in nanoseconds (1ms).
/// The hybrid sleeper uses native sleep until this threshold, then spins.
pub const DEFAULT_SPIN_THRESHOLD_NS: u32 = 1_000_000;

/// Default sleep taken on a pass with no registered timers (10ms).
pub const DEFAULT_IDLE_BACKOFF_NS: i64 = 10_000_000;

/// Which high-resolution sleep primitive the timer loop should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStrategy {
    /// Probe the host: `nanosleep` on POSIX systems, counter polling elsewhere.
    #[default]
    Auto,
    /// POSIX `nanosleep`, resumed after signal interruptions.
    Native,
    /// Busy-poll the clock's counter. Burns a core while waiting.
    Counter,
    /// Native sleep for the bulk of the wait, then spin for the remainder.
    Hybrid,
}

/// Spin strategy configuration (mirrors `spin_sleep::SpinStrategy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinStrategyConfig {
    /// Yield the thread while spinning (lower CPU, slightly less accurate).
    #[default]
    YieldThread,
    /// Use a spin loop hint instruction.
    SpinLoopHint,
}

impl From<SpinStrategyConfig> for SpinStrategy {
    fn from(config: SpinStrategyConfig) -> Self {
        match config {
            SpinStrategyConfig::YieldThread => SpinStrategy::YieldThread,
            SpinStrategyConfig::SpinLoopHint => SpinStrategy::SpinLoopHint,
        }
    }
}

/// Configuration for the timer loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// The sleep primitive to use between passes.
    pub sleep_strategy: SleepStrategy,

    /// The accuracy threshold in nanoseconds below which the hybrid sleeper spins.
    /// Lower values mean more spinning (more CPU usage, higher accuracy).
    /// Only used by [`SleepStrategy::Hybrid`].
    pub spin_threshold_ns: u32,

    /// The spin strategy used by the hybrid sleeper while spin-waiting.
    pub spin_strategy: SpinStrategyConfig,

    /// How long to sleep on a pass with no registered timers, in nanoseconds.
    /// Zero disables the idle sleep.
    pub idle_backoff_ns: i64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            sleep_strategy: SleepStrategy::Auto,
            spin_threshold_ns: DEFAULT_SPIN_THRESHOLD_NS,
            spin_strategy: SpinStrategyConfig::YieldThread,
            idle_backoff_ns: DEFAULT_IDLE_BACKOFF_NS,
        }
    }
}

impl TimerConfig {
    /// Use a specific sleep strategy.
    pub fn with_sleep_strategy(mut self, strategy: SleepStrategy) -> Self {
        self.sleep_strategy = strategy;
        self
    }

    /// Use a specific idle back-off, in nanoseconds.
    pub fn with_idle_backoff(mut self, nanoseconds: i64) -> Self {
        self.idle_backoff_ns = nanoseconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TimerConfig::default();
        assert_eq!(config.sleep_strategy, SleepStrategy::Auto);
        assert_eq!(config.spin_threshold_ns, 1_000_000);
        assert_eq!(config.spin_strategy, SpinStrategyConfig::YieldThread);
        assert_eq!(config.idle_backoff_ns, 10_000_000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TimerConfig = toml::from_str(
            r#"
            sleep_strategy = "hybrid"
            spin_strategy = "spin_loop_hint"
            "#,
        )
        .unwrap();
        assert_eq!(config.sleep_strategy, SleepStrategy::Hybrid);
        assert_eq!(config.spin_strategy, SpinStrategyConfig::SpinLoopHint);
        assert_eq!(config.spin_threshold_ns, DEFAULT_SPIN_THRESHOLD_NS);
        assert_eq!(config.idle_backoff_ns, DEFAULT_IDLE_BACKOFF_NS);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result: Result<TimerConfig, _> = toml::from_str(r#"sleep_strategy = "busy""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_builders() {
        let config = TimerConfig::default()
            .with_sleep_strategy(SleepStrategy::Counter)
            .with_idle_backoff(0);
        assert_eq!(config.sleep_strategy, SleepStrategy::Counter);
        assert_eq!(config.idle_backoff_ns, 0);
    }
}
