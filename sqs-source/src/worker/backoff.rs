//! Exponential backoff applied by a worker after an empty or failed poll.
//!
//! Configuration is shared by all workers of a pool, state is not: every worker
//! owns its own [`Backoff`] so retry timing of one worker never depends on another.

use crate::error::ConfigError;
use rand::Rng;
use std::time::Duration;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(20);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_JITTER: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor per consecutive non-productive poll, at least 1.
    pub multiplier: f64,
    /// Fraction of the computed delay to randomise by, in `[0, 1)`.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            jitter: DEFAULT_JITTER,
        }
    }
}

impl BackoffConfig {
    pub fn new(initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self { initial_delay, max_delay, multiplier, jitter: 0.0 }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_delay.is_zero() {
            return Err(ConfigError::InvalidBackoff("initial delay must be positive".to_string()));
        }
        if self.max_delay < self.initial_delay {
            return Err(ConfigError::InvalidBackoff(format!(
                "max delay {:?} is smaller than initial delay {:?}",
                self.max_delay, self.initial_delay
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoff(format!("multiplier must be >= 1, got {}", self.multiplier)));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(ConfigError::InvalidBackoff(format!("jitter must be in [0, 1), got {}", self.jitter)));
        }
        Ok(())
    }

    /// Delay for the given zero-based attempt, before jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Per-worker backoff state.
///
/// Within a failure streak the returned delays never decrease and never exceed
/// `max_delay`, jitter included.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempts: u32,
    last_delay: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempts: 0, last_delay: Duration::ZERO }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Consecutive non-productive polls since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Advance the streak and return how long to wait before polling again.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.config.delay_for_attempt(self.attempts);
        let jittered = if self.config.jitter > 0.0 {
            let factor = 1.0 + rand::thread_rng().gen_range(-self.config.jitter..=self.config.jitter);
            base.mul_f64(factor)
        } else {
            base
        };

        let delay = jittered.max(self.last_delay).min(self.config.max_delay);
        self.attempts = self.attempts.saturating_add(1);
        self.last_delay = delay;
        delay
    }

    /// End the current streak; the next delay starts again from `initial_delay`.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.last_delay = Duration::ZERO;
    }
}
