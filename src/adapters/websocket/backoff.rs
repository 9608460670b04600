//! Reconnect delay calculation: exponential growth, capped, with jitter.

use rand::Rng;
use std::time::Duration;

use crate::config::RealtimeConfig;

/// Produces successive reconnect delays for one connection.
///
/// `delay(n) = clamp(min(base * multiplier^n, max) * (1 ± jitter), base, max)`.
/// A connection that proves stable calls `reset`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    multiplier: f64,
    jitter_factor: f64,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: &RealtimeConfig) -> Self {
        Self {
            base: config.backoff_base(),
            max: config.backoff_max(),
            multiplier: config.backoff_multiplier,
            jitter_factor: config.jitter_factor,
            max_attempts: config.max_attempts,
            attempt: 0,
        }
    }

    /// Attempts made since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether the attempt budget is spent. A zero budget never runs out.
    pub fn exhausted(&self) -> bool {
        self.max_attempts != 0 && self.attempt >= self.max_attempts
    }

    /// Next delay; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let base_ms = self.base.as_millis() as f64;
        let max_ms = self.max.as_millis() as f64;
        let exponent = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        let capped = (base_ms * self.multiplier.powi(exponent)).min(max_ms);

        let jitter = if self.jitter_factor > 0.0 {
            let spread = capped * self.jitter_factor;
            rand::thread_rng().gen_range(-spread..=spread)
        } else {
            0.0
        };
        let delay_ms = (capped + jitter).min(max_ms).max(base_ms);

        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(delay_ms as u64)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
