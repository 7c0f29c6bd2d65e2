//! Progress configuration.

use crate::concurrent::Norm;
use crate::driver::DEFAULT_SMOOTHING_GAIN;
use serde::{Deserialize, Serialize};
use tally_core::{ProgressError, Result};

/// Configuration for a [`Progress`](crate::Progress) root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Drop repeated values at the observer (strict) or let ties through
    pub strict: bool,
    /// Only forward to the observer once per bucket of this width
    pub increment: Option<f64>,
    /// IIR gain used by metric-driven scopes
    pub smoothing_gain: f64,
    /// Norm used by [`Progress::fork`](crate::Progress::fork)
    pub default_norm: Norm,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            strict: true,
            increment: None,
            smoothing_gain: DEFAULT_SMOOTHING_GAIN,
            default_norm: Norm::Max,
        }
    }
}

impl ProgressConfig {
    /// Create a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set observer strictness.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the observer bucket width.
    pub fn with_increment(mut self, increment: f64) -> Self {
        self.increment = Some(increment);
        self
    }

    /// Set the smoothing gain.
    pub fn with_smoothing_gain(mut self, gain: f64) -> Self {
        self.smoothing_gain = gain;
        self
    }

    /// Set the default norm.
    pub fn with_default_norm(mut self, norm: Norm) -> Self {
        self.default_norm = norm;
        self
    }

    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing_gain > 0.0 && self.smoothing_gain <= 1.0) {
            return Err(ProgressError::invalid(format!(
                "smoothing_gain must be in (0, 1], got {}",
                self.smoothing_gain
            )));
        }

        if let Some(increment) = self.increment {
            if !increment.is_finite() || increment <= 0.0 {
                return Err(ProgressError::invalid(format!(
                    "increment must be finite and positive, got {increment}"
                )));
            }
        }

        Ok(())
    }
}
