//! Engine configuration.
//!
//! Everything here is fixed once the engine is built; there is no runtime
//! reconfiguration. Use the `with_*` builder methods on top of
//! [`EngineConfig::default`], which matches a one-second, 64-loop station:
//!
//! ```
//! use eddy::EngineConfig;
//!
//! let config = EngineConfig::default()
//!     .with_loop_count(8)
//!     .with_loopback(false);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{LooperError, LooperResult};

/// Default number of loops (one per trigger key)
pub const DEFAULT_LOOP_COUNT: usize = 64;

/// Default operating sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default loop length in samples (one second at 48kHz)
pub const DEFAULT_LOOP_CAPACITY: usize = 48_000;

/// Default period size in samples.
/// 64 frames @ 48kHz is ~1.3ms per period.
pub const DEFAULT_PERIOD_SIZE: usize = 64;

/// Default master gain applied after mixing
pub const DEFAULT_MASTER_GAIN: f32 = 0.75;

/// Default gain every loop starts with
pub const DEFAULT_LOOP_GAIN: f32 = 0.9;

/// Static parameters of a looping engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// Number of loops in the bank
    pub loop_count: usize,
    /// Length of every loop buffer in samples
    pub loop_capacity: usize,
    /// Sample rate in Hz (informational for the core, enforced by the backend)
    pub sample_rate: u32,
    /// Samples exchanged with the backend per period
    pub period_size: usize,
    /// Scales the final mix, in `[0, 1]`
    pub master_gain: f32,
    /// Gain each loop is created with, in `[0, 1]`
    pub default_loop_gain: f32,
    /// Route live input straight to the output (monitoring)
    pub loopback: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            loop_count: DEFAULT_LOOP_COUNT,
            loop_capacity: DEFAULT_LOOP_CAPACITY,
            sample_rate: DEFAULT_SAMPLE_RATE,
            period_size: DEFAULT_PERIOD_SIZE,
            master_gain: DEFAULT_MASTER_GAIN,
            default_loop_gain: DEFAULT_LOOP_GAIN,
            loopback: true,
        }
    }
}

impl EngineConfig {
    pub fn with_loop_count(mut self, loop_count: usize) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn with_loop_capacity(mut self, samples: usize) -> Self {
        self.loop_capacity = samples;
        self
    }

    /// Set loop capacity from a duration in seconds at the configured sample rate.
    pub fn with_loop_seconds(mut self, seconds: f32) -> Self {
        self.loop_capacity = (seconds.max(0.0) * self.sample_rate as f32).round() as usize;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_period_size(mut self, period_size: usize) -> Self {
        self.period_size = period_size;
        self
    }

    pub fn with_master_gain(mut self, gain: f32) -> Self {
        self.master_gain = gain;
        self
    }

    pub fn with_default_loop_gain(mut self, gain: f32) -> Self {
        self.default_loop_gain = gain;
        self
    }

    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// Duration of one period in seconds.
    #[inline]
    pub fn period_seconds(&self) -> f32 {
        self.period_size as f32 / self.sample_rate as f32
    }

    /// Check every parameter, returning [`LooperError::Configuration`] on the first bad one.
    pub fn validate(&self) -> LooperResult<()> {
        if self.loop_count == 0 {
            return Err(LooperError::Configuration("loop count must be positive".into()));
        }
        if self.loop_capacity == 0 {
            return Err(LooperError::Configuration("loop capacity must be positive".into()));
        }
        if self.sample_rate == 0 {
            return Err(LooperError::Configuration("sample rate must be positive".into()));
        }
        if self.period_size == 0 {
            return Err(LooperError::Configuration("period size must be positive".into()));
        }
        check_gain("master gain", self.master_gain)?;
        check_gain("default loop gain", self.default_loop_gain)?;
        Ok(())
    }
}

fn check_gain(name: &str, gain: f32) -> LooperResult<()> {
    if gain.is_finite() && (0.0..=1.0).contains(&gain) {
        Ok(())
    } else {
        Err(LooperError::Configuration(format!(
            "{} must be within [0, 1], got {}",
            name, gain
        )))
    }
}
