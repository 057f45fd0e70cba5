//! Blur parameters and renderer settings.
//!
//! [`BlurConfig`] is what the control panel hands over on every change. It is
//! a small `Copy` value, so the renderer keeps its own copy and the panel
//! stays the owner of the "live" state.

use std::ops::RangeInclusive;

/// Allowed values for [`BlurConfig::sigma`].
pub const SIGMA_RANGE: RangeInclusive<u32> = 1..=10;

/// Allowed values for [`BlurConfig::step`].
pub const STEP_RANGE: RangeInclusive<f32> = 0.1..=10.0;

/// Allowed values for [`BlurConfig::repeat`].
pub const REPEAT_RANGE: RangeInclusive<u32> = 0..=7;

/// A blur parameter outside its allowed range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `sigma` outside [`SIGMA_RANGE`].
    #[error("sigma {0} is outside 1..=10")]
    Sigma(u32),
    /// `step` outside [`STEP_RANGE`] or not finite.
    #[error("step {0} is outside 0.1..=10")]
    Step(f32),
    /// `repeat` outside [`REPEAT_RANGE`].
    #[error("repeat {0} is outside 0..=7")]
    Repeat(u32),
}

/// Parameters of one blurred frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlurConfig {
    /// Blur strength, passed to the shader as the Gaussian sigma.
    pub sigma: u32,
    /// Spacing between kernel taps, in pixels.
    pub step: f32,
    /// Extra passes after the mandatory horizontal one.
    pub repeat: u32,
}

impl BlurConfig {
    /// Create a config, rejecting values outside the allowed ranges.
    ///
    /// # Errors
    ///
    /// Returns the first offending field as a [`ConfigError`].
    pub fn new(sigma: u32, step: f32, repeat: u32) -> Result<Self, ConfigError> {
        let config = Self {
            sigma,
            step,
            repeat,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a config, pulling every value into its allowed range.
    ///
    /// Suits slider input where a rounding step may land just outside the
    /// bounds. A non-finite `step` falls back to the default.
    #[must_use]
    pub fn clamped(sigma: u32, step: f32, repeat: u32) -> Self {
        let step = if step.is_finite() {
            step.clamp(*STEP_RANGE.start(), *STEP_RANGE.end())
        } else {
            Self::default().step
        };
        Self {
            sigma: sigma.clamp(*SIGMA_RANGE.start(), *SIGMA_RANGE.end()),
            step,
            repeat: repeat.clamp(*REPEAT_RANGE.start(), *REPEAT_RANGE.end()),
        }
    }

    /// Check every field against its range.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SIGMA_RANGE.contains(&self.sigma) {
            return Err(ConfigError::Sigma(self.sigma));
        }
        if !self.step.is_finite() || !STEP_RANGE.contains(&self.step) {
            return Err(ConfigError::Step(self.step));
        }
        if !REPEAT_RANGE.contains(&self.repeat) {
            return Err(ConfigError::Repeat(self.repeat));
        }
        Ok(())
    }

    /// Total number of draw passes per frame, as shown to the user.
    #[must_use]
    pub fn passes(&self) -> u32 {
        self.repeat + 1
    }
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            sigma: 3,
            step: 1.0,
            repeat: 1,
        }
    }
}

/// Renderer-wide settings fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RendererSettings {
    /// RGBA color every frame is cleared to. Also the whole output when
    /// there is no image or no config.
    pub clear_color: [f32; 4],
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.5, 1.0],
        }
    }
}
