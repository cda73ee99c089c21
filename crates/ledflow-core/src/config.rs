//! Composer configuration

use serde::{Deserialize, Serialize};

use crate::generators::cellular::{DEFAULT_THRESHOLD, DEFAULT_WIDTH};
use crate::{CoreError, Result};

/// Tuning of the frame composer and its generators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Seconds without musical or manual interaction before an autonomous palette event
    pub idle_timeout_secs: f64,
    /// Number of palette slots
    pub palette_size: usize,
    /// Fade used by autonomous palette events
    pub palette_fade_secs: f64,
    /// Fade used when a note retargets a palette slot
    pub note_fade_secs: f64,
    /// Chance that an idle event is a grayscale pulse instead of a new palette
    pub grayscale_pulse_chance: f64,
    /// Particles in the walker lane
    pub particle_count: usize,
    /// Width of the cellular grid
    pub cellular_width: usize,
    /// Alive threshold of the cellular field
    pub cellular_threshold: f32,
    /// Seconds between cellular generations (0 = every tick)
    pub cellular_step_secs: f64,
    /// Fixed random seed for reproducible shows
    pub seed: Option<u64>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30.0,
            palette_size: 4,
            palette_fade_secs: 3.0,
            note_fade_secs: 0.4,
            grayscale_pulse_chance: 0.055,
            particle_count: 12,
            cellular_width: DEFAULT_WIDTH,
            cellular_threshold: DEFAULT_THRESHOLD,
            cellular_step_secs: 0.0,
            seed: None,
        }
    }
}

impl ComposerConfig {
    /// Reject values the generators cannot work with
    pub fn validate(&self) -> Result<()> {
        let finite_non_negative = [
            ("idle_timeout_secs", self.idle_timeout_secs),
            ("palette_fade_secs", self.palette_fade_secs),
            ("note_fade_secs", self.note_fade_secs),
            ("cellular_step_secs", self.cellular_step_secs),
        ];
        for (name, value) in finite_non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.grayscale_pulse_chance) {
            return Err(CoreError::InvalidConfig(format!(
                "grayscale_pulse_chance must be within 0-1, got {}",
                self.grayscale_pulse_chance
            )));
        }
        if self.palette_size == 0 {
            return Err(CoreError::InvalidConfig(
                "palette_size must be at least 1".to_string(),
            ));
        }
        if self.cellular_width == 0 {
            return Err(CoreError::InvalidConfig(
                "cellular_width must be at least 1".to_string(),
            ));
        }
        if !self.cellular_threshold.is_finite() || self.cellular_threshold < 1.0 {
            return Err(CoreError::InvalidConfig(format!(
                "cellular_threshold must be at least 1, got {}",
                self.cellular_threshold
            )));
        }
        Ok(())
    }
}
