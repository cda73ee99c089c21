//! Animation mode selector
//!
//! Modes are addressed by name or by integer index. Indices wrap modulo the
//! mode count in both directions, so a knob or a counter can cycle through
//! them without range checks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ComposerConfig;
use crate::generators::{CellularField, FrameGenerator, ParticleLane, WaveField, WaveKind};
use crate::CoreError;

/// The available animation modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Colored particles drifting and merging along the x axis
    #[default]
    Walker,
    /// Three sine plots
    Trinity,
    /// Chromatic-aberration sweep
    Aberration,
    /// Rotating ribbons
    Ribbons,
    /// Rings from recent melody notes
    Ripple,
    /// Wiring test patterns
    Calibration,
    /// Scrolling rainbow
    OldSchool,
    /// Conic palette gradient
    Ambient,
    /// Continuous Game of Life
    Life,
}

impl Mode {
    /// Every mode in index order
    pub const ALL: [Mode; 9] = [
        Mode::Walker,
        Mode::Trinity,
        Mode::Aberration,
        Mode::Ribbons,
        Mode::Ripple,
        Mode::Calibration,
        Mode::OldSchool,
        Mode::Ambient,
        Mode::Life,
    ];

    /// Number of modes
    pub const COUNT: usize = Self::ALL.len();

    /// Mode for an index, wrapping in both directions
    pub fn from_index(index: i64) -> Self {
        Self::ALL[index.rem_euclid(Self::COUNT as i64) as usize]
    }

    /// Position of this mode in [`Mode::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The mode after this one, wrapping
    pub fn next(self) -> Self {
        Self::from_index(self.index() as i64 + 1)
    }

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Mode::Walker => "walker",
            Mode::Trinity => "trinity",
            Mode::Aberration => "aberration",
            Mode::Ribbons => "ribbons",
            Mode::Ripple => "ripple",
            Mode::Calibration => "calibration",
            Mode::OldSchool => "oldschool",
            Mode::Ambient => "ambient",
            Mode::Life => "life",
        }
    }

    /// Build a fresh, unprepared generator for this mode
    pub fn generator(self, config: &ComposerConfig) -> Box<dyn FrameGenerator> {
        match self {
            Mode::Walker => Box::new(ParticleLane::new(config.particle_count)),
            Mode::Life => Box::new(CellularField::new(
                config.cellular_width,
                config.cellular_threshold,
                config.cellular_step_secs,
            )),
            Mode::Trinity => Box::new(WaveField::new(WaveKind::Trinity)),
            Mode::Aberration => Box::new(WaveField::new(WaveKind::Aberration)),
            Mode::Ribbons => Box::new(WaveField::new(WaveKind::Ribbons)),
            Mode::Ripple => Box::new(WaveField::new(WaveKind::Ripple)),
            Mode::Calibration => Box::new(WaveField::new(WaveKind::Calibration)),
            Mode::OldSchool => Box::new(WaveField::new(WaveKind::OldSchool)),
            Mode::Ambient => Box::new(WaveField::new(WaveKind::Ambient)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    /// Accepts names (case-insensitive, `-`, `_` and spaces ignored) and
    /// integer indices
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<i64>() {
            return Ok(Self::from_index(index));
        }
        let key: String = trimmed
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            // "cellular field" is the legacy name of the first mode; the
            // Game of Life is `life`
            "walker" | "particles" | "cellular" | "cellularfield" => Ok(Mode::Walker),
            _ => Self::ALL
                .into_iter()
                .find(|m| m.name() == key)
                .ok_or_else(|| CoreError::UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_wraps() {
        assert_eq!(Mode::from_index(0), Mode::Walker);
        assert_eq!(Mode::from_index(9), Mode::Walker);
        assert_eq!(Mode::from_index(-1), Mode::Life);
        assert_eq!(Mode::from_index(13), Mode::Ripple);
        assert_eq!(Mode::Life.next(), Mode::Walker);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("old-school".parse::<Mode>().unwrap(), Mode::OldSchool);
        assert_eq!("Ambient".parse::<Mode>().unwrap(), Mode::Ambient);
        assert_eq!("particles".parse::<Mode>().unwrap(), Mode::Walker);
        assert_eq!("cellular".parse::<Mode>().unwrap(), Mode::Walker);
        assert_eq!("Cellular Field".parse::<Mode>().unwrap(), Mode::Walker);
        assert_eq!("cellular_field".parse::<Mode>().unwrap(), Mode::Walker);
        assert_eq!("life".parse::<Mode>().unwrap(), Mode::Life);
        assert_eq!("10".parse::<Mode>().unwrap(), Mode::Trinity);
        assert!("disco".parse::<Mode>().is_err());
    }

    #[test]
    fn test_names_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
            assert_eq!(Mode::from_index(mode.index() as i64), mode);
        }
    }

    #[test]
    fn test_generator_names() {
        let config = ComposerConfig::default();
        assert_eq!(Mode::Walker.generator(&config).name(), "walker");
        assert_eq!(Mode::Life.generator(&config).name(), "life");
        assert_eq!(Mode::OldSchool.generator(&config).name(), "oldschool");
    }
}
