//! Show configuration (TOML)
//!
//! ```toml
//! tick_rate_hz = 20.0
//! mode = "ripple"
//!
//! [composer]
//! idle_timeout_secs = 30.0
//!
//! [device]
//! address = "192.168.4.1:7777"
//! protocol = "current"
//! strings = [900, 900, 1800]
//! layout = { kind = "grid", width = 24 }
//! ```

use std::path::Path;
use std::time::{Duration, Instant};

use ledflow_core::{ComposerConfig, Coordinate, Layout, LogConfig, Mode};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scheduler::SchedulerConfig;
use crate::transport::{ProtocolVersion, SessionToken};
use crate::{ControlError, Result};

/// How fixture positions are derived from the device strings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayoutSpec {
    /// All fixtures on one line
    #[default]
    Strip,
    /// Serpentine grid
    Grid { width: usize },
    /// Explicit coordinates, one per fixture
    Explicit { coordinates: Vec<Coordinate> },
}

impl LayoutSpec {
    /// Build a layout for `fixtures` fixtures.
    ///
    /// Explicit coordinate lists are truncated, or repeated with the x axis
    /// shifted past the previous copy, to match the fixture count.
    pub fn build(&self, fixtures: usize) -> Result<Layout> {
        match self {
            LayoutSpec::Strip => Ok(Layout::strip(fixtures)),
            LayoutSpec::Grid { width } => Ok(Layout::grid(*width, fixtures)),
            LayoutSpec::Explicit { coordinates } if coordinates.is_empty() => {
                Ok(Layout::strip(fixtures))
            }
            LayoutSpec::Explicit { coordinates } => {
                let span = coordinates
                    .iter()
                    .map(|c| c.x)
                    .fold(f32::MIN, f32::max)
                    - coordinates.iter().map(|c| c.x).fold(f32::MAX, f32::min)
                    + 1.0;
                let resolved = (0..fixtures)
                    .map(|i| {
                        let c = coordinates[i % coordinates.len()];
                        let copy = (i / coordinates.len()) as f32;
                        Coordinate::new(c.x + copy * span, c.y, c.z)
                    })
                    .collect();
                Ok(Layout::new(resolved)?)
            }
        }
    }
}

/// The output device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// `host:port` of the device
    pub address: String,
    /// Protocol generation
    pub protocol: ProtocolVersion,
    /// Hex-encoded session token
    pub token_hex: Option<String>,
    /// Seconds until the token expires (none = never)
    pub token_lifetime_secs: Option<f64>,
    /// Channel count (bytes, 3 per fixture) of every string in frame order
    pub strings: Vec<usize>,
    /// Fixture positions
    pub layout: LayoutSpec,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: "192.168.4.1:7777".to_string(),
            protocol: ProtocolVersion::default(),
            token_hex: None,
            token_lifetime_secs: None,
            strings: vec![900],
            layout: LayoutSpec::default(),
        }
    }
}

impl DeviceConfig {
    /// Fixtures implied by the string lengths
    pub fn fixture_count(&self) -> usize {
        self.strings.iter().sum::<usize>() / 3
    }

    /// Decode the configured token, stamping its expiry from now
    pub fn session_token(&self) -> Result<Option<SessionToken>> {
        let Some(hex_token) = &self.token_hex else {
            return Ok(None);
        };
        let expires_at = self
            .token_lifetime_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .and_then(|lifetime| Instant::now().checked_add(lifetime));
        SessionToken::from_hex(hex_token, expires_at).map(Some)
    }
}

/// Live MIDI input
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    /// Connect at startup
    pub enabled: bool,
    /// Substring of the port name; first port if unset
    pub port: Option<String>,
}

/// Top-level show configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowConfig {
    /// Ticks per second
    pub tick_rate_hz: f64,
    /// Render without sending
    pub preview: bool,
    /// Mode at startup
    pub mode: Mode,
    pub composer: ComposerConfig,
    pub device: DeviceConfig,
    pub midi: MidiConfig,
    pub logging: LogConfig,
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20.0,
            preview: false,
            mode: Mode::default(),
            composer: ComposerConfig::default(),
            device: DeviceConfig::default(),
            midi: MidiConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl ShowConfig {
    /// Parse and validate TOML
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ShowConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        info!("Loaded show config from {}", path.display());
        Ok(config)
    }

    /// Write as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Reject configurations the scheduler cannot run
    pub fn validate(&self) -> Result<()> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 || self.tick_rate_hz > 1000.0 {
            return Err(ControlError::InvalidParameter(format!(
                "tick_rate_hz must be within (0, 1000], got {}",
                self.tick_rate_hz
            )));
        }
        if let Some(secs) = self.device.token_lifetime_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(ControlError::InvalidParameter(format!(
                    "token_lifetime_secs must be non-negative, got {}",
                    secs
                )));
            }
        }
        if let Some(hex_token) = &self.device.token_hex {
            SessionToken::from_hex(hex_token, None)?;
        }
        if let LayoutSpec::Grid { width: 0 } = self.device.layout {
            return Err(ControlError::InvalidParameter(
                "grid layout width must be at least 1".to_string(),
            ));
        }
        self.composer.validate()?;
        Ok(())
    }

    /// Scheduler settings derived from this config
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick_interval: Duration::from_secs_f64(1.0 / self.tick_rate_hz),
            preview: self.preview,
            mode: self.mode,
            protocol: self.device.protocol,
            layout: self.device.layout.clone(),
            composer: self.composer.clone(),
        }
    }
}
