//! LedFlow Core - Frame Generation Pipeline
//!
//! This crate contains everything that runs inside one tick of the light show:
//! - Color values and cross-fading color transitions
//! - The musical input model (decaying per-pitch-class energy, bass, melody ring)
//! - Fixture layouts with reserved zones
//! - Frame generators (particle lane, cellular field, wave fields)
//! - The frame composer that ties them together once per tick
//!
//! Nothing in here reads the wall clock. Every time-dependent call takes an
//! explicit `now` in seconds, so the whole pipeline can be replayed with a
//! synthetic clock. [`SessionClock`] maps a real `Instant` onto that timeline.

#![warn(missing_docs)]

use thiserror::Error;

pub mod clock;
pub mod color;
pub mod composer;
pub mod config;
pub mod frame;
pub mod generators;
pub mod layout;
pub mod logging;
pub mod mode;
pub mod music;
pub mod transition;
pub mod waveform;

// --- Re-exports grouped by category ---

// Time & color
pub use clock::SessionClock;
pub use color::{Palette, Rgb};
pub use transition::ColorTransition;

// Musical input
pub use music::{BassNote, MelodyRing, MusicalEvent, MusicalInputState, NoteEvent, NoteOnset};

// Geometry & frames
pub use frame::FrameBuffer;
pub use layout::{Bounds, Coordinate, Layout};

// Generators & composition
pub use composer::{FrameComposer, IdleEvent};
pub use config::ComposerConfig;
pub use generators::{
    CellularField, FrameContext, FrameGenerator, ParticleLane, ReservedZones, WaveField, WaveKind,
};
pub use mode::Mode;

// Logging
pub use logging::LogConfig;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Layout could not be built from the given coordinates
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown mode name
    #[error("Unknown mode: {0}")]
    UnknownMode(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
