//! Error types for the control system
use thiserror::Error;

use ledflow_core::CoreError;

/// Control system errors
#[derive(Error, Debug)]
pub enum ControlError {
    /// Generic MIDI error
    #[error("MIDI error: {0}")]
    MidiError(String),

    /// MIDI connection error; the port handle inside midir's error is not
    /// `Sync`, so only the message is kept
    #[error("MIDI connection error: {0}")]
    MidiConnectionError(String),

    /// MIDI initialization error
    #[error("MIDI init error: {0}")]
    #[cfg(feature = "midi")]
    MidiInitError(#[from] midir::InitError),

    /// Datagram could not be built or sent
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Device string lengths do not cover the frame buffer
    #[error("Device strings cover {actual} bytes but the frame has {expected}")]
    ConfigMismatch {
        /// Frame-buffer length in bytes
        expected: usize,
        /// Sum of the device string lengths
        actual: usize,
    },

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parse error
    #[error("Config parse error: {0}")]
    ConfigError(#[from] toml::de::Error),

    /// TOML write error
    #[error("Config write error: {0}")]
    ConfigWriteError(#[from] toml::ser::Error),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Error from the frame pipeline
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for control operations
pub type Result<T> = std::result::Result<T, ControlError>;
