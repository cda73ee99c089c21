//! LedFlow Control - Scheduling, Input and Transport
//!
//! This crate runs the frame pipeline from `ledflow-core` against real devices:
//! - **Scheduler**: fixed-rate tick thread with a non-blocking re-entrancy guard
//! - **Transport**: datagram framing, session tokens and UDP delivery
//! - **MIDI**: byte parsing and live input via `midir`
//! - **Config**: TOML show configuration
//!
//! ## Feature Flags
//!
//! - `midi`: Enable live MIDI input (requires `midir`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ledflow_control::{MemorySession, Scheduler, ShowConfig};
//!
//! let config = ShowConfig::default();
//! let session = MemorySession::new(vec![900, 900]);
//! let scheduler = Scheduler::new(config.scheduler_config(), Box::new(session));
//! scheduler.start().unwrap();
//! scheduler.stop();
//! ```

#![allow(missing_docs)]

/// Show configuration
pub mod config;
/// Error types
pub mod error;
/// MIDI parsing and input
pub mod midi;
/// Tick thread and lifecycle
pub mod scheduler;
/// Datagram framing and device sessions
pub mod transport;

// Re-exports
pub use config::{DeviceConfig, LayoutSpec, MidiConfig, ShowConfig};
pub use error::{ControlError, Result};
pub use midi::MidiMessage;
pub use scheduler::{Command, Scheduler, SchedulerConfig, SchedulerStats};
pub use transport::{
    DeviceSession, MemorySession, ProtocolVersion, SendOutcome, SessionToken, TransportFramer,
    UdpDeviceSession, MAX_PAYLOAD,
};

#[cfg(feature = "midi")]
pub use midi::MidiInputHandler;
