//! Live MIDI input via `midir`

use crossbeam_channel::Sender;
use ledflow_core::{MusicalEvent, SessionClock};
use midir::{Ignore, MidiInput, MidiInputConnection};
use tracing::{debug, info, warn};

use super::MidiMessage;
use crate::{ControlError, Result};

const CLIENT_NAME: &str = "ledflow";

/// Holds an open MIDI input connection; events flow until it is dropped
pub struct MidiInputHandler {
    port_name: String,
    _connection: MidiInputConnection<()>,
}

impl MidiInputHandler {
    /// Names of all available input ports
    pub fn list_ports() -> Result<Vec<String>> {
        let midi_in = MidiInput::new(CLIENT_NAME)?;
        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|p| midi_in.port_name(p).ok())
            .collect())
    }

    /// Connect to the first port whose name contains `port_filter` (any port
    /// if `None`) and forward musical events into `events`.
    ///
    /// Event times are taken from `clock` on arrival.
    pub fn connect(
        port_filter: Option<&str>,
        clock: SessionClock,
        events: Sender<MusicalEvent>,
    ) -> Result<Self> {
        let mut midi_in = MidiInput::new(CLIENT_NAME)?;
        midi_in.ignore(Ignore::All);

        let ports = midi_in.ports();
        let port = ports
            .iter()
            .find(|p| match port_filter {
                Some(filter) => midi_in
                    .port_name(p)
                    .is_ok_and(|name| name.contains(filter)),
                None => true,
            })
            .cloned()
            .ok_or_else(|| {
                ControlError::MidiError(format!(
                    "No MIDI input port matching {:?}",
                    port_filter.unwrap_or("*")
                ))
            })?;
        let port_name = midi_in
            .port_name(&port)
            .unwrap_or_else(|_| "unknown".to_string());

        let connection = midi_in
            .connect(
                &port,
                "ledflow-input",
                move |_stamp, bytes, _| {
                    let Some(message) = MidiMessage::from_bytes(bytes) else {
                        debug!("Ignoring MIDI bytes {:02X?}", bytes);
                        return;
                    };
                    if let Some(event) = message.to_musical_event(clock.now()) {
                        if events.send(event).is_err() {
                            warn!("MIDI event dropped, receiver gone");
                        }
                    }
                },
                (),
            )
            .map_err(|e| ControlError::MidiConnectionError(e.to_string()))?;

        info!("MIDI input connected: {}", port_name);
        Ok(Self {
            port_name,
            _connection: connection,
        })
    }

    /// Name of the connected port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}
