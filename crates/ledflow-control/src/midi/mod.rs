//! MIDI input
//!
//! Raw bytes are decoded into [`MidiMessage`] and then mapped onto the
//! musical events understood by the composer. Live device input needs the
//! `midi` feature.

#[cfg(feature = "midi")]
mod input;

#[cfg(feature = "midi")]
pub use input::*;

use ledflow_core::MusicalEvent;
use serde::{Deserialize, Serialize};

/// MIDI message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MidiMessage {
    NoteOn {
        channel: u8,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        channel: u8,
        note: u8,
    },
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    ProgramChange {
        channel: u8,
        program: u8,
    },
    PitchBend {
        channel: u8,
        value: u16,
    },
    Clock,
    Start,
    Stop,
    Continue,
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes.
    ///
    /// Truncated messages return `None` rather than reading past the slice.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;

        // Real-time messages (single byte)
        match status {
            0xF8 => return Some(MidiMessage::Clock),
            0xFA => return Some(MidiMessage::Start),
            0xFC => return Some(MidiMessage::Stop),
            0xFB => return Some(MidiMessage::Continue),
            _ => {}
        }

        let message_type = status & 0xF0;
        let channel = status & 0x0F;

        match (message_type, data) {
            (0x90, [note, velocity, ..]) => {
                // Note On with velocity 0 is treated as Note Off
                if *velocity == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note: *note,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note: *note,
                        velocity: *velocity,
                    })
                }
            }
            (0x80, [note, ..]) => Some(MidiMessage::NoteOff {
                channel,
                note: *note,
            }),
            (0xB0, [controller, value, ..]) => Some(MidiMessage::ControlChange {
                channel,
                controller: *controller,
                value: *value,
            }),
            (0xC0, [program, ..]) => Some(MidiMessage::ProgramChange {
                channel,
                program: *program,
            }),
            (0xE0, [lsb, msb, ..]) => {
                let value = ((*msb as u16) << 7) | (*lsb as u16);
                Some(MidiMessage::PitchBend { channel, value })
            }
            _ => None,
        }
    }

    /// Musical event for this message at session time `time`.
    ///
    /// Data bytes are 7-bit; anything above 127 is masked off. Messages with
    /// no musical meaning (clock, transport, program change, pitch bend)
    /// return `None`.
    pub fn to_musical_event(&self, time: f64) -> Option<MusicalEvent> {
        match *self {
            MidiMessage::NoteOn { note, velocity, .. } => Some(MusicalEvent::NoteOn {
                pitch: note & 0x7F,
                velocity: (velocity & 0x7F) as f32 / 127.0,
                time,
            }),
            MidiMessage::NoteOff { note, .. } => Some(MusicalEvent::NoteOff {
                pitch: note & 0x7F,
                time,
            }),
            MidiMessage::ControlChange {
                controller, value, ..
            } => Some(MusicalEvent::Control {
                index: controller & 0x7F,
                value: (value & 0x7F) as f32 / 127.0,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on() {
        let msg = MidiMessage::from_bytes(&[0x91, 60, 100]).unwrap();
        assert_eq!(
            msg,
            MidiMessage::NoteOn {
                channel: 1,
                note: 60,
                velocity: 100
            }
        );
        assert_eq!(
            msg.to_musical_event(2.0),
            Some(MusicalEvent::NoteOn {
                pitch: 60,
                velocity: 100.0 / 127.0,
                time: 2.0
            })
        );
    }

    #[test]
    fn test_velocity_zero_is_note_off() {
        let msg = MidiMessage::from_bytes(&[0x90, 64, 0]).unwrap();
        assert_eq!(msg, MidiMessage::NoteOff { channel: 0, note: 64 });
    }

    #[test]
    fn test_truncated_messages() {
        assert_eq!(MidiMessage::from_bytes(&[]), None);
        assert_eq!(MidiMessage::from_bytes(&[0x90, 60]), None);
        assert_eq!(MidiMessage::from_bytes(&[0xB0, 7]), None);
        assert_eq!(MidiMessage::from_bytes(&[0x90]), None);
        assert_eq!(MidiMessage::from_bytes(&[0xF8]), Some(MidiMessage::Clock));
    }

    #[test]
    fn test_to_musical_event() {
        let cc = MidiMessage::ControlChange {
            channel: 0,
            controller: 7,
            value: 127,
        };
        assert_eq!(
            cc.to_musical_event(1.0),
            Some(MusicalEvent::Control {
                index: 7,
                value: 1.0
            })
        );
        assert_eq!(MidiMessage::Clock.to_musical_event(1.0), None);

        let on = MidiMessage::NoteOn {
            channel: 0,
            note: 200,
            velocity: 255,
        };
        match on.to_musical_event(2.0) {
            Some(MusicalEvent::NoteOn {
                pitch,
                velocity,
                time,
            }) => {
                assert_eq!(pitch, 200 & 0x7F);
                assert_eq!(velocity, 1.0);
                assert_eq!(time, 2.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
