//! Musical input model
//!
//! Note and controller events are folded into a small fixed state:
//! - 12 pitch classes, each with a held count and the last onset
//! - the last bass note (below [`BASS_SPLIT`])
//! - a ring of recent melody notes with a spatial position for ripples
//! - the last value of every controller
//!
//! Energies decay exponentially from the last onset and are pure functions of
//! `now`, so reading them never mutates the state.

use tracing::warn;

/// Number of pitch classes
pub const PITCH_CLASSES: usize = 12;

/// Notes below this MIDI pitch count as bass
pub const BASS_SPLIT: u8 = 48;

/// Capacity of the melody ring
pub const MELODY_RING_LEN: usize = 8;

/// Decay rate of pitch-class energy (per second, negative)
pub const CHROMA_DECAY: f64 = -1.5;

/// Decay rate of the bass bump (per second, negative)
pub const BASS_DECAY: f64 = -4.0;

/// Number of addressable controllers
pub const CONTROL_COUNT: usize = 128;

/// Controller carrying the master brightness
pub const CONTROL_BRIGHTNESS: u8 = 7;

/// Controller carrying the animation speed
pub const CONTROL_SPEED: u8 = 1;

/// A discrete musical input event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MusicalEvent {
    /// Key pressed. Velocity is normalized to 0-1; zero means release.
    NoteOn {
        /// MIDI pitch
        pitch: u8,
        /// Normalized velocity
        velocity: f32,
        /// Session time in seconds
        time: f64,
    },
    /// Key released
    NoteOff {
        /// MIDI pitch
        pitch: u8,
        /// Session time in seconds
        time: f64,
    },
    /// Controller moved, value normalized to 0-1
    Control {
        /// Controller number
        index: u8,
        /// Normalized value
        value: f32,
    },
}

/// Reported for every accepted note-on so the composer can react to it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteOnset {
    /// MIDI pitch
    pub pitch: u8,
    /// Normalized velocity
    pub velocity: f32,
    /// Session time in seconds
    pub time: f64,
    /// Slot in the melody ring, `None` for bass notes
    pub melody_slot: Option<usize>,
}

/// The last bass note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BassNote {
    /// MIDI pitch
    pub pitch: u8,
    /// Normalized velocity
    pub velocity: f32,
    /// Onset time
    pub time: f64,
}

/// A recent melody note with a position in the unit square
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// MIDI pitch
    pub pitch: u8,
    /// Normalized velocity
    pub velocity: f32,
    /// Onset time
    pub time: f64,
    /// Ripple origin, `None` until placed
    pub position: Option<[f32; 2]>,
}

/// Fixed-size ring of the most recent melody notes
#[derive(Debug, Clone, PartialEq)]
pub struct MelodyRing {
    events: [Option<NoteEvent>; MELODY_RING_LEN],
    next: usize,
}

impl MelodyRing {
    /// An empty ring
    pub fn new() -> Self {
        Self {
            events: [None; MELODY_RING_LEN],
            next: 0,
        }
    }

    /// Store an event, overwriting the oldest. Returns the slot used.
    pub fn push(&mut self, event: NoteEvent) -> usize {
        let slot = self.next;
        self.events[slot] = Some(event);
        self.next = (slot + 1) % MELODY_RING_LEN;
        slot
    }

    /// Set the ripple origin of a stored event
    pub fn set_position(&mut self, slot: usize, position: [f32; 2]) {
        if let Some(Some(event)) = self.events.get_mut(slot) {
            event.position = Some(position);
        }
    }

    /// Event in a slot
    pub fn get(&self, slot: usize) -> Option<&NoteEvent> {
        self.events.get(slot).and_then(|e| e.as_ref())
    }

    /// All stored events in slot order
    pub fn iter(&self) -> impl Iterator<Item = &NoteEvent> {
        self.events.iter().flatten()
    }

    /// Number of stored events
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True if nothing has been played yet
    pub fn is_empty(&self) -> bool {
        self.events.iter().all(|e| e.is_none())
    }

    /// Forget every event
    pub fn clear(&mut self) {
        self.events = [None; MELODY_RING_LEN];
        self.next = 0;
    }
}

impl Default for MelodyRing {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PitchClassEnergy {
    held: u32,
    velocity: f32,
    onset: f64,
}

/// Decaying energy signals derived from note and controller events
#[derive(Debug, Clone)]
pub struct MusicalInputState {
    classes: [PitchClassEnergy; PITCH_CLASSES],
    bass: Option<BassNote>,
    melody: MelodyRing,
    last_note_time: Option<f64>,
    controls: [Option<f32>; CONTROL_COUNT],
    chroma_decay: f64,
    bass_decay: f64,
}

impl MusicalInputState {
    /// Fresh state with the default decay rates
    pub fn new() -> Self {
        Self::with_decay(CHROMA_DECAY, BASS_DECAY)
    }

    /// Fresh state with custom decay rates. Positive rates are negated.
    pub fn with_decay(chroma_decay: f64, bass_decay: f64) -> Self {
        Self {
            classes: [PitchClassEnergy::default(); PITCH_CLASSES],
            bass: None,
            melody: MelodyRing::new(),
            last_note_time: None,
            controls: [None; CONTROL_COUNT],
            chroma_decay: -chroma_decay.abs(),
            bass_decay: -bass_decay.abs(),
        }
    }

    /// Fold one event into the state.
    ///
    /// Returns the onset for note-ons with non-zero velocity.
    pub fn apply(&mut self, event: MusicalEvent) -> Option<NoteOnset> {
        match event {
            MusicalEvent::NoteOn {
                pitch,
                velocity,
                time,
            } => {
                let velocity = sanitize_unit(velocity, "note velocity");
                if velocity <= 0.0 {
                    self.note_off(pitch, time);
                    return None;
                }
                Some(self.note_on(pitch, velocity, time))
            }
            MusicalEvent::NoteOff { pitch, time } => {
                self.note_off(pitch, time);
                None
            }
            MusicalEvent::Control { index, value } => {
                match self.controls.get_mut(index as usize) {
                    Some(slot) => *slot = Some(sanitize_unit(value, "controller value")),
                    None => warn!("Ignoring controller {} (out of range)", index),
                }
                None
            }
        }
    }

    fn note_on(&mut self, pitch: u8, velocity: f32, time: f64) -> NoteOnset {
        let class = &mut self.classes[(pitch % 12) as usize];
        class.held += 1;
        class.velocity = velocity;
        class.onset = time;
        self.touch(time);

        let melody_slot = if pitch < BASS_SPLIT {
            self.bass = Some(BassNote {
                pitch,
                velocity,
                time,
            });
            None
        } else {
            Some(self.melody.push(NoteEvent {
                pitch,
                velocity,
                time,
                position: None,
            }))
        };

        NoteOnset {
            pitch,
            velocity,
            time,
            melody_slot,
        }
    }

    fn note_off(&mut self, pitch: u8, time: f64) {
        let class = &mut self.classes[(pitch % 12) as usize];
        class.held = class.held.saturating_sub(1);
        self.touch(time);
    }

    fn touch(&mut self, time: f64) {
        self.last_note_time = Some(match self.last_note_time {
            Some(last) => last.max(time),
            None => time,
        });
    }

    /// Energy per pitch class: 1.0 while held, decaying from the last onset otherwise
    pub fn chroma_power(&self, now: f64) -> [f32; PITCH_CLASSES] {
        let mut power = [0.0; PITCH_CLASSES];
        for (out, class) in power.iter_mut().zip(&self.classes) {
            *out = if class.held > 0 {
                1.0
            } else {
                decay(class.velocity, class.onset, now, self.chroma_decay)
            };
        }
        power
    }

    /// Decaying energy of the last bass note, 0 if none was played
    pub fn bass_bump(&self, now: f64) -> f32 {
        self.bass
            .map(|b| decay(b.velocity, b.time, now, self.bass_decay))
            .unwrap_or(0.0)
    }

    /// Seconds since the last note event (on or off); infinite if none
    pub fn idle_time(&self, now: f64) -> f64 {
        match self.last_note_time {
            Some(t) => (now - t).max(0.0),
            None => f64::INFINITY,
        }
    }

    /// Time of the last note event
    pub fn last_note_time(&self) -> Option<f64> {
        self.last_note_time
    }

    /// Last value of a controller
    pub fn control(&self, index: u8) -> Option<f32> {
        self.controls.get(index as usize).copied().flatten()
    }

    /// The last bass note
    pub fn bass(&self) -> Option<&BassNote> {
        self.bass.as_ref()
    }

    /// Recent melody notes
    pub fn melody(&self) -> &MelodyRing {
        &self.melody
    }

    /// Place a melody note for ripple rendering
    pub fn place_melody_note(&mut self, slot: usize, position: [f32; 2]) {
        self.melody.set_position(slot, position);
    }

    /// Number of keys currently held in a pitch class
    pub fn held(&self, pitch_class: usize) -> u32 {
        self.classes
            .get(pitch_class)
            .map(|c| c.held)
            .unwrap_or(0)
    }

    /// Drop all note state so the input reads as infinitely idle.
    ///
    /// Controller values survive; they describe knob positions, not activity.
    pub fn reset(&mut self) {
        self.classes = [PitchClassEnergy::default(); PITCH_CLASSES];
        self.bass = None;
        self.melody.clear();
        self.last_note_time = None;
    }
}

impl Default for MusicalInputState {
    fn default() -> Self {
        Self::new()
    }
}

fn decay(velocity: f32, onset: f64, now: f64, rate: f64) -> f32 {
    let elapsed = (now - onset).max(0.0);
    (velocity as f64 * (rate * elapsed).exp()) as f32
}

fn sanitize_unit(value: f32, what: &str) -> f32 {
    if value.is_nan() {
        warn!("Ignoring NaN {}", what);
        return 0.0;
    }
    if !(0.0..=1.0).contains(&value) {
        warn!("Clamping {} {} into 0-1", what, value);
    }
    value.clamp(0.0, 1.0)
}
