//! Closed-form wave fields
//!
//! Each variant maps (normalized fixture position, animation time, palette,
//! musical signals) to a color with no per-fixture state. Only the ripple
//! variant looks back in time, through the melody ring.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use super::{slot, FrameContext, FrameGenerator, ReservedZones};
use crate::color::Rgb;
use crate::frame::FrameBuffer;
use crate::music::NoteEvent;
use crate::waveform::{sawtooth, spaced_triangle, triangle};

/// Wavefront speed in unit squares per second
const RIPPLE_SPEED: f32 = 0.6;

/// Amplitude decay of a ripple per second of age
const RIPPLE_DECAY: f32 = 1.2;

/// Spatial frequency of ripple rings
const RIPPLE_WAVELENGTH: f32 = 6.0;

/// Gap between ripple rings, in ring widths
const RIPPLE_SPACING: f32 = 2.0;

/// Seconds each calibration pattern is shown
const CALIBRATION_PATTERN_SECS: f64 = 4.0;

/// Music older than this no longer lights the ambient field
const AMBIENT_MUSIC_WINDOW_SECS: f64 = 10.0;

/// Wave-field variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveKind {
    /// Three sine plots, one per palette slot
    Trinity,
    /// White sweep split into offset color channels
    Aberration,
    /// Rotating striped bands
    Ribbons,
    /// Rings spreading from recent melody notes
    Ripple,
    /// Test patterns for checking wiring
    Calibration,
    /// Scrolling rainbow
    OldSchool,
    /// Slowly turning conic palette gradient
    Ambient,
}

impl WaveKind {
    /// Log name
    pub fn name(self) -> &'static str {
        match self {
            WaveKind::Trinity => "trinity",
            WaveKind::Aberration => "aberration",
            WaveKind::Ribbons => "ribbons",
            WaveKind::Ripple => "ripple",
            WaveKind::Calibration => "calibration",
            WaveKind::OldSchool => "oldschool",
            WaveKind::Ambient => "ambient",
        }
    }
}

/// Per-tick inputs shared by every fixture
struct Signals<'a> {
    now: f64,
    t: f32,
    colors: Vec<Rgb>,
    chroma: [f32; 12],
    bass: f32,
    music_active: bool,
    melody: Vec<&'a NoteEvent>,
    fixtures: usize,
}

/// A wave-field generator of one kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveField {
    kind: WaveKind,
}

impl WaveField {
    /// Create a generator for `kind`
    pub fn new(kind: WaveKind) -> Self {
        Self { kind }
    }

    /// The variant
    pub fn kind(&self) -> WaveKind {
        self.kind
    }

    fn shade(&self, s: &Signals<'_>, index: usize, zone: i32, p: [f32; 2]) -> Rgb {
        match self.kind {
            WaveKind::Trinity => trinity(s, p),
            WaveKind::Aberration => aberration(s, p),
            WaveKind::Ribbons => ribbons(s, p),
            WaveKind::Ripple => ripple(s, p),
            WaveKind::Calibration => calibration(s, index, zone),
            WaveKind::OldSchool => Rgb::hsv(p[0] + 0.5 * p[1] - 0.2 * s.t, 1.0, 1.0),
            WaveKind::Ambient => ambient(s, p),
        }
    }
}

impl FrameGenerator for WaveField {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn reserved_zones(&self) -> ReservedZones {
        match self.kind {
            WaveKind::Calibration => ReservedZones::Zero,
            _ => ReservedZones::Skip,
        }
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        ctx.palette.ensure_slots(3, ctx.rng);
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>, frame: &mut FrameBuffer) {
        let now = ctx.now;
        let layout = ctx.layout;
        let signals = Signals {
            now,
            t: ctx.elapsed as f32,
            colors: ctx.palette.colors(now),
            chroma: ctx.music.chroma_power(now),
            bass: ctx.music.bass_bump(now).clamp(0.0, 1.0),
            music_active: ctx.music.idle_time(now) < AMBIENT_MUSIC_WINDOW_SECS,
            melody: ctx
                .music
                .melody()
                .iter()
                .filter(|e| e.position.is_some())
                .collect(),
            fixtures: layout.len(),
        };
        self.reserved_zones().paint(layout, frame, |i, c| {
            self.shade(&signals, i, c.zone(), layout.normalized(i))
        });
    }
}

fn trinity(s: &Signals<'_>, p: [f32; 2]) -> Rgb {
    const FREQ: [f32; 3] = [1.0, 1.5, 2.0];
    const SPEED: [f32; 3] = [0.13, -0.21, 0.17];
    const WIDTH: f32 = 0.25;
    let mut out = Rgb::BLACK;
    for k in 0..3 {
        let phase = k as f32 / 3.0;
        let curve = 0.5 + 0.35 * (TAU * (p[0] * FREQ[k] + s.t * SPEED[k] + phase)).sin();
        let falloff = (1.0 - (p[1] - curve).abs() / WIDTH).max(0.0);
        out = out + slot(&s.colors, k).scale(falloff);
    }
    out.scale(0.8 + 0.2 * s.bass)
}

fn aberration(s: &Signals<'_>, p: [f32; 2]) -> Rgb {
    let sweep = sawtooth(s.t * 0.25);
    let split = 0.04 + 0.1 * s.bass;
    let pulse = |channel: usize| {
        let x = p[0] - sweep - split * channel as f32 + 0.5;
        triangle(x).powi(4) * 255.0
    };
    Rgb::new(pulse(0), pulse(1), pulse(2)) + slot(&s.colors, 0).scale(0.1)
}

fn ribbons(s: &Signals<'_>, p: [f32; 2]) -> Rgb {
    const ROTATION: [f32; 3] = [0.05, -0.08, 0.11];
    let (dx, dy) = (p[0] - 0.5, p[1] - 0.5);
    let mut out = Rgb::BLACK;
    for k in 0..3 {
        let angle = TAU * (s.t * ROTATION[k] + k as f32 / 3.0);
        let along = dx * angle.cos() + dy * angle.sin();
        let band = spaced_triangle(along * 4.0 + s.t * 0.5, 1.5);
        out = out + slot(&s.colors, k).scale(band);
    }
    out
}

fn ripple(s: &Signals<'_>, p: [f32; 2]) -> Rgb {
    let mut out = slot(&s.colors, 0).scale(0.08);
    for event in &s.melody {
        let Some(origin) = event.position else {
            continue;
        };
        let age = (s.now - event.time) as f32;
        if age < 0.0 {
            continue;
        }
        let amplitude = event.velocity * (-RIPPLE_DECAY * age).exp();
        if amplitude < 0.01 {
            continue;
        }
        let distance = ((p[0] - origin[0]).powi(2) + (p[1] - origin[1]).powi(2)).sqrt();
        let behind_front = (age * RIPPLE_SPEED - distance) * RIPPLE_WAVELENGTH;
        if behind_front < 0.0 {
            continue;
        }
        let ring = spaced_triangle(behind_front, RIPPLE_SPACING) * amplitude;
        out = out + Rgb::from_pitch(event.pitch).scale(ring);
    }
    out
}

fn calibration(s: &Signals<'_>, index: usize, zone: i32) -> Rgb {
    let pattern = (s.t as f64 / CALIBRATION_PATTERN_SECS).max(0.0) as usize % 3;
    match pattern {
        0 => Rgb::hsv(zone as f32 / 12.0, 1.0, 1.0),
        1 => {
            let dot = (s.t.max(0.0) * 10.0) as usize % s.fixtures.max(1);
            if index == dot {
                Rgb::WHITE
            } else {
                Rgb::BLACK
            }
        }
        _ => match index % 3 {
            0 => Rgb::RED,
            1 => Rgb::GREEN,
            _ => Rgb::BLUE,
        },
    }
}

fn ambient(s: &Signals<'_>, p: [f32; 2]) -> Rgb {
    let n = s.colors.len();
    if n == 0 {
        return Rgb::BLACK;
    }
    let angle = (p[1] - 0.5).atan2(p[0] - 0.5) / TAU + 0.5 + s.t * 0.02;
    let position = angle.rem_euclid(1.0) * n as f32;
    let a = position.floor() as usize % n;
    let color = s.colors[a].lerp(s.colors[(a + 1) % n], position.fract());
    let energy = if s.music_active {
        s.chroma.iter().copied().fold(0.0, f32::max)
    } else {
        0.0
    };
    color.scale(0.5 + 0.5 * energy.clamp(0.0, 1.0))
}
