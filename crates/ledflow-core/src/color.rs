//! Color values and the active palette
//!
//! Colors are kept as floating point RGB in the `0.0..=255.0` display range.
//! Intermediate values may leave that range (transitions never clamp); the
//! conversion to bytes is the single place where clamping happens.

use std::ops::Add;

use palette::{FromColor, Hsv, Srgb};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::transition::ColorTransition;

/// Linear RGB color in display units (`0.0..=255.0`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
}

impl Rgb {
    /// All channels off
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    /// All channels at full output
    pub const WHITE: Self = Self::new(255.0, 255.0, 255.0);
    /// Pure red
    pub const RED: Self = Self::new(255.0, 0.0, 0.0);
    /// Pure green
    pub const GREEN: Self = Self::new(0.0, 255.0, 0.0);
    /// Pure blue
    pub const BLUE: Self = Self::new(0.0, 0.0, 255.0);

    /// Create a color from raw channel values
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Gray level with all channels set to `v`
    pub const fn gray(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Create a color from hue (0-1, wrapping), saturation and value (0-1)
    pub fn hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let hsv: Hsv = Hsv::new(hue.rem_euclid(1.0) * 360.0, saturation, value);
        let rgb: Srgb = Srgb::from_color(hsv);
        Self::new(rgb.red * 255.0, rgb.green * 255.0, rgb.blue * 255.0)
    }

    /// Saturated color for a MIDI pitch.
    ///
    /// Pitch classes are laid out around the circle of fifths so that
    /// consonant notes land on neighbouring hues.
    pub fn from_pitch(pitch: u8) -> Self {
        let class = (pitch % 12) as u32;
        let fifths = (class * 7) % 12;
        Self::hsv(fifths as f32 / 12.0, 1.0, 1.0)
    }

    /// Random saturated color
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let hue = rng.random::<f32>();
        let saturation = rng.random_range(0.6..=1.0);
        Self::hsv(hue, saturation, 1.0)
    }

    /// Linear interpolation, `t = 0` is `self`, `t = 1` is `other`. Not clamped.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        Rgb::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Multiply every channel by `k`
    pub fn scale(self, k: f32) -> Rgb {
        Rgb::new(self.r * k, self.g * k, self.b * k)
    }

    /// Clamp to the display range and round to bytes
    pub fn to_bytes(self) -> [u8; 3] {
        [to_byte(self.r), to_byte(self.g), to_byte(self.b)]
    }
}

fn to_byte(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

impl Add for Rgb {
    type Output = Rgb;

    fn add(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

/// Set of palette slots, each an independently cross-fading color.
///
/// Generators read slots by index (wrapping). Musical onsets retarget one slot
/// at a time in round-robin order; idle events retarget all of them.
#[derive(Debug, Clone)]
pub struct Palette {
    slots: Vec<ColorTransition>,
    next_slot: usize,
}

impl Palette {
    /// Create a palette of `size` random colors
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let slots = (0..size)
            .map(|_| ColorTransition::new(Rgb::random(rng)))
            .collect();
        Self {
            slots,
            next_slot: 0,
        }
    }

    /// Create a palette from fixed colors
    pub fn from_colors(colors: &[Rgb]) -> Self {
        Self {
            slots: colors.iter().copied().map(ColorTransition::new).collect(),
            next_slot: 0,
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if the palette has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Grow the palette with random colors until it has at least `count` slots
    pub fn ensure_slots<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) {
        while self.slots.len() < count {
            self.slots.push(ColorTransition::new(Rgb::random(rng)));
        }
    }

    /// Current colors of all slots
    pub fn colors(&mut self, now: f64) -> Vec<Rgb> {
        self.slots
            .iter_mut()
            .map(|slot| slot.current_color(now))
            .collect()
    }

    /// Current color of a random slot
    pub fn random_color<R: Rng + ?Sized>(&mut self, rng: &mut R, now: f64) -> Rgb {
        if self.slots.is_empty() {
            return Rgb::random(rng);
        }
        let slot = rng.random_range(0..self.slots.len());
        self.slots[slot].current_color(now)
    }

    /// Fade the next slot in round-robin order toward `color`.
    ///
    /// Returns the slot that was retargeted.
    pub fn retarget_next(&mut self, color: Rgb, duration: f64, now: f64) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let slot = self.next_slot % self.slots.len();
        self.slots[slot].set_target(color, duration, now);
        self.next_slot = (slot + 1) % self.slots.len();
        Some(slot)
    }

    /// Fade every slot toward a fresh random color
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R, duration: f64, now: f64) {
        for slot in &mut self.slots {
            slot.set_target(Rgb::random(rng), duration, now);
        }
    }

    /// Fade every slot toward a random gray level
    pub fn grayscale_pulse<R: Rng + ?Sized>(&mut self, rng: &mut R, duration: f64, now: f64) {
        for slot in &mut self.slots {
            let level = rng.random_range(64.0..=255.0);
            slot.set_target(Rgb::gray(level), duration, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_to_bytes_clamps() {
        let c = Rgb::new(-20.0, 127.6, 400.0);
        assert_eq!(c.to_bytes(), [0, 128, 255]);
        assert_eq!(Rgb::new(f32::NAN, 0.0, 0.0).to_bytes(), [0, 0, 0]);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(Rgb::hsv(0.0, 1.0, 1.0).to_bytes(), [255, 0, 0]);
        assert_eq!(Rgb::hsv(1.0 / 3.0, 1.0, 1.0).to_bytes(), [0, 255, 0]);
        assert_eq!(Rgb::hsv(1.0, 0.0, 1.0).to_bytes(), [255, 255, 255]);
    }

    #[test]
    fn test_pitch_color_ignores_octave() {
        assert_eq!(Rgb::from_pitch(60), Rgb::from_pitch(72));
        assert_ne!(Rgb::from_pitch(60), Rgb::from_pitch(61));
    }

    #[test]
    fn test_palette_round_robin() {
        let mut palette = Palette::from_colors(&[Rgb::RED, Rgb::GREEN, Rgb::BLUE]);
        assert_eq!(palette.retarget_next(Rgb::WHITE, 0.0, 0.0), Some(0));
        assert_eq!(palette.retarget_next(Rgb::WHITE, 0.0, 0.0), Some(1));
        assert_eq!(palette.retarget_next(Rgb::WHITE, 0.0, 0.0), Some(2));
        assert_eq!(palette.retarget_next(Rgb::BLACK, 0.0, 0.0), Some(0));
        assert_eq!(
            palette.colors(0.0),
            vec![Rgb::BLACK, Rgb::WHITE, Rgb::WHITE]
        );
    }

    #[test]
    fn test_empty_palette_has_no_colors() {
        let mut palette = Palette::from_colors(&[]);
        assert!(palette.colors(1.0).is_empty());
        assert_eq!(palette.retarget_next(Rgb::WHITE, 1.0, 1.0), None);
    }

    #[test]
    fn test_grayscale_pulse_is_gray() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut palette = Palette::random(4, &mut rng);
        palette.grayscale_pulse(&mut rng, 0.0, 0.0);
        for c in palette.colors(0.0) {
            assert_eq!(c.r, c.g);
            assert_eq!(c.g, c.b);
        }
    }
}
