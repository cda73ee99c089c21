//! The per-tick frame buffer

use crate::color::Rgb;

/// `3 × fixtures` bytes of RGB in fixture order.
///
/// Writes go through [`FrameBuffer::set`], which applies the master
/// brightness and clamps to bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    brightness: f32,
}

impl FrameBuffer {
    /// A dark frame for `fixtures` fixtures
    pub fn new(fixtures: usize) -> Self {
        Self {
            data: vec![0; fixtures * 3],
            brightness: 1.0,
        }
    }

    /// Reallocate for a new fixture count, keeping the common prefix
    pub fn resize(&mut self, fixtures: usize) {
        self.data.resize(fixtures * 3, 0);
    }

    /// Number of fixtures the buffer holds
    pub fn fixture_count(&self) -> usize {
        self.data.len() / 3
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-fixture frame
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Master brightness applied on every write (clamped to 0-1)
    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = if brightness.is_finite() {
            brightness.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    /// Current master brightness
    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Write one fixture. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, color: Rgb) {
        if let Some(px) = self.data.get_mut(index * 3..index * 3 + 3) {
            px.copy_from_slice(&color.scale(self.brightness).to_bytes());
        }
    }

    /// Turn one fixture off
    pub fn clear(&mut self, index: usize) {
        if let Some(px) = self.data.get_mut(index * 3..index * 3 + 3) {
            px.fill(0);
        }
    }

    /// Read one fixture back
    pub fn get(&self, index: usize) -> Option<[u8; 3]> {
        self.data
            .get(index * 3..index * 3 + 3)
            .map(|px| [px[0], px[1], px[2]])
    }

    /// Turn every fixture off
    pub fn clear_all(&mut self) {
        self.data.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut frame = FrameBuffer::new(2);
        frame.set(1, Rgb::new(10.0, 20.0, 30.0));
        assert_eq!(frame.get(1), Some([10, 20, 30]));
        assert_eq!(frame.get(0), Some([0, 0, 0]));
        assert_eq!(frame.get(2), None);
    }

    #[test]
    fn test_out_of_range_write_is_ignored() {
        let mut frame = FrameBuffer::new(1);
        frame.set(5, Rgb::WHITE);
        assert_eq!(frame.len(), 3);
    }

    #[test]
    fn test_brightness_scales_writes() {
        let mut frame = FrameBuffer::new(1);
        frame.set_brightness(0.5);
        frame.set(0, Rgb::new(200.0, 100.0, 0.0));
        assert_eq!(frame.get(0), Some([100, 50, 0]));
    }

    #[test]
    fn test_resize_keeps_prefix() {
        let mut frame = FrameBuffer::new(1);
        frame.set(0, Rgb::WHITE);
        frame.resize(3);
        assert_eq!(frame.len(), 9);
        assert_eq!(frame.get(0), Some([255, 255, 255]));
        assert_eq!(frame.get(2), Some([0, 0, 0]));
    }
}
