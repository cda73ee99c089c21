//! Fixture layouts
//!
//! A layout maps frame-buffer index to physical position. The z coordinate is
//! not depth: it carries the zone tag of each fixture. Zones 3 and 11 mark
//! positions that exist in the address space but not physically.

use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

/// Zone tags reserved for fixtures that are not physically present
pub const RESERVED_ZONES: [i32; 2] = [3, 11];

/// Position of one fixture. `z` encodes the zone.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
    /// Zone tag
    pub z: f32,
}

impl Coordinate {
    /// Create a coordinate
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Integer zone identity
    pub fn zone(&self) -> i32 {
        self.z.round() as i32
    }

    /// True for positions that must stay dark
    pub fn is_reserved(&self) -> bool {
        RESERVED_ZONES.contains(&self.zone())
    }
}

/// Axis-aligned bounding box over the x/y plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lower corner (x, y)
    pub min: [f32; 2],
    /// Upper corner (x, y)
    pub max: [f32; 2],
}

impl Bounds {
    /// Unit square, used for empty layouts
    pub const UNIT: Self = Self {
        min: [0.0, 0.0],
        max: [1.0, 1.0],
    };

    /// Extent along the x axis
    pub fn width(&self) -> f32 {
        self.max[0] - self.min[0]
    }

    /// Extent along the y axis
    pub fn height(&self) -> f32 {
        self.max[1] - self.min[1]
    }
}

/// Ordered fixture coordinates for one session
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    coordinates: Vec<Coordinate>,
    bounds: Bounds,
}

impl Layout {
    /// Build a layout from explicit coordinates.
    ///
    /// Fails on non-finite values, which would poison every spatial generator.
    pub fn new(coordinates: Vec<Coordinate>) -> Result<Self> {
        if let Some(index) = coordinates
            .iter()
            .position(|c| !(c.x.is_finite() && c.y.is_finite() && c.z.is_finite()))
        {
            return Err(CoreError::InvalidLayout(format!(
                "coordinate {} is not finite",
                index
            )));
        }
        let bounds = compute_bounds(&coordinates);
        Ok(Self {
            coordinates,
            bounds,
        })
    }

    /// A layout with no fixtures
    pub fn empty() -> Self {
        Self {
            coordinates: Vec::new(),
            bounds: Bounds::UNIT,
        }
    }

    /// Fixtures on a straight line along x, spaced one unit apart
    pub fn strip(count: usize) -> Self {
        let coordinates = (0..count)
            .map(|i| Coordinate::new(i as f32, 0.0, 0.0))
            .collect::<Vec<_>>();
        let bounds = compute_bounds(&coordinates);
        Self {
            coordinates,
            bounds,
        }
    }

    /// Fixtures wired as a serpentine grid `width` columns wide.
    ///
    /// Even rows run left to right, odd rows right to left, which matches how
    /// LED curtains are usually wired.
    pub fn grid(width: usize, count: usize) -> Self {
        let width = width.max(1);
        let coordinates = (0..count)
            .map(|i| {
                let row = i / width;
                let col = i % width;
                let x = if row % 2 == 0 { col } else { width - 1 - col };
                Coordinate::new(x as f32, row as f32, 0.0)
            })
            .collect::<Vec<_>>();
        let bounds = compute_bounds(&coordinates);
        Self {
            coordinates,
            bounds,
        }
    }

    /// Number of fixtures
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// True if there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// All coordinates in frame order
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    /// Coordinate of one fixture
    pub fn get(&self, index: usize) -> Option<&Coordinate> {
        self.coordinates.get(index)
    }

    /// Bounding box of all fixtures
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Required frame-buffer length in bytes
    pub fn frame_len(&self) -> usize {
        self.coordinates.len() * 3
    }

    /// Position of a fixture mapped into the unit square.
    ///
    /// Degenerate axes (all fixtures on one line) map to 0.5.
    pub fn normalized(&self, index: usize) -> [f32; 2] {
        let Some(c) = self.coordinates.get(index) else {
            return [0.5, 0.5];
        };
        [
            normalize(c.x, self.bounds.min[0], self.bounds.width()),
            normalize(c.y, self.bounds.min[1], self.bounds.height()),
        ]
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::empty()
    }
}

fn normalize(v: f32, min: f32, span: f32) -> f32 {
    if span > f32::EPSILON {
        (v - min) / span
    } else {
        0.5
    }
}

fn compute_bounds(coordinates: &[Coordinate]) -> Bounds {
    if coordinates.is_empty() {
        return Bounds::UNIT;
    }
    let mut min = [f32::MAX, f32::MAX];
    let mut max = [f32::MIN, f32::MIN];
    for c in coordinates {
        min[0] = min[0].min(c.x);
        min[1] = min[1].min(c.y);
        max[0] = max[0].max(c.x);
        max[1] = max[1].max(c.y);
    }
    Bounds { min, max }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_zones() {
        assert!(Coordinate::new(0.0, 0.0, 3.0).is_reserved());
        assert!(Coordinate::new(0.0, 0.0, 11.0).is_reserved());
        assert!(!Coordinate::new(0.0, 0.0, 4.0).is_reserved());
    }

    #[test]
    fn test_grid_is_serpentine() {
        let layout = Layout::grid(3, 6);
        let xs: Vec<f32> = layout.coordinates().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 2.0, 1.0, 0.0]);
        assert_eq!(layout.get(4).map(|c| c.y), Some(1.0));
        assert_eq!(layout.frame_len(), 18);
    }

    #[test]
    fn test_normalized_degenerate_axis() {
        let layout = Layout::strip(5);
        assert_eq!(layout.normalized(0), [0.0, 0.5]);
        assert_eq!(layout.normalized(4), [1.0, 0.5]);
    }

    #[test]
    fn test_rejects_nan() {
        let result = Layout::new(vec![Coordinate::new(f32::NAN, 0.0, 0.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_layout() {
        let layout = Layout::empty();
        assert!(layout.is_empty());
        assert_eq!(layout.frame_len(), 0);
        assert_eq!(layout.bounds(), Bounds::UNIT);
    }
}
