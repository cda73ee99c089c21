//! Frame generators
//!
//! Every animation mode is one [`FrameGenerator`]. The composer owns exactly
//! one generator at a time and drives it through three phases per tick:
//!
//! 1. [`FrameGenerator::prepare`] once after a mode or layout change
//! 2. [`FrameGenerator::advance`] to step internal simulations
//! 3. [`FrameGenerator::render`] to write every fixture of the frame
//!
//! Generators never read the clock; [`FrameContext`] carries the tick time.

pub mod cellular;
pub mod particle_lane;
pub mod wave_field;

use rand::rngs::StdRng;

use crate::color::{Palette, Rgb};
use crate::frame::FrameBuffer;
use crate::layout::{Coordinate, Layout};
use crate::music::MusicalInputState;

pub use cellular::CellularField;
pub use particle_lane::ParticleLane;
pub use wave_field::{WaveField, WaveKind};

/// Everything a generator may read or touch during one tick
pub struct FrameContext<'a> {
    /// Session time of this tick in seconds
    pub now: f64,
    /// Seconds since the previous tick (0 on the first)
    pub dt: f64,
    /// Animation time: session time scaled by the speed controller
    pub elapsed: f64,
    /// Fixture positions
    pub layout: &'a Layout,
    /// Shared palette slots
    pub palette: &'a mut Palette,
    /// Musical input signals
    pub music: &'a MusicalInputState,
    /// Session random source
    pub rng: &'a mut StdRng,
}

/// How a generator treats fixtures in reserved zones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedZones {
    /// Leave the bytes untouched
    Skip,
    /// Write black
    Zero,
}

impl ReservedZones {
    /// Write `color(index, coordinate)` for every fixture, applying the policy
    /// to reserved positions.
    pub fn paint<F>(self, layout: &Layout, frame: &mut FrameBuffer, mut color: F)
    where
        F: FnMut(usize, &Coordinate) -> Rgb,
    {
        for (index, coordinate) in layout.coordinates().iter().enumerate() {
            if coordinate.is_reserved() {
                if self == ReservedZones::Zero {
                    frame.clear(index);
                }
                continue;
            }
            frame.set(index, color(index, coordinate));
        }
    }
}

/// One animation mode
pub trait FrameGenerator: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Reserved-zone policy of this mode
    fn reserved_zones(&self) -> ReservedZones;

    /// (Re)build internal state for the current layout
    fn prepare(&mut self, ctx: &mut FrameContext<'_>);

    /// Step internal simulations by `ctx.dt`
    fn advance(&mut self, _ctx: &mut FrameContext<'_>) {}

    /// Fill the frame
    fn render(&mut self, ctx: &mut FrameContext<'_>, frame: &mut FrameBuffer);
}

/// Palette slot from a snapshot, wrapping; black if the palette is empty
pub(crate) fn slot(colors: &[Rgb], index: usize) -> Rgb {
    if colors.is_empty() {
        Rgb::BLACK
    } else {
        colors[index % colors.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_leaves_reserved_bytes() {
        let layout = Layout::new(vec![
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(1.0, 0.0, 3.0),
        ])
        .unwrap();
        let mut frame = FrameBuffer::new(2);
        frame.set(1, Rgb::new(9.0, 9.0, 9.0));
        ReservedZones::Skip.paint(&layout, &mut frame, |_, _| Rgb::WHITE);
        assert_eq!(frame.get(0), Some([255, 255, 255]));
        assert_eq!(frame.get(1), Some([9, 9, 9]));

        ReservedZones::Zero.paint(&layout, &mut frame, |_, _| Rgb::WHITE);
        assert_eq!(frame.get(1), Some([0, 0, 0]));
    }

    #[test]
    fn test_slot_wraps() {
        assert_eq!(slot(&[], 3), Rgb::BLACK);
        assert_eq!(slot(&[Rgb::RED, Rgb::BLUE], 3), Rgb::BLUE);
    }
}
