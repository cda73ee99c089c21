//! Continuous-valued Game of Life ("Life")
//!
//! Cells hold a value in `[0, 2·threshold)`; a cell is alive at or above the
//! threshold. Survivors grow toward the maximum, dying cells drop just below
//! the threshold and then fade to zero one step at a time, so the field shows
//! trails instead of hard on/off flips.
//!
//! The grid is toroidal and double-buffered: a step reads the front buffer,
//! writes the back buffer and swaps the two.

use rand::Rng;
use tracing::debug;

use super::{slot, FrameContext, FrameGenerator, ReservedZones};
use crate::color::Rgb;
use crate::frame::FrameBuffer;
use crate::music::PITCH_CLASSES;

/// Grid width used when the layout gives no better hint
pub const DEFAULT_WIDTH: usize = 24;

/// Alive threshold
pub const DEFAULT_THRESHOLD: f32 = 8.0;

/// Chroma power above which a cell is forced alive
pub const SPARK_POWER: f32 = 0.1;

/// Probability that a cell starts alive when seeding
const SEED_DENSITY: f64 = 0.3;

/// Palette slots used for alive-low, alive-high and dying cells
const LIVING_SLOT: usize = 0;
const THRIVING_SLOT: usize = 1;
const DYING_SLOT: usize = 2;

/// Next value of one cell given its living neighbour count
pub fn next_value(value: f32, neighbours: u32, threshold: f32) -> f32 {
    let max = max_value(threshold);
    if value >= threshold {
        if neighbours == 2 || neighbours == 3 {
            (value + 1.0).min(max)
        } else {
            threshold - 1.0
        }
    } else if neighbours == 3 {
        threshold
    } else {
        (value - 1.0).max(0.0)
    }
}

/// Highest value a cell can reach
pub fn max_value(threshold: f32) -> f32 {
    2.0 * threshold - 1.0
}

/// The cellular field generator
#[derive(Debug, Clone)]
pub struct CellularField {
    width: usize,
    height: usize,
    threshold: f32,
    step_secs: f64,
    cells: [Vec<f32>; 2],
    front: usize,
    last_step: f64,
}

impl CellularField {
    /// An unprepared field `width` cells wide
    pub fn new(width: usize, threshold: f32, step_secs: f64) -> Self {
        Self {
            width: width.max(1),
            height: 0,
            threshold: threshold.max(1.0),
            step_secs: step_secs.max(0.0),
            cells: [Vec::new(), Vec::new()],
            front: 0,
            last_step: f64::NEG_INFINITY,
        }
    }

    /// Build a field from explicit cell values (row-major, `width` wide)
    pub fn from_cells(width: usize, threshold: f32, cells: Vec<f32>) -> Self {
        let width = width.max(1);
        let height = cells.len().div_ceil(width);
        let mut front = cells;
        front.resize(width * height, 0.0);
        let back = vec![0.0; front.len()];
        Self {
            width,
            height,
            threshold: threshold.max(1.0),
            step_secs: 0.0,
            cells: [front, back],
            front: 0,
            last_step: f64::NEG_INFINITY,
        }
    }

    /// Grid dimensions (width, height)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Current cell values
    pub fn cells(&self) -> &[f32] {
        &self.cells[self.front]
    }

    /// Number of alive cells
    pub fn alive_count(&self) -> usize {
        self.cells()
            .iter()
            .filter(|&&v| v >= self.threshold)
            .count()
    }

    /// Living 8-neighbours of a cell, wrapping at the edges
    pub fn living_neighbours(&self, x: usize, y: usize) -> u32 {
        let (w, h) = (self.width, self.height);
        if h == 0 {
            return 0;
        }
        let cells = self.cells();
        let mut count = 0;
        for dy in [h - 1, 0, 1] {
            for dx in [w - 1, 0, 1] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = (x + dx) % w;
                let ny = (y + dy) % h;
                if cells[ny * w + nx] >= self.threshold {
                    count += 1;
                }
            }
        }
        count
    }

    /// Advance one generation.
    ///
    /// With `chroma`, cells whose pitch class (index mod 12) is sounding are
    /// forced to the maximum value instead of following the rule.
    pub fn step(&mut self, chroma: Option<&[f32; PITCH_CLASSES]>) {
        if self.cells[self.front].is_empty() {
            return;
        }
        let max = max_value(self.threshold);
        let back = 1 - self.front;
        let mut next = std::mem::take(&mut self.cells[back]);
        next.resize(self.cells[self.front].len(), 0.0);
        for y in 0..self.height {
            for x in 0..self.width {
                let i = y * self.width + x;
                let sparked = chroma.is_some_and(|c| c[i % PITCH_CLASSES] > SPARK_POWER);
                next[i] = if sparked {
                    max
                } else {
                    next_value(self.cells[self.front][i], self.living_neighbours(x, y), self.threshold)
                };
            }
        }
        self.cells[back] = next;
        self.front = back;
    }

    fn seed<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let max = max_value(self.threshold);
        let threshold = self.threshold;
        for v in self.cells[self.front].iter_mut() {
            *v = if rng.random_bool(SEED_DENSITY) {
                rng.random_range(threshold..=max)
            } else {
                rng.random_range(0.0..threshold)
            };
        }
    }

    fn color_of(&self, value: f32, colors: &[Rgb]) -> Rgb {
        let t = self.threshold;
        let max = max_value(t);
        if value >= t {
            let span = max - t;
            let k = if span > 0.0 { (value - t) / span } else { 1.0 };
            slot(colors, LIVING_SLOT).lerp(slot(colors, THRIVING_SLOT), k.clamp(0.0, 1.0))
        } else {
            Rgb::BLACK.lerp(slot(colors, DYING_SLOT), (value / t).clamp(0.0, 1.0))
        }
    }
}

impl FrameGenerator for CellularField {
    fn name(&self) -> &'static str {
        "life"
    }

    fn reserved_zones(&self) -> ReservedZones {
        ReservedZones::Zero
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        let fixtures = ctx.layout.len();
        self.height = fixtures.div_ceil(self.width);
        let len = self.width * self.height;
        self.cells = [vec![0.0; len], vec![0.0; len]];
        self.front = 0;
        self.last_step = ctx.now;
        self.seed(ctx.rng);
        ctx.palette.ensure_slots(3, ctx.rng);
        debug!(
            "Cellular field {}x{} for {} fixtures",
            self.width, self.height, fixtures
        );
    }

    fn advance(&mut self, ctx: &mut FrameContext<'_>) {
        if ctx.now - self.last_step < self.step_secs {
            return;
        }
        self.last_step = ctx.now;
        let chroma = ctx.music.chroma_power(ctx.now);
        self.step(Some(&chroma));
        if self.alive_count() == 0 && !self.cells().is_empty() {
            debug!("Cellular field died out, reseeding");
            self.seed(ctx.rng);
        }
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>, frame: &mut FrameBuffer) {
        let colors = ctx.palette.colors(ctx.now);
        let cells = self.cells();
        if cells.is_empty() {
            return;
        }
        self.reserved_zones().paint(ctx.layout, frame, |i, _| {
            self.color_of(cells[i % cells.len()], &colors)
        });
    }
}
