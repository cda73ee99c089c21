//! One-dimensional particle lane ("Walker")
//!
//! A handful of colored particles drift along the x axis of the layout. When
//! two are about to meet, both fade toward the faster one's color; when one
//! overtakes another, the slower one dies. Once fewer than half are alive the
//! dead ones respawn in place, so the particle vector never resizes.

use rand::Rng;
use tracing::trace;

use super::{FrameContext, FrameGenerator, ReservedZones};
use crate::color::Rgb;
use crate::frame::FrameBuffer;
use crate::transition::ColorTransition;

/// Collisions further away than this are ignored
pub const MERGE_HORIZON_SECS: f64 = 3.0;

/// Fraction of the layout width added on each side of the lane
const EDGE_MARGIN: f64 = 0.05;

/// Spread of respawn speeds, in lane widths per second
const SPEED_SCALE: f64 = 0.12;

/// Lowest respawn speed, in lane widths per second
const MIN_SPEED: f64 = 0.02;

/// Probability that a respawned particle heads for the nearer edge
const NEAR_EDGE_BIAS: f64 = 0.65;

/// Fade used when a particle bounces off an edge
const BOUNCE_FADE_SECS: f64 = 1.0;

/// Closing speeds below this count as parallel
const CLOSING_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Particle {
    position: f64,
    velocity: f64,
    transition: ColorTransition,
    alive: bool,
    merging: bool,
}

/// The particle lane generator
#[derive(Debug, Clone)]
pub struct ParticleLane {
    particles: Vec<Particle>,
    count: usize,
    min: f64,
    max: f64,
}

impl ParticleLane {
    /// A lane that will hold `count` particles once prepared
    pub fn new(count: usize) -> Self {
        Self {
            particles: Vec::new(),
            count,
            min: 0.0,
            max: 1.0,
        }
    }

    /// Lane extent (min, max)
    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Positions of alive particles in index order
    pub fn alive_positions(&self) -> Vec<f64> {
        self.particles
            .iter()
            .filter(|p| p.alive)
            .map(|p| p.position)
            .collect()
    }

    /// Number of alive particles
    pub fn alive_count(&self) -> usize {
        self.particles.iter().filter(|p| p.alive).count()
    }

    /// Total particle slots, alive or dead
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True before the lane has been prepared (or when `count` is 0)
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Color at lane position `x`.
    ///
    /// Between two particles the colors are interpolated by relative
    /// position; outside the occupied range the nearest particle's color is
    /// returned unmixed. Black if nothing is alive.
    pub fn color_at(&self, x: f64, now: f64) -> Rgb {
        let alive: Vec<&Particle> = self.particles.iter().filter(|p| p.alive).collect();
        color_between(&alive, x, now)
    }

    fn span(&self) -> f64 {
        self.max - self.min
    }

    fn set_bounds(&mut self, lo: f64, hi: f64) {
        let (lo, hi) = if hi - lo > f64::EPSILON {
            let margin = (hi - lo) * EDGE_MARGIN;
            (lo - margin, hi + margin)
        } else {
            (lo - 0.5, hi + 0.5)
        };
        self.min = lo;
        self.max = hi;
    }

    fn spawn<R: Rng + ?Sized>(&self, rng: &mut R, color: Rgb) -> Particle {
        let span = self.span();
        let position = self.min + rng.random::<f64>() * span;
        let speed = (half_normal(rng) * SPEED_SCALE + MIN_SPEED) * span;
        let toward_min = position - self.min < self.max - position;
        let toward_near = rng.random_bool(NEAR_EDGE_BIAS);
        let velocity = if toward_min == toward_near {
            -speed
        } else {
            speed
        };
        Particle {
            position,
            velocity,
            transition: ColorTransition::new(color),
            alive: true,
            merging: false,
        }
    }

    fn sort(&mut self) {
        self.particles
            .sort_by(|a, b| a.position.total_cmp(&b.position));
    }

    /// Kill slower particles until alive positions are ascending again
    fn resolve_crossings(&mut self) {
        let mut stack: Vec<usize> = Vec::with_capacity(self.particles.len());
        for i in 0..self.particles.len() {
            if !self.particles[i].alive {
                continue;
            }
            let mut keep = true;
            while let Some(&top) = stack.last() {
                if self.particles[top].position <= self.particles[i].position {
                    break;
                }
                if self.particles[top].velocity.abs() < self.particles[i].velocity.abs() {
                    self.particles[top].alive = false;
                    stack.pop();
                } else {
                    self.particles[i].alive = false;
                    keep = false;
                    break;
                }
            }
            if keep {
                stack.push(i);
            }
        }
    }

    fn respawn_dead(&mut self, ctx: &mut FrameContext<'_>) {
        let alive = self.alive_count();
        if alive * 2 >= self.particles.len() {
            return;
        }
        trace!(
            "Respawning {} particles",
            self.particles.len() - alive
        );
        for i in 0..self.particles.len() {
            if !self.particles[i].alive {
                let color = ctx.palette.random_color(ctx.rng, ctx.now);
                self.particles[i] = self.spawn(ctx.rng, color);
            }
        }
        self.sort();
    }
}

impl FrameGenerator for ParticleLane {
    fn name(&self) -> &'static str {
        "walker"
    }

    fn reserved_zones(&self) -> ReservedZones {
        ReservedZones::Zero
    }

    fn prepare(&mut self, ctx: &mut FrameContext<'_>) {
        let bounds = ctx.layout.bounds();
        self.set_bounds(bounds.min[0] as f64, bounds.max[0] as f64);
        let mut particles = Vec::with_capacity(self.count);
        for _ in 0..self.count {
            let color = ctx.palette.random_color(ctx.rng, ctx.now);
            particles.push(self.spawn(ctx.rng, color));
        }
        self.particles = particles;
        self.sort();
    }

    fn advance(&mut self, ctx: &mut FrameContext<'_>) {
        let now = ctx.now;
        let dt = ctx.dt;

        for p in self.particles.iter_mut().filter(|p| p.merging) {
            p.transition.current_color(now);
            if p.transition.is_settled() {
                p.merging = false;
            }
        }

        let mut prev: Option<usize> = None;
        for i in 0..self.particles.len() {
            if !self.particles[i].alive {
                continue;
            }

            if let Some(p) = prev {
                let (prev_pos, prev_vel) = (self.particles[p].position, self.particles[p].velocity);
                let (pos, vel) = (self.particles[i].position, self.particles[i].velocity);

                // Overtaken: the slower one dies, the survivor skips this tick
                if pos < prev_pos {
                    if vel.abs() > prev_vel.abs() {
                        self.particles[p].alive = false;
                        prev = Some(i);
                    } else {
                        self.particles[i].alive = false;
                    }
                    continue;
                }

                if !self.particles[i].merging && !self.particles[p].merging {
                    let closing = prev_vel - vel;
                    if closing > CLOSING_EPSILON {
                        let until = (pos - prev_pos) / closing;
                        if until > 0.0 && until < MERGE_HORIZON_SECS {
                            let faster = if vel.abs() > prev_vel.abs() { i } else { p };
                            let color = self.particles[faster].transition.current_color(now);
                            for j in [p, i] {
                                self.particles[j].transition.set_target(color, until, now);
                                self.particles[j].merging = true;
                            }
                        }
                    }
                }
            }

            let (min, max) = (self.min, self.max);
            let particle = &mut self.particles[i];
            particle.position += particle.velocity * dt;
            let bounced = if particle.position <= min {
                particle.position = min;
                particle.velocity = particle.velocity.abs();
                true
            } else if particle.position >= max {
                particle.position = max;
                particle.velocity = -particle.velocity.abs();
                true
            } else {
                false
            };
            if bounced {
                let color = ctx.palette.random_color(ctx.rng, now);
                particle.transition.set_target(color, BOUNCE_FADE_SECS, now);
            }

            prev = Some(i);
        }

        self.resolve_crossings();
        self.respawn_dead(ctx);
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>, frame: &mut FrameBuffer) {
        let now = ctx.now;
        let boost = 0.75 + 0.25 * ctx.music.bass_bump(now).clamp(0.0, 1.0);
        let alive: Vec<&Particle> = self.particles.iter().filter(|p| p.alive).collect();
        self.reserved_zones().paint(ctx.layout, frame, |_, c| {
            color_between(&alive, c.x as f64, now).scale(boost)
        });
    }
}

// `alive` must be sorted by position.
fn color_between(alive: &[&Particle], x: f64, now: f64) -> Rgb {
    let (Some(first), Some(last)) = (alive.first(), alive.last()) else {
        return Rgb::BLACK;
    };
    let upper = alive.partition_point(|p| p.position < x);
    if upper == 0 {
        return first.transition.peek(now);
    }
    if upper == alive.len() {
        return last.transition.peek(now);
    }
    let (a, b) = (alive[upper - 1], alive[upper]);
    let gap = b.position - a.position;
    let t = if gap > f64::EPSILON {
        ((x - a.position) / gap) as f32
    } else {
        0.0
    };
    a.transition.peek(now).lerp(b.transition.peek(now), t)
}

// Box-Muller on one uniform pair; 1 - u keeps the log argument in (0, 1].
fn half_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    ((-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Palette;
    use crate::layout::Layout;
    use crate::music::MusicalInputState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn particle(position: f64, velocity: f64, color: Rgb) -> Particle {
        Particle {
            position,
            velocity,
            transition: ColorTransition::new(color),
            alive: true,
            merging: false,
        }
    }

    fn lane(particles: Vec<Particle>) -> ParticleLane {
        ParticleLane {
            count: particles.len(),
            particles,
            min: 0.0,
            max: 10.0,
        }
    }

    #[test]
    fn test_color_at_interpolates_and_clamps() {
        let lane = lane(vec![
            particle(2.0, 0.0, Rgb::BLACK),
            particle(4.0, 0.0, Rgb::new(200.0, 0.0, 0.0)),
        ]);
        assert_eq!(lane.color_at(3.0, 0.0), Rgb::new(100.0, 0.0, 0.0));
        assert_eq!(lane.color_at(0.0, 0.0), Rgb::BLACK);
        assert_eq!(lane.color_at(9.0, 0.0), Rgb::new(200.0, 0.0, 0.0));
    }

    #[test]
    fn test_color_at_without_particles_is_black() {
        let lane = ParticleLane::new(4);
        assert_eq!(lane.color_at(1.0, 0.0), Rgb::BLACK);
    }

    #[test]
    fn test_resolve_crossings_kills_slower() {
        let mut lane = lane(vec![
            particle(5.0, 0.1, Rgb::RED),
            particle(4.0, 2.0, Rgb::BLUE),
            particle(6.0, 0.0, Rgb::GREEN),
        ]);
        lane.resolve_crossings();
        assert_eq!(lane.alive_positions(), vec![4.0, 6.0]);
    }

    #[test]
    fn test_equal_velocities_never_merge() {
        let layout = Layout::strip(10);
        let mut palette = Palette::from_colors(&[Rgb::RED]);
        let music = MusicalInputState::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut lane = lane(vec![
            particle(2.0, 1.0, Rgb::RED),
            particle(3.0, 1.0, Rgb::BLUE),
        ]);
        let mut ctx = FrameContext {
            now: 0.0,
            dt: 0.05,
            elapsed: 0.0,
            layout: &layout,
            palette: &mut palette,
            music: &music,
            rng: &mut rng,
        };
        lane.advance(&mut ctx);
        assert!(lane.particles.iter().all(|p| !p.merging));
    }

    #[test]
    fn test_imminent_collision_merges_toward_faster() {
        let layout = Layout::strip(10);
        let mut palette = Palette::from_colors(&[Rgb::WHITE]);
        let music = MusicalInputState::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut lane = lane(vec![
            particle(4.0, 1.0, Rgb::RED),
            particle(5.0, -0.5, Rgb::BLUE),
        ]);
        let mut ctx = FrameContext {
            now: 0.0,
            dt: 0.01,
            elapsed: 0.0,
            layout: &layout,
            palette: &mut palette,
            music: &music,
            rng: &mut rng,
        };
        lane.advance(&mut ctx);
        assert!(lane.particles.iter().all(|p| p.merging));
        assert_eq!(lane.particles[1].transition.target(), Some(Rgb::RED));
    }

    #[test]
    fn test_respawn_when_half_dead() {
        let layout = Layout::strip(10);
        let mut palette = Palette::from_colors(&[Rgb::WHITE]);
        let music = MusicalInputState::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut lane = lane(vec![
            particle(1.0, 0.0, Rgb::RED),
            particle(2.0, 0.0, Rgb::RED),
            particle(3.0, 0.0, Rgb::RED),
            particle(4.0, 0.0, Rgb::RED),
        ]);
        for p in lane.particles.iter_mut().skip(1) {
            p.alive = false;
        }
        let mut ctx = FrameContext {
            now: 0.0,
            dt: 0.0,
            elapsed: 0.0,
            layout: &layout,
            palette: &mut palette,
            music: &music,
            rng: &mut rng,
        };
        lane.advance(&mut ctx);
        assert_eq!(lane.alive_count(), 4);
        let positions = lane.alive_positions();
        assert!(positions.windows(2).all(|w| w[0] <= w[1]));
        assert!(lane
            .particles
            .iter()
            .all(|p| p.velocity.abs() >= MIN_SPEED * lane.span() - 1e-12));
    }

    #[test]
    fn test_bounds_extend_past_layout() {
        let layout = Layout::strip(11);
        let mut palette = Palette::from_colors(&[Rgb::WHITE]);
        let music = MusicalInputState::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut lane = ParticleLane::new(6);
        let mut ctx = FrameContext {
            now: 0.0,
            dt: 0.0,
            elapsed: 0.0,
            layout: &layout,
            palette: &mut palette,
            music: &music,
            rng: &mut rng,
        };
        lane.prepare(&mut ctx);
        assert_eq!(lane.bounds(), (-0.5, 10.5));
        assert_eq!(lane.len(), 6);
    }
}
