//! Frame composer
//!
//! Owns everything that changes from tick to tick: the frame buffer, the
//! palette, the musical state and the active generator. One call to
//! [`FrameComposer::tick`] produces one complete frame.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::color::{Palette, Rgb};
use crate::config::ComposerConfig;
use crate::frame::FrameBuffer;
use crate::generators::{FrameContext, FrameGenerator};
use crate::layout::Layout;
use crate::mode::Mode;
use crate::music::{MusicalEvent, MusicalInputState, CONTROL_BRIGHTNESS, CONTROL_SPEED};

/// Speed multiplier at the top of the speed controller
const MAX_SPEED: f64 = 2.0;

/// Autonomous palette change fired after a period without interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleEvent {
    /// Every slot fades to a new random color
    NewPalette,
    /// Every slot fades to a random gray
    GrayscalePulse,
}

/// Produces one frame per tick for the active mode
pub struct FrameComposer {
    config: ComposerConfig,
    layout: Layout,
    frame: FrameBuffer,
    palette: Palette,
    music: MusicalInputState,
    mode: Mode,
    generator: Box<dyn FrameGenerator>,
    prepared: bool,
    rng: StdRng,
    frame_count: u64,
    last_tick: Option<f64>,
    animation_time: f64,
    last_interaction: f64,
    last_idle_event: f64,
    idle_events: u64,
}

impl FrameComposer {
    /// Create a composer for `layout`, starting in `mode` at session time `now`
    pub fn new(config: ComposerConfig, layout: Layout, mode: Mode, now: f64) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let palette = Palette::random(config.palette_size, &mut rng);
        let generator = mode.generator(&config);
        info!(
            "Composer ready: {} fixtures, mode {}",
            layout.len(),
            mode
        );
        Self {
            frame: FrameBuffer::new(layout.len()),
            layout,
            palette,
            music: MusicalInputState::new(),
            mode,
            generator,
            prepared: false,
            rng,
            frame_count: 0,
            last_tick: None,
            animation_time: 0.0,
            last_interaction: f64::NEG_INFINITY,
            last_idle_event: now,
            idle_events: 0,
            config,
        }
    }

    /// Switch mode. Counts as manual interaction; the new generator is
    /// prepared lazily on the next tick.
    pub fn set_mode(&mut self, mode: Mode, now: f64) {
        if mode != self.mode {
            info!("Mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        self.generator = mode.generator(&self.config);
        self.prepared = false;
        self.touch(now);
    }

    /// Replace the layout; dependent simulations are rebuilt on the next tick
    pub fn set_layout(&mut self, layout: Layout) {
        self.frame.resize(layout.len());
        self.layout = layout;
        self.prepared = false;
    }

    /// Record manual interaction, postponing idle events
    pub fn touch(&mut self, now: f64) {
        self.last_interaction = now;
    }

    /// Fold one musical event into the state.
    ///
    /// Note onsets retarget the next palette slot toward the pitch color and
    /// place melody notes at a random spot for the ripple field.
    pub fn apply_event(&mut self, event: MusicalEvent) {
        let Some(onset) = self.music.apply(event) else {
            return;
        };
        self.palette.retarget_next(
            Rgb::from_pitch(onset.pitch),
            self.config.note_fade_secs,
            onset.time,
        );
        if let Some(slot) = onset.melody_slot {
            let position = [self.rng.random::<f32>(), self.rng.random::<f32>()];
            self.music.place_melody_note(slot, position);
        }
    }

    /// Produce the frame for session time `now`
    pub fn tick(&mut self, now: f64) -> &[u8] {
        let dt = self.last_tick.map(|t| (now - t).max(0.0)).unwrap_or(0.0);
        self.last_tick = Some(now);
        let speed = self
            .music
            .control(CONTROL_SPEED)
            .map(|v| v as f64 * MAX_SPEED)
            .unwrap_or(1.0);
        self.animation_time += dt * speed;

        if let Some(event) = self.check_idle(now) {
            debug!("Idle event {:?}", event);
        }

        if let Some(brightness) = self.music.control(CONTROL_BRIGHTNESS) {
            self.frame.set_brightness(brightness);
        }
        if self.frame.fixture_count() != self.layout.len() {
            self.frame.resize(self.layout.len());
        }

        let mut ctx = FrameContext {
            now,
            dt,
            elapsed: self.animation_time,
            layout: &self.layout,
            palette: &mut self.palette,
            music: &self.music,
            rng: &mut self.rng,
        };
        if !self.prepared {
            debug!("Preparing generator {}", self.generator.name());
            self.generator.prepare(&mut ctx);
            self.prepared = true;
        }
        self.generator.advance(&mut ctx);
        self.generator.render(&mut ctx, &mut self.frame);
        self.frame_count += 1;
        self.frame.as_bytes()
    }

    fn check_idle(&mut self, now: f64) -> Option<IdleEvent> {
        let last_activity = self
            .music
            .last_note_time()
            .unwrap_or(f64::NEG_INFINITY)
            .max(self.last_interaction)
            .max(self.last_idle_event);
        if now - last_activity < self.config.idle_timeout_secs {
            return None;
        }
        self.last_idle_event = now;
        self.idle_events += 1;
        let fade = self.config.palette_fade_secs;
        if self.rng.random_bool(self.config.grayscale_pulse_chance.clamp(0.0, 1.0)) {
            self.palette.grayscale_pulse(&mut self.rng, fade, now);
            Some(IdleEvent::GrayscalePulse)
        } else {
            self.palette.randomize(&mut self.rng, fade, now);
            Some(IdleEvent::NewPalette)
        }
    }

    /// Forget all interaction so the show reads as infinitely idle
    pub fn reset_idle(&mut self) {
        self.music.reset();
        self.last_interaction = f64::NEG_INFINITY;
        self.last_idle_event = f64::NEG_INFINITY;
    }

    /// Active mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current layout
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The last rendered frame
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Frames produced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Autonomous palette events fired so far
    pub fn idle_events(&self) -> u64 {
        self.idle_events
    }

    /// Musical input state
    pub fn music(&self) -> &MusicalInputState {
        &self.music
    }

    /// Current palette colors
    pub fn palette_colors(&mut self, now: f64) -> Vec<Rgb> {
        self.palette.colors(now)
    }

    /// Configuration in use
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }
}
