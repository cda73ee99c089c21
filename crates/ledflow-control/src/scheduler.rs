//! Fixed-rate scheduler
//!
//! Runs the frame composer on a dedicated thread driven by a crossbeam
//! ticker. Two locks are involved:
//!
//! - the tick guard, taken with `try_lock`: if a tick is still running when
//!   the next one is due, the new tick is dropped, never queued
//! - the device lock, held while the session is initialized and for the
//!   duration of every send
//!
//! Musical events and commands arrive over channels and are drained at the
//! start of each tick, so the composer only ever has one writer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use ledflow_core::{ComposerConfig, FrameComposer, Mode, MusicalEvent, SessionClock};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::LayoutSpec;
use crate::transport::{DeviceSession, ProtocolVersion, SendOutcome, TransportFramer};
use crate::{ControlError, Result};

/// Scheduler settings
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Time between ticks
    pub tick_interval: Duration,
    /// Render without sending
    pub preview: bool,
    /// Mode at start
    pub mode: Mode,
    /// Wire protocol of the device
    pub protocol: ProtocolVersion,
    /// How the layout is derived from the device strings
    pub layout: LayoutSpec,
    /// Composer tuning
    pub composer: ComposerConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            preview: false,
            mode: Mode::default(),
            protocol: ProtocolVersion::default(),
            layout: LayoutSpec::default(),
            composer: ComposerConfig::default(),
        }
    }
}

/// Manual control applied at the next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch animation mode
    SetMode(Mode),
    /// Any manual interaction; postpones idle events
    Touch,
}

/// Counters since the scheduler was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Frames rendered
    pub frames_generated: u64,
    /// Frames handed to the device
    pub frames_sent: u64,
    /// Datagrams handed to the device
    pub datagrams_sent: u64,
    /// Ticks dropped because the previous one was still running
    pub ticks_skipped: u64,
    /// Frames not sent for lack of a valid token
    pub sends_suppressed: u64,
    /// Frames that failed to send
    pub send_errors: u64,
}

impl SchedulerStats {
    /// JSON snapshot for status output
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Default)]
struct AtomicStats {
    frames_generated: AtomicU64,
    frames_sent: AtomicU64,
    datagrams_sent: AtomicU64,
    ticks_skipped: AtomicU64,
    sends_suppressed: AtomicU64,
    send_errors: AtomicU64,
}

impl AtomicStats {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            frames_generated: self.frames_generated.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            datagrams_sent: self.datagrams_sent.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            sends_suppressed: self.sends_suppressed.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
        }
    }
}

/// Per-session state, rebuilt on every start
struct Runtime {
    composer: FrameComposer,
    framer: TransportFramer,
    preview: bool,
    running: bool,
}

struct Shared {
    config: SchedulerConfig,
    clock: SessionClock,
    device: Mutex<Box<dyn DeviceSession>>,
    runtime: Mutex<Option<Runtime>>,
    tick_guard: Mutex<()>,
    stats: AtomicStats,
    events: Receiver<MusicalEvent>,
    commands: Receiver<Command>,
}

struct TickThread {
    handle: JoinHandle<()>,
    stop: Sender<()>,
}

/// Drives the composer at a fixed rate and sends every frame
pub struct Scheduler {
    shared: Arc<Shared>,
    events: Sender<MusicalEvent>,
    commands: Sender<Command>,
    thread: Mutex<Option<TickThread>>,
}

impl Scheduler {
    /// Create a stopped scheduler for `device`
    pub fn new(config: SchedulerConfig, device: Box<dyn DeviceSession>) -> Self {
        let (events_tx, events_rx) = unbounded();
        let (commands_tx, commands_rx) = unbounded();
        Self {
            shared: Arc::new(Shared {
                config,
                clock: SessionClock::new(),
                device: Mutex::new(device),
                runtime: Mutex::new(None),
                tick_guard: Mutex::new(()),
                stats: AtomicStats::default(),
                events: events_rx,
                commands: commands_rx,
            }),
            events: events_tx,
            commands: commands_tx,
            thread: Mutex::new(None),
        }
    }

    /// Build the session and start ticking.
    ///
    /// The layout is derived from the device's string lengths while the
    /// device lock is held. If the strings do not cover the frame, the
    /// session starts in preview mode instead of failing.
    pub fn start(&self) -> Result<()> {
        let mut thread_slot = self.thread.lock();
        if thread_slot.is_some() {
            return Err(ControlError::InvalidState(
                "Scheduler is already running".to_string(),
            ));
        }

        let config = &self.shared.config;
        let runtime = {
            let device = self.shared.device.lock();
            let strings = device.string_lengths();
            let channels: usize = strings.iter().sum();
            let layout = config.layout.build(channels / 3)?;
            let mut preview = config.preview;
            if let Err(e) = TransportFramer::check_lengths(strings, layout.frame_len()) {
                warn!("{}; running in preview mode", e);
                preview = true;
            }
            let composer =
                FrameComposer::new(config.composer.clone(), layout, config.mode, self.shared.clock.now());
            Runtime {
                composer,
                framer: TransportFramer::new(config.protocol),
                preview,
                running: true,
            }
        };
        let preview = runtime.preview;
        *self.shared.runtime.lock() = Some(runtime);

        let (stop_tx, stop_rx) = bounded(1);
        let shared = self.shared.clone();
        let interval = config.tick_interval;
        let handle = thread::Builder::new()
            .name("ledflow-tick".to_string())
            .spawn(move || run_loop(&shared, interval, &stop_rx))?;
        *thread_slot = Some(TickThread {
            handle,
            stop: stop_tx,
        });

        info!(
            "Scheduler started: {:?} interval, mode {}, preview {}",
            interval, config.mode, preview
        );
        Ok(())
    }

    /// Stop ticking.
    ///
    /// Waits for an in-flight tick to finish, then resets idle tracking so
    /// the show reads as infinitely idle. The last frame stays readable.
    pub fn stop(&self) {
        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        let _ = thread.stop.send(());
        if thread.handle.join().is_err() {
            warn!("Tick thread panicked");
        }

        let _guard = self.shared.tick_guard.lock();
        if let Some(runtime) = self.shared.runtime.lock().as_mut() {
            runtime.composer.reset_idle();
            runtime.running = false;
        }
        info!("Scheduler stopped");
    }

    /// True between `start` and `stop`
    pub fn is_running(&self) -> bool {
        self.thread.lock().is_some()
    }

    /// Run one tick now on the calling thread.
    ///
    /// Returns false if the tick was skipped (another tick in flight, or
    /// the scheduler is stopped).
    pub fn tick_now(&self) -> bool {
        tick(&self.shared)
    }

    /// Switch mode at the next tick
    pub fn set_mode(&self, mode: Mode) {
        let _ = self.commands.send(Command::SetMode(mode));
    }

    /// Queue a manual command
    pub fn command(&self, command: Command) {
        let _ = self.commands.send(command);
    }

    /// Channel for musical events, e.g. for the MIDI input thread
    pub fn event_sender(&self) -> Sender<MusicalEvent> {
        self.events.clone()
    }

    /// Clock that event timestamps must be taken from
    pub fn clock(&self) -> SessionClock {
        self.shared.clock
    }

    /// Counters so far
    pub fn stats(&self) -> SchedulerStats {
        self.shared.stats.snapshot()
    }

    /// Copy of the most recent frame, if a session was started
    pub fn frame_snapshot(&self) -> Option<Vec<u8>> {
        self.shared
            .runtime
            .lock()
            .as_ref()
            .map(|rt| rt.composer.frame().as_bytes().to_vec())
    }

    /// True if frames are rendered but not sent
    pub fn is_preview(&self) -> bool {
        self.shared
            .runtime
            .lock()
            .as_ref()
            .map(|rt| rt.preview)
            .unwrap_or(self.shared.config.preview)
    }

    /// Active mode of the current session
    pub fn mode(&self) -> Option<Mode> {
        self.shared
            .runtime
            .lock()
            .as_ref()
            .map(|rt| rt.composer.mode())
    }

    /// Seconds since the last note, as seen by the current session
    pub fn music_idle_time(&self) -> Option<f64> {
        let now = self.shared.clock.now();
        self.shared
            .runtime
            .lock()
            .as_ref()
            .map(|rt| rt.composer.music().idle_time(now))
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(shared: &Shared, interval: Duration, stop: &Receiver<()>) {
    debug!("Tick thread started");
    let ticker = crossbeam_channel::tick(interval);
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => {
                tick(shared);
            }
        }
    }
    debug!("Tick thread stopped");
}

fn tick(shared: &Shared) -> bool {
    let Some(_guard) = shared.tick_guard.try_lock() else {
        shared.stats.ticks_skipped.fetch_add(1, Ordering::Relaxed);
        return false;
    };
    let mut runtime = shared.runtime.lock();
    let Some(rt) = runtime.as_mut().filter(|rt| rt.running) else {
        return false;
    };

    let instant = Instant::now();
    let now = shared.clock.seconds_at(instant);

    for command in shared.commands.try_iter() {
        match command {
            Command::SetMode(mode) => rt.composer.set_mode(mode, now),
            Command::Touch => rt.composer.touch(now),
        }
    }
    for event in shared.events.try_iter() {
        rt.composer.apply_event(event);
    }

    let frame = rt.composer.tick(now);
    shared.stats.frames_generated.fetch_add(1, Ordering::Relaxed);
    if rt.preview {
        return true;
    }

    let mut device = shared.device.lock();
    match rt.framer.send(device.as_mut(), frame, instant) {
        Ok(SendOutcome::Sent { datagrams, .. }) => {
            shared.stats.frames_sent.fetch_add(1, Ordering::Relaxed);
            shared
                .stats
                .datagrams_sent
                .fetch_add(datagrams as u64, Ordering::Relaxed);
        }
        Ok(SendOutcome::NoToken) => {
            shared.stats.sends_suppressed.fetch_add(1, Ordering::Relaxed);
        }
        Err(e @ ControlError::ConfigMismatch { .. }) => {
            warn!("{}; switching to preview mode", e);
            rt.preview = true;
        }
        Err(e) => {
            shared.stats.send_errors.fetch_add(1, Ordering::Relaxed);
            warn!("Frame send failed: {}", e);
        }
    }
    true
}
