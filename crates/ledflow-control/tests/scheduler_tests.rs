//! Scheduler lifecycle against an in-memory device

use std::thread;
use std::time::Duration;

use ledflow_control::transport::parse_datagram;
use ledflow_control::{Command, MemorySession, Scheduler, SchedulerConfig};
use ledflow_core::{ComposerConfig, Mode, MusicalEvent};

fn config(interval_ms: u64) -> SchedulerConfig {
    SchedulerConfig {
        tick_interval: Duration::from_millis(interval_ms),
        composer: ComposerConfig {
            seed: Some(99),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_runs_until_stopped() {
    let session = MemorySession::new(vec![300, 300, 600]);
    let log = session.log();
    let scheduler = Scheduler::new(config(5), Box::new(session));
    scheduler.start().unwrap();
    thread::sleep(Duration::from_millis(150));
    scheduler.stop();

    let stats = scheduler.stats();
    assert!(stats.frames_generated > 0);
    assert_eq!(stats.frames_sent, stats.frames_generated);
    assert_eq!(stats.datagrams_sent, stats.frames_sent * 3);

    let sent = log.lock().clone();
    assert_eq!(sent.len() as u64, stats.datagrams_sent);
    for frame in sent.chunks(3) {
        let indices: Vec<u8> = frame
            .iter()
            .map(|p| parse_datagram(p).unwrap().fragment)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    // Nothing is sent after stop returns
    thread::sleep(Duration::from_millis(30));
    assert_eq!(log.lock().len() as u64, stats.datagrams_sent);
}

#[test]
fn test_restart_rebuilds_session() {
    let scheduler = Scheduler::new(config(5), Box::new(MemorySession::new(vec![60])));
    scheduler.start().unwrap();
    scheduler.set_mode(Mode::Ripple);
    thread::sleep(Duration::from_millis(50));
    scheduler.stop();
    assert_eq!(scheduler.mode(), Some(Mode::Ripple));

    scheduler.start().unwrap();
    assert_eq!(scheduler.mode(), Some(Mode::Walker));
    scheduler.stop();
}

#[test]
fn test_every_mode_runs_on_device() {
    let scheduler = Scheduler::new(config(3_600_000), Box::new(MemorySession::new(vec![90, 90])));
    scheduler.start().unwrap();
    for mode in Mode::ALL {
        scheduler.command(Command::SetMode(mode));
        assert!(scheduler.tick_now());
        assert_eq!(scheduler.mode(), Some(mode));
        assert_eq!(scheduler.frame_snapshot().map(|f| f.len()), Some(180));
    }
    assert_eq!(scheduler.stats().frames_sent, Mode::ALL.len() as u64);
    scheduler.stop();
}

#[test]
fn test_preview_config_never_sends() {
    let session = MemorySession::new(vec![30]);
    let log = session.log();
    let scheduler = Scheduler::new(
        SchedulerConfig {
            preview: true,
            ..config(3_600_000)
        },
        Box::new(session),
    );
    scheduler.start().unwrap();
    let time = scheduler.clock().now();
    scheduler
        .event_sender()
        .send(MusicalEvent::NoteOn {
            pitch: 36,
            velocity: 1.0,
            time,
        })
        .unwrap();
    assert!(scheduler.tick_now());
    assert!(scheduler.is_preview());
    assert_eq!(scheduler.stats().frames_generated, 1);
    assert!(log.lock().is_empty());
}

#[test]
fn test_drop_stops_thread() {
    let session = MemorySession::new(vec![30]);
    let log = session.log();
    {
        let scheduler = Scheduler::new(config(5), Box::new(session));
        scheduler.start().unwrap();
        thread::sleep(Duration::from_millis(30));
    }
    let count = log.lock().len();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(log.lock().len(), count);
}
