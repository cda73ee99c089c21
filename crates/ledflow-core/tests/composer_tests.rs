use ledflow_core::{
    ComposerConfig, Coordinate, FrameComposer, Layout, Mode, MusicalEvent,
};

fn config(idle_timeout_secs: f64) -> ComposerConfig {
    ComposerConfig {
        idle_timeout_secs,
        seed: Some(5),
        ..Default::default()
    }
}

fn layouts() -> Vec<Layout> {
    vec![
        Layout::empty(),
        Layout::strip(1),
        Layout::strip(37),
        Layout::grid(24, 300),
        Layout::grid(7, 50),
        Layout::new(vec![
            Coordinate::new(0.0, 0.0, 0.0),
            Coordinate::new(1.0, 2.0, 3.0),
            Coordinate::new(2.0, 1.0, 11.0),
            Coordinate::new(-4.0, 0.5, 1.0),
        ])
        .unwrap(),
    ]
}

#[test]
fn test_frame_size_for_every_mode_and_layout() {
    for layout in layouts() {
        let expected = layout.len() * 3;
        for mode in Mode::ALL {
            let mut composer = FrameComposer::new(config(30.0), layout.clone(), mode, 0.0);
            for tick in 0..40 {
                let now = tick as f64 * 0.05;
                if tick == 10 {
                    composer.apply_event(MusicalEvent::NoteOn {
                        pitch: 64,
                        velocity: 0.9,
                        time: now,
                    });
                    composer.apply_event(MusicalEvent::NoteOn {
                        pitch: 40,
                        velocity: 0.7,
                        time: now,
                    });
                }
                let len = composer.tick(now).len();
                assert_eq!(len, expected, "mode {} layout {}", mode, layout.len());
            }
            assert_eq!(composer.frame_count(), 40);
        }
    }
}

#[test]
fn test_mode_switch_keeps_frame_size() {
    let layout = Layout::grid(10, 95);
    let mut composer = FrameComposer::new(config(30.0), layout, Mode::Walker, 0.0);
    for (i, mode) in Mode::ALL.iter().cycle().take(30).enumerate() {
        composer.set_mode(*mode, i as f64 * 0.1);
        assert_eq!(composer.tick(i as f64 * 0.1).len(), 285);
    }
}

#[test]
fn test_idle_event_fires_once_per_timeout() {
    let mut composer = FrameComposer::new(config(5.0), Layout::strip(10), Mode::Ambient, 0.0);
    for tick in 0..98 {
        composer.tick(tick as f64 * 0.05);
    }
    assert_eq!(composer.idle_events(), 0);
    composer.tick(5.1);
    assert_eq!(composer.idle_events(), 1);

    for tick in 103..200 {
        composer.tick(tick as f64 * 0.05);
    }
    assert_eq!(composer.idle_events(), 1);

    composer.tick(10.2);
    assert_eq!(composer.idle_events(), 2);
}

#[test]
fn test_notes_postpone_idle_events() {
    let mut composer = FrameComposer::new(config(5.0), Layout::strip(10), Mode::Ripple, 0.0);
    composer.apply_event(MusicalEvent::NoteOn {
        pitch: 60,
        velocity: 1.0,
        time: 3.0,
    });
    composer.apply_event(MusicalEvent::NoteOff {
        pitch: 60,
        time: 4.0,
    });
    composer.tick(8.5);
    assert_eq!(composer.idle_events(), 0);
    composer.tick(9.0);
    assert_eq!(composer.idle_events(), 1);
}

#[test]
fn test_reset_idle_is_infinitely_idle() {
    let mut composer = FrameComposer::new(config(5.0), Layout::strip(4), Mode::Trinity, 0.0);
    composer.apply_event(MusicalEvent::NoteOn {
        pitch: 60,
        velocity: 1.0,
        time: 0.5,
    });
    composer.reset_idle();
    assert!(composer.music().idle_time(1.0).is_infinite());
    composer.tick(1.0);
    assert_eq!(composer.idle_events(), 1);
}

#[test]
fn test_seeded_composers_are_reproducible() {
    let run = || {
        let mut composer =
            FrameComposer::new(config(2.0), Layout::grid(8, 64), Mode::Walker, 0.0);
        let mut last = Vec::new();
        for tick in 0..200 {
            last = composer.tick(tick as f64 * 0.05).to_vec();
        }
        last
    };
    assert_eq!(run(), run());
}
