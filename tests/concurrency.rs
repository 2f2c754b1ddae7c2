use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use eddy::{engine_pair, EngineConfig, LoopState, MixEngine};

const PERIOD: usize = 16;

/// Run `engine` on its own thread, feeding a constant input, until `stop` is set.
fn spawn_audio(
    mut engine: MixEngine,
    input: f32,
    stop: Arc<AtomicBool>,
    periods: Arc<AtomicU64>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let samples = vec![input; engine.period_size()];
        while !stop.load(Ordering::Relaxed) {
            engine.process(&samples);
            periods.fetch_add(1, Ordering::Release);
            thread::yield_now();
        }
    })
}

fn wait_for_periods(periods: &AtomicU64, from: u64, count: u64) {
    while periods.load(Ordering::Acquire) < from + count {
        thread::sleep(Duration::from_micros(50));
    }
}

#[test]
/// A state change made while the audio thread runs takes effect by the next period
fn state_change_is_seen_by_next_period() {
    let config = EngineConfig::default()
        .with_loop_count(2)
        .with_loop_capacity(PERIOD * 64)
        .with_period_size(PERIOD)
        .with_loopback(false);
    let (engine, controller) = engine_pair(&config).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let periods = Arc::new(AtomicU64::new(0));
    let audio = spawn_audio(engine, 1.0, stop.clone(), periods.clone());

    controller.set_state(0, LoopState::Recording);
    let requested_at = periods.load(Ordering::Acquire);
    // The period in flight may miss the change; the one after cannot
    wait_for_periods(&periods, requested_at, 2);
    controller.set_state(0, LoopState::Playing);

    stop.store(true, Ordering::Relaxed);
    audio.join().unwrap();

    let mut buffer = Vec::new();
    controller.copy_samples(0, &mut buffer);
    let recorded = buffer.iter().filter(|&&s| s == 1.0).count();
    assert!(recorded >= PERIOD, "recorded {} samples", recorded);
    assert_eq!(recorded % PERIOD, 0, "recording must cover whole periods");

    // Loop 1 was never touched
    controller.copy_samples(1, &mut buffer);
    assert!(buffer.iter().all(|&s| s == 0.0));
}

#[test]
/// Snapshots never observe a half-processed period
fn snapshots_see_whole_periods() {
    let config = EngineConfig::default()
        .with_loop_count(4)
        .with_loop_capacity(PERIOD * 32)
        .with_period_size(PERIOD)
        .with_loopback(false);
    let (engine, controller) = engine_pair(&config).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let periods = Arc::new(AtomicU64::new(0));
    let audio = spawn_audio(engine, 0.5, stop.clone(), periods.clone());

    let mut snaps = Vec::new();
    for i in 0..2000 {
        let state = if i % 3 == 0 {
            LoopState::Recording
        } else {
            LoopState::Playing
        };
        controller.set_state(i % 4, state);
        controller.snapshot_all(&mut snaps);

        let cursor = snaps[0].cursor;
        for snap in &snaps {
            assert_eq!(snap.cursor % PERIOD, 0);
            // Every loop advances together, so one lock acquisition sees one cursor
            assert_eq!(snap.cursor, cursor);
        }
    }

    stop.store(true, Ordering::Relaxed);
    audio.join().unwrap();
}

#[test]
/// Garbage trigger indices from the control side never disturb the audio side
fn hostile_indices_while_running() {
    let config = EngineConfig::default()
        .with_loop_count(8)
        .with_loop_capacity(PERIOD * 8)
        .with_period_size(PERIOD);
    let (engine, controller) = engine_pair(&config).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let periods = Arc::new(AtomicU64::new(0));
    let audio = spawn_audio(engine, 0.1, stop.clone(), periods.clone());

    let controllers: Vec<_> = (0..4)
        .map(|t| {
            let controller = controller.clone();
            thread::spawn(move || {
                for i in 0..500usize {
                    let index = (i * 7 + t * 13) % 64;
                    controller.set_state(index, LoopState::Recording);
                    controller.set_state(index, LoopState::Playing);
                    controller.set_state(usize::MAX - i, LoopState::Recording);
                    let _ = controller.snapshot(index);
                }
            })
        })
        .collect();
    for handle in controllers {
        handle.join().unwrap();
    }

    let seen = periods.load(Ordering::Acquire);
    wait_for_periods(&periods, seen, 1);
    stop.store(true, Ordering::Relaxed);
    audio.join().unwrap();

    for i in 0..8 {
        assert_eq!(controller.state(i), Some(LoopState::Playing));
    }
}
