use eddy::{
    engine_pair, Controller, EngineConfig, LoopState, MixEngine, TriggerEvent, TriggerKind,
    TriggerMap,
};

fn setup(loops: usize) -> (MixEngine, Controller) {
    let config = EngineConfig::default()
        .with_loop_count(loops)
        .with_loop_capacity(8)
        .with_period_size(1)
        .with_loopback(false);
    engine_pair(&config).unwrap()
}

#[test]
fn press_records_release_plays() {
    let (_engine, controller) = setup(4);
    let keys = TriggerMap::identity();

    assert!(keys.apply(TriggerEvent::press(2), &controller));
    assert_eq!(controller.state(2), Some(LoopState::Recording));

    assert!(keys.apply(TriggerEvent::release(2), &controller));
    assert_eq!(controller.state(2), Some(LoopState::Playing));
}

#[test]
/// Auto-repeat events while a key is held change nothing
fn repeats_are_ignored() {
    let (_engine, controller) = setup(4);
    let keys = TriggerMap::identity();

    keys.apply(TriggerEvent::press(1), &controller);
    assert!(!keys.apply(TriggerEvent::press(1).repeated(), &controller));
    assert!(!keys.apply(TriggerEvent::release(1).repeated(), &controller));
    assert_eq!(controller.state(1), Some(LoopState::Recording));
}

#[test]
/// Codes past the last loop are dropped, including the one equal to the loop count
fn unknown_codes_are_ignored() {
    let (_engine, controller) = setup(4);
    let keys = TriggerMap::identity();

    assert!(!keys.apply(TriggerEvent::press(4), &controller));
    assert!(!keys.apply(TriggerEvent::press(u32::MAX), &controller));
    for i in 0..4 {
        assert_eq!(controller.state(i), Some(LoopState::Playing));
    }
}

#[test]
fn explicit_bindings() {
    let (_engine, controller) = setup(3);
    // Home-row style layout: codes 30, 31, 32 drive loops 0, 1, 2
    let keys = TriggerMap::from_codes(&[30, 31, 32]).bind(44, 0);

    assert_eq!(keys.resolve(31), Some(1));
    assert_eq!(keys.resolve(44), Some(0));
    assert_eq!(keys.resolve(0), None);

    assert!(keys.apply(TriggerEvent::press(32), &controller));
    assert_eq!(controller.state(2), Some(LoopState::Recording));
    assert!(!keys.apply(TriggerEvent::press(2), &controller));
}

#[test]
fn rebinding_replaces_previous_target() {
    let keys = TriggerMap::identity().bind(7, 1).bind(7, 2);
    assert_eq!(keys.resolve(7), Some(2));
    // Binding switches off the identity map
    assert_eq!(keys.resolve(1), None);
}

#[test]
fn event_constructors() {
    let press = TriggerEvent::press(5);
    assert_eq!(press.kind, TriggerKind::Press);
    assert!(!press.repeat);
    assert_eq!(press.requested_state(), LoopState::Recording);

    let release = TriggerEvent::release(5).repeated();
    assert_eq!(release.kind, TriggerKind::Release);
    assert!(release.repeat);
    assert_eq!(release.requested_state(), LoopState::Playing);
}

#[test]
/// Holding a key for a few periods records exactly those periods
fn held_key_records() {
    let (mut engine, controller) = setup(2);
    let keys = TriggerMap::identity();

    keys.apply(TriggerEvent::press(0), &controller);
    for x in [0.5, -0.5, 0.25] {
        engine.process(&[x]);
    }
    keys.apply(TriggerEvent::press(0).repeated(), &controller);
    engine.process(&[0.125]);
    keys.apply(TriggerEvent::release(0), &controller);

    let mut buffer = Vec::new();
    controller.copy_samples(0, &mut buffer);
    assert_eq!(buffer[..4], [0.5, -0.5, 0.25, 0.125]);
    assert!(buffer[4..].iter().all(|&s| s == 0.0));
}
