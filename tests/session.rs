use myo::sim::{BoundaryCall, SimEngine};
use myo::{
    Arm, Capabilities, DeviceCommand, EventPayload, Hub, HubConfig, LockingPolicy, Listener,
    Myo, MyoError, Pose, Quaternion, UnlockType, Vector3, WarmupState, XDirection,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_pose_listener_scenario() {
    init_logging();
    let engine = SimEngine::new();
    let remote = engine.remote();
    let hub = Hub::new("com.example.app", engine).unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    hub.add_listener(Listener::new().on_pose(move |myo, ts, pose| {
        sink.lock().unwrap().push((myo.clone(), ts, pose));
        Ok(())
    }))
    .unwrap();

    let device = remote.attach();
    let emitted_at = remote.emit(device, EventPayload::Pose(Pose::Fist));
    hub.run_once(Duration::from_millis(100)).unwrap();

    {
        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let (myo, ts, pose) = &received[0];
        assert_eq!(myo.token(), device);
        assert_eq!(*pose, Pose::Fist);
        assert!(*ts >= emitted_at);
    }

    hub.release().unwrap();
    assert!(hub.is_released());
    assert!(matches!(
        hub.set_locking_policy(LockingPolicy::Standard),
        Err(MyoError::Released)
    ));
}

#[test]
fn test_handles_for_same_device_compare_equal() {
    init_logging();
    let engine = SimEngine::new();
    let remote = engine.remote();
    let hub = Hub::new("com.example.app", engine).unwrap();

    let seen: Arc<Mutex<Vec<Myo>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    hub.add_listener(Listener::new().on_lock(move |myo, _| {
        sink.lock().unwrap().push(myo.clone());
        Ok(())
    }))
    .unwrap();

    let first = remote.pair();
    let second = remote.pair();
    let waited = hub.wait_for_device(Duration::from_millis(200)).unwrap().unwrap();
    assert_eq!(waited.token(), first);

    remote.emit(first, EventPayload::Locked);
    remote.emit(second, EventPayload::Locked);
    remote.emit(first, EventPayload::Locked);
    hub.run(Duration::ZERO).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], seen[2]);
    assert_ne!(seen[0], seen[1]);
    assert_eq!(seen[0], waited);
}

#[test]
fn test_motion_payloads_reach_handlers() {
    init_logging();
    let engine = SimEngine::new();
    let remote = engine.remote();
    let hub = Hub::new("com.example.motion", engine).unwrap();

    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let (a, b, c) = (log.clone(), log.clone(), log.clone());
    hub.add_listener(
        Listener::new()
            .on_orientation(move |_, _, q| {
                a.lock().unwrap().push(format!("yaw={:.3}", q.to_euler()[2]));
                Ok(())
            })
            .on_accelerometer(move |_, _, v| {
                b.lock().unwrap().push(format!("accel={:.1}", v.magnitude()));
                Ok(())
            })
            .on_arm_sync(move |_, _, sync| {
                c.lock()
                    .unwrap()
                    .push(format!("{:?}/{:?}/{:?}", sync.arm, sync.x_direction, sync.warmup_state));
                Ok(())
            }),
    )
    .unwrap();

    let myo = remote.attach();
    remote.emit(
        myo,
        EventPayload::Orientation(Quaternion::from_axis_angle(&Vector3::Z, 0.25)),
    );
    remote.emit(myo, EventPayload::Accelerometer(Vector3::new(0.0, 0.0, 1.0)));
    remote.emit(myo, EventPayload::Gyroscope(Vector3::new(5.0, 0.0, 0.0)));
    remote.emit(
        myo,
        EventPayload::ArmSynced {
            arm: Arm::Left,
            x_direction: XDirection::TowardElbow,
            rotation: 0.1,
            warmup_state: WarmupState::Cold,
        },
    );
    hub.run(Duration::ZERO).unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "yaw=0.250".to_string(),
            "accel=1.0".to_string(),
            "Left/TowardElbow/Cold".to_string(),
        ]
    );
}

#[test]
fn test_device_requests_round_trip() {
    init_logging();
    let engine = SimEngine::new();
    let remote = engine.remote();
    let probe = engine.probe();
    let hub = Hub::new("com.example.app", engine).unwrap();

    let levels = Arc::new(Mutex::new(Vec::new()));
    let sink = levels.clone();
    hub.add_listener(Listener::new().on_battery_level(move |_, _, level| {
        sink.lock().unwrap().push(level);
        Ok(())
    }))
    .unwrap();

    let token = remote.pair();
    let myo = hub.wait_for_device(Duration::from_millis(200)).unwrap().unwrap();
    assert_eq!(myo.token(), token);

    remote.set_battery(token, 73);
    myo.request_battery_level().unwrap();
    myo.unlock(UnlockType::Timed).unwrap();
    hub.run(Duration::ZERO).unwrap();

    assert_eq!(*levels.lock().unwrap(), vec![73]);
    assert_eq!(
        probe.commands(),
        vec![
            (token, DeviceCommand::RequestBatteryLevel),
            (token, DeviceCommand::Unlock(UnlockType::Timed)),
        ]
    );

    drop(hub);
    assert!(matches!(myo.request_rssi(), Err(MyoError::Released)));
    assert_eq!(probe.commands().len(), 2);
}

#[test]
fn test_teardown_destroys_every_adapter_before_hub() {
    init_logging();
    let engine = SimEngine::new();
    let probe = engine.probe();
    let config = HubConfig::new("com.example.app").with_locking_policy(LockingPolicy::Standard);
    let hub = Hub::with_config(config, engine).unwrap();

    for _ in 0..3 {
        hub.add_listener(Listener::new().on_pose(|_, _, _| Ok(())))
            .unwrap();
    }
    assert_eq!(probe.live_adapters(), 3);
    drop(hub);
    assert_eq!(probe.live_adapters(), 0);

    let calls = probe.calls();
    let shutdown_at = calls
        .iter()
        .position(|c| matches!(c, BoundaryCall::ShutdownHub(_)))
        .unwrap();
    let last_destroy = calls
        .iter()
        .rposition(|c| matches!(c, BoundaryCall::DestroyAdapter(_)))
        .unwrap();
    assert!(last_destroy < shutdown_at);
    assert_eq!(shutdown_at, calls.len() - 1);
}

#[test]
fn test_adapters_carry_listener_capabilities() {
    init_logging();
    let engine = SimEngine::new();
    let probe = engine.probe();
    let hub = Hub::new("com.example.app", engine).unwrap();

    hub.add_listener(
        Listener::new()
            .on_connect(|_, _, _| Ok(()))
            .on_rssi(|_, _, _| Ok(())),
    )
    .unwrap();

    assert!(probe.calls().iter().any(|c| matches!(
        c,
        BoundaryCall::CreateAdapter(_, caps) if *caps == (Capabilities::CONNECT | Capabilities::RSSI)
    )));
}

#[test]
fn test_concurrent_run_fails_fast() {
    init_logging();
    let engine = SimEngine::new();
    let hub = Arc::new(Hub::new("com.example.app", engine).unwrap());

    let runner = {
        let hub = hub.clone();
        thread::spawn(move || hub.run(Duration::from_millis(500)))
    };

    // Give the runner time to enter the engine loop.
    thread::sleep(Duration::from_millis(100));
    assert!(matches!(
        hub.wait_for_device(Duration::from_millis(1)),
        Err(MyoError::ConcurrentUse)
    ));
    assert!(matches!(hub.release(), Err(MyoError::ConcurrentUse)));

    runner.join().unwrap().unwrap();
    hub.release().unwrap();
}

#[test]
fn test_events_injected_from_another_thread() {
    init_logging();
    let engine = SimEngine::new();
    let remote = engine.remote();
    let hub = Hub::new("com.example.app", engine).unwrap();

    let count = Arc::new(Mutex::new(0usize));
    let sink = count.clone();
    hub.add_listener(Listener::new().on_gyroscope(move |_, _, _| {
        *sink.lock().unwrap() += 1;
        Ok(())
    }))
    .unwrap();

    let producer = thread::spawn(move || {
        let myo = remote.attach();
        for i in 0..10 {
            remote.emit(myo, EventPayload::Gyroscope(Vector3::new(i as f64, 0.0, 0.0)));
        }
    });
    producer.join().unwrap();

    hub.run(Duration::from_millis(20)).unwrap();
    assert_eq!(*count.lock().unwrap(), 10);
}

#[test]
fn test_out_of_order_timestamps_are_clamped() {
    init_logging();
    let engine = SimEngine::new();
    let remote = engine.remote();
    let hub = Hub::new("com.example.app", engine).unwrap();

    let stamps = Arc::new(Mutex::new(Vec::new()));
    let sink = stamps.clone();
    hub.add_listener(Listener::new().on_unlock(move |_, ts| {
        sink.lock().unwrap().push(ts);
        Ok(())
    }))
    .unwrap();

    let myo = remote.attach();
    remote.emit_at(myo, 500, EventPayload::Unlocked);
    remote.emit_at(myo, 100, EventPayload::Unlocked);
    remote.emit_at(myo, 900, EventPayload::Unlocked);
    hub.run(Duration::ZERO).unwrap();

    assert_eq!(*stamps.lock().unwrap(), vec![500, 500, 900]);
}
