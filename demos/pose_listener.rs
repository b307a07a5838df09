//! Print poses and orientation from a simulated Myo.
//!
//! Usage: cargo run --example pose_listener
//! A background thread plays a short gesture script; the demo exits when it ends.

use myo::sim::SimEngine;
use myo::{EventPayload, Hub, HubConfig, Listener, Pose, Quaternion, Vector3, VibrationType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const SCRIPT: [Pose; 6] = [
    Pose::Rest,
    Pose::Fist,
    Pose::WaveIn,
    Pose::WaveOut,
    Pose::FingersSpread,
    Pose::DoubleTap,
];

fn main() {
    env_logger::init();

    let engine = SimEngine::new();
    let remote = engine.remote();
    let config = HubConfig::from_env("com.example.pose-listener");

    let hub = match Hub::with_config(config, engine) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Failed to create hub: {}", e);
            std::process::exit(1);
        }
    };

    let orientations = Arc::new(AtomicU64::new(0));
    let counter = orientations.clone();
    let listener = Listener::new()
        .on_pair(|myo, _, firmware| {
            println!("Paired {:?} (firmware {})", myo, firmware);
            Ok(())
        })
        .on_pose(|myo, ts, pose| {
            println!("ts={:<12}  pose={}", ts, pose);
            if pose != Pose::Rest {
                myo.vibrate(VibrationType::Short)?;
            }
            Ok(())
        })
        .on_orientation(move |_, _, q| {
            // Print every ~20th sample to avoid flooding the terminal
            if counter.fetch_add(1, Ordering::Relaxed) % 20 == 0 {
                let [roll, pitch, yaw] = q.to_euler();
                println!(
                    "roll={:+.3}  pitch={:+.3}  yaw={:+.3}",
                    roll, pitch, yaw
                );
            }
            Ok(())
        });

    if let Err(e) = hub.add_listener(listener) {
        eprintln!("Failed to add listener: {}", e);
        std::process::exit(1);
    }

    let player = thread::spawn(move || {
        let device = remote.pair();
        for (i, pose) in SCRIPT.iter().enumerate() {
            for step in 0..20 {
                let angle = (i * 20 + step) as f64 * 0.02;
                remote.emit(
                    device,
                    EventPayload::Orientation(Quaternion::from_axis_angle(&Vector3::Z, angle)),
                );
                thread::sleep(Duration::from_millis(5));
            }
            remote.emit(device, EventPayload::Pose(*pose));
        }
    });

    let start = Instant::now();
    while !player.is_finished() {
        if let Err(e) = hub.run(Duration::from_millis(50)) {
            eprintln!("Error: {}", e);
            break;
        }
    }
    if let Err(e) = hub.run(Duration::ZERO) {
        eprintln!("Error: {}", e);
    }

    println!(
        "\nTotal: {} orientation samples in {:.1}s",
        orientations.load(Ordering::Relaxed),
        start.elapsed().as_secs_f64()
    );

    if let Err(e) = hub.release() {
        eprintln!("Failed to release hub: {}", e);
    }
}
