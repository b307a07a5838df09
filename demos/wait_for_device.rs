//! Wait for a simulated Myo to pair, then query it.
//!
//! Usage: cargo run --example wait_for_device

use myo::sim::SimEngine;
use myo::{Hub, HubConfig, Listener, UnlockType};
use std::thread;
use std::time::Duration;

fn main() {
    env_logger::init();

    let engine = SimEngine::new();
    let remote = engine.remote();

    let hub = match Hub::with_config(HubConfig::from_env("com.example.wait-for-device"), engine) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Failed to create hub: {}", e);
            std::process::exit(1);
        }
    };

    let listener = Listener::new()
        .on_connect(|myo, _, firmware| {
            println!("Connected {:?}  firmware {}", myo, firmware);
            Ok(())
        })
        .on_rssi(|_, _, rssi| {
            println!("RSSI:     {} dBm", rssi);
            Ok(())
        })
        .on_battery_level(|_, _, level| {
            println!("Battery:  {}%", level);
            Ok(())
        });
    if let Err(e) = hub.add_listener(listener) {
        eprintln!("Failed to add listener: {}", e);
        std::process::exit(1);
    }

    // Pair a device shortly after we start waiting.
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        let device = remote.pair();
        remote.set_battery(device, 87);
        remote.set_rssi(device, -61);
    });

    println!("Waiting for a Myo (10s)...");
    let myo = match hub.wait_for_device(Duration::from_secs(10)) {
        Ok(Some(myo)) => myo,
        Ok(None) => {
            eprintln!("No Myo found");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("Found:    {:?}", myo);

    let queries = myo
        .request_rssi()
        .and_then(|_| myo.request_battery_level())
        .and_then(|_| myo.unlock(UnlockType::Hold));
    if let Err(e) = queries {
        eprintln!("Command failed: {}", e);
    }

    if let Err(e) = hub.run(Duration::from_millis(100)) {
        eprintln!("Error: {}", e);
    }
    if let Err(e) = hub.release() {
        eprintln!("Failed to release hub: {}", e);
    }
}
