//! # myo - Rust SDK for the Myo armband
//!
//! Session and event-dispatch layer over the Myo engine. Provides:
//! - [`Hub`] sessions that own an engine handle and drive its event loop
//! - [`Listener`] handler sets, dispatched only for the events they handle
//! - [`Myo`] device handles for vibration, locking, EMG streaming and queries
//! - [`Vector3`] / [`Quaternion`] value types for motion events
//!
//! The engine itself (radio transport, pose classification) sits behind the
//! [`Engine`] trait. [`sim::SimEngine`] is an in-process implementation for
//! tests and demos.
//!
//! ## Quick Start
//! ```no_run
//! use myo::sim::SimEngine;
//! use myo::{Hub, Listener, VibrationType};
//! use std::time::Duration;
//!
//! let hub = Hub::new("com.example.hello-myo", SimEngine::new()).unwrap();
//! let myo = hub.wait_for_device(Duration::from_secs(10)).unwrap().unwrap();
//! myo.vibrate(VibrationType::Short).unwrap();
//!
//! hub.add_listener(Listener::new().on_pose(|_, ts, pose| {
//!     println!("{} {}", ts, pose);
//!     Ok(())
//! }))
//! .unwrap();
//!
//! loop {
//!     hub.run(Duration::from_millis(50)).unwrap();
//! }
//! ```

pub mod error;
pub mod types;
pub mod geometry;
pub mod app_id;
pub mod config;
pub mod engine;
pub mod listener;
mod bridge;
pub mod device;
pub mod hub;
pub mod sim;

pub use config::HubConfig;
pub use device::Myo;
pub use engine::{
    AdapterId, CommandPort, DeviceCommand, DeviceToken, Engine, EngineError, Event, EventPayload,
    Flow, HubHandle, RunMode,
};
pub use error::{HandlerError, MyoError};
pub use geometry::{Quaternion, Vector3};
pub use hub::Hub;
pub use listener::{ArmSync, HandlerResult, Listener, ListenerId};
pub use types::*;

/// Result type alias for myo operations.
pub type Result<T> = std::result::Result<T, MyoError>;
