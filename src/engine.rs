//! Boundary to the native engine.
//!
//! The engine owns radio transport, device enumeration and pose
//! classification. This crate only reaches it through [`Engine`] (hub
//! lifecycle and event draining) and [`CommandPort`] (per-device commands).
//! Handles crossing the boundary are opaque tokens minted by the engine.

use crate::geometry::{Quaternion, Vector3};
use crate::types::{
    Arm, Capabilities, EmgFrame, FirmwareVersion, LockingPolicy, Pose, StreamEmg, UnlockType,
    VibrationType, WarmupResult, WarmupState, XDirection,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Errors raised on the engine side of the boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid hub handle {0:?}")]
    InvalidHandle(HubHandle),

    #[error("Unknown listener adapter {0:?}")]
    UnknownAdapter(AdapterId),

    #[error("Unknown device {0:?}")]
    UnknownDevice(DeviceToken),

    #[error("Engine failure: {0}")]
    Backend(String),
}

/// Opaque handle to an allocated engine hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HubHandle(u64);

impl HubHandle {
    pub fn from_raw(raw: u64) -> Self {
        HubHandle(raw)
    }
}

/// Opaque handle to a listener adapter installed in an engine hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdapterId(u64);

impl AdapterId {
    pub fn from_raw(raw: u64) -> Self {
        AdapterId(raw)
    }
}

/// Engine-side identity of one physical device.
///
/// Only comparable and hashable; it carries no meaning outside the engine
/// that minted it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceToken(u64);

impl DeviceToken {
    pub fn from_raw(raw: u64) -> Self {
        DeviceToken(raw)
    }
}

impl fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceToken({:#x})", self.0)
    }
}

/// Event payloads raised by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Paired(FirmwareVersion),
    Unpaired,
    Connected(FirmwareVersion),
    Disconnected,
    ArmSynced {
        arm: Arm,
        x_direction: XDirection,
        /// Estimated rotation of the Myo on the arm, in radians.
        rotation: f32,
        warmup_state: WarmupState,
    },
    ArmUnsynced,
    Locked,
    Unlocked,
    Pose(Pose),
    Orientation(Quaternion),
    /// Acceleration in g.
    Accelerometer(Vector3),
    /// Angular velocity in deg/s.
    Gyroscope(Vector3),
    Rssi(i8),
    /// Battery percentage, 0..=100.
    BatteryLevel(u8),
    Emg(EmgFrame),
    WarmupCompleted(WarmupResult),
}

impl EventPayload {
    /// The single capability bit a listener needs to receive this payload.
    pub fn capability(&self) -> Capabilities {
        match self {
            EventPayload::Paired(_) => Capabilities::PAIR,
            EventPayload::Unpaired => Capabilities::UNPAIR,
            EventPayload::Connected(_) => Capabilities::CONNECT,
            EventPayload::Disconnected => Capabilities::DISCONNECT,
            EventPayload::ArmSynced { .. } => Capabilities::ARM_SYNC,
            EventPayload::ArmUnsynced => Capabilities::ARM_UNSYNC,
            EventPayload::Locked => Capabilities::LOCK,
            EventPayload::Unlocked => Capabilities::UNLOCK,
            EventPayload::Pose(_) => Capabilities::POSE,
            EventPayload::Orientation(_) => Capabilities::ORIENTATION,
            EventPayload::Accelerometer(_) => Capabilities::ACCELEROMETER,
            EventPayload::Gyroscope(_) => Capabilities::GYROSCOPE,
            EventPayload::Rssi(_) => Capabilities::RSSI,
            EventPayload::BatteryLevel(_) => Capabilities::BATTERY_LEVEL,
            EventPayload::Emg(_) => Capabilities::EMG,
            EventPayload::WarmupCompleted(_) => Capabilities::WARMUP_COMPLETED,
        }
    }
}

/// One engine event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub device: DeviceToken,
    /// Microseconds since an unspecified epoch; non-decreasing.
    pub timestamp_us: u64,
    pub payload: EventPayload,
}

/// How long a run call keeps draining events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Process every event that arrives within the duration.
    All,
    /// Return after the first processed event, or when the duration elapses.
    Once,
}

/// Handler verdict returned to the engine for each delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Abort the current dispatch pass; the engine returns from run immediately.
    Stop,
}

/// Event handler passed into [`Engine::run`] and [`Engine::wait_for_device`].
pub type EventHandler<'a> = dyn FnMut(AdapterId, &Event) -> Flow + 'a;

/// Per-device commands with their boundary codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Vibrate(VibrationType),
    RequestRssi,
    RequestBatteryLevel,
    Unlock(UnlockType),
    Lock,
    NotifyUserAction,
    SetStreamEmg(StreamEmg),
}

impl DeviceCommand {
    /// Numeric argument code for commands that take one, for engines
    /// backed by a C library.
    pub fn code(&self) -> Option<u8> {
        match self {
            DeviceCommand::Vibrate(t) => Some(*t as u8),
            DeviceCommand::Unlock(t) => Some(*t as u8),
            DeviceCommand::SetStreamEmg(s) => Some(*s as u8),
            DeviceCommand::RequestRssi
            | DeviceCommand::RequestBatteryLevel
            | DeviceCommand::Lock
            | DeviceCommand::NotifyUserAction => None,
        }
    }
}

/// Command path into the engine, usable from inside event handlers.
pub trait CommandPort: Send + Sync {
    fn send(&self, device: DeviceToken, command: DeviceCommand) -> Result<(), EngineError>;
}

/// The native engine.
///
/// Calls are synchronous. `run` and `wait_for_device` block on the calling
/// thread and invoke `handler` there, once per (adapter, event) pair whose
/// adapter capability bitmap contains the event's capability bit.
pub trait Engine: Send {
    fn init_hub(&mut self, application_id: &str) -> Result<HubHandle, EngineError>;

    fn shutdown_hub(&mut self, hub: HubHandle) -> Result<(), EngineError>;

    fn set_locking_policy(&mut self, hub: HubHandle, policy: LockingPolicy)
        -> Result<(), EngineError>;

    fn run(
        &mut self,
        hub: HubHandle,
        duration: Duration,
        mode: RunMode,
        handler: &mut EventHandler<'_>,
    ) -> Result<(), EngineError>;

    /// Drain events until a device pairs. `None` timeout waits indefinitely.
    /// Returns `Ok(None)` on timeout or when `handler` stops the pass.
    fn wait_for_device(
        &mut self,
        hub: HubHandle,
        timeout: Option<Duration>,
        handler: &mut EventHandler<'_>,
    ) -> Result<Option<DeviceToken>, EngineError>;

    fn create_adapter(
        &mut self,
        hub: HubHandle,
        capabilities: Capabilities,
    ) -> Result<AdapterId, EngineError>;

    fn destroy_adapter(&mut self, hub: HubHandle, adapter: AdapterId) -> Result<(), EngineError>;

    /// Shared command path for devices of this engine.
    fn command_port(&self) -> Arc<dyn CommandPort>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_capability_is_single_bit() {
        let payloads = [
            EventPayload::Paired(FirmwareVersion::default()),
            EventPayload::Unpaired,
            EventPayload::Connected(FirmwareVersion::default()),
            EventPayload::Disconnected,
            EventPayload::ArmSynced {
                arm: Arm::Left,
                x_direction: XDirection::TowardWrist,
                rotation: 0.0,
                warmup_state: WarmupState::Warm,
            },
            EventPayload::ArmUnsynced,
            EventPayload::Locked,
            EventPayload::Unlocked,
            EventPayload::Pose(Pose::Fist),
            EventPayload::Orientation(Quaternion::IDENTITY),
            EventPayload::Accelerometer(Vector3::Z),
            EventPayload::Gyroscope(Vector3::ZERO),
            EventPayload::Rssi(-60),
            EventPayload::BatteryLevel(80),
            EventPayload::Emg([0; 8]),
            EventPayload::WarmupCompleted(WarmupResult::Success),
        ];
        let mut seen = Capabilities::empty();
        for p in &payloads {
            let cap = p.capability();
            assert_eq!(cap.bits().count_ones(), 1);
            assert!(!seen.contains(cap));
            seen |= cap;
        }
        assert_eq!(seen, Capabilities::all());
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(DeviceCommand::Vibrate(VibrationType::Long).code(), Some(2));
        assert_eq!(DeviceCommand::Unlock(UnlockType::Hold).code(), Some(1));
        assert_eq!(DeviceCommand::SetStreamEmg(StreamEmg::Enabled).code(), Some(1));
        assert_eq!(DeviceCommand::Lock.code(), None);
    }
}
