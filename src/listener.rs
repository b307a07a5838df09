//! Listener: a set of optional event handlers.
//!
//! Each handler slot is independent; a listener only pays for the events
//! whose slots are filled. [`Listener::capabilities`] reports which ones.
//!
//! ```
//! use myo::{Listener, Pose};
//!
//! let listener = Listener::new().on_pose(|myo, _ts, pose| {
//!     if pose == Pose::Fist {
//!         println!("fist on {:?}", myo.token());
//!     }
//!     Ok(())
//! });
//! assert_eq!(listener.capabilities(), myo::Capabilities::POSE);
//! ```

use crate::device::Myo;
use crate::error::HandlerError;
use crate::geometry::{Quaternion, Vector3};
use crate::types::{
    Arm, Capabilities, EmgFrame, FirmwareVersion, Pose, WarmupResult, WarmupState, XDirection,
};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Result returned by every handler. An error aborts the current dispatch pass.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Arm-sync details delivered to [`Listener::on_arm_sync`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmSync {
    pub arm: Arm,
    pub x_direction: XDirection,
    /// Estimated rotation of the Myo on the arm, in radians.
    pub rotation: f32,
    pub warmup_state: WarmupState,
}

/// Stable identity of a listener. Clones of a listener share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

type Slot<A> = Option<Arc<dyn Fn(&Myo, u64, A) -> HandlerResult + Send + Sync>>;
type BareSlot = Option<Arc<dyn Fn(&Myo, u64) -> HandlerResult + Send + Sync>>;

/// A set of optional event handlers registered with a [`crate::Hub`].
///
/// Handlers receive the device, the event timestamp in microseconds and the
/// payload. They run synchronously on the thread that drives the hub.
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    pub(crate) on_pair: Slot<FirmwareVersion>,
    pub(crate) on_unpair: BareSlot,
    pub(crate) on_connect: Slot<FirmwareVersion>,
    pub(crate) on_disconnect: BareSlot,
    pub(crate) on_arm_sync: Slot<ArmSync>,
    pub(crate) on_arm_unsync: BareSlot,
    pub(crate) on_lock: BareSlot,
    pub(crate) on_unlock: BareSlot,
    pub(crate) on_pose: Slot<Pose>,
    pub(crate) on_orientation: Slot<Quaternion>,
    pub(crate) on_accelerometer: Slot<Vector3>,
    pub(crate) on_gyroscope: Slot<Vector3>,
    pub(crate) on_rssi: Slot<i8>,
    pub(crate) on_battery_level: Slot<u8>,
    pub(crate) on_emg: Slot<EmgFrame>,
    pub(crate) on_warmup_completed: Slot<WarmupResult>,
}

impl Default for Listener {
    fn default() -> Self {
        Listener::new()
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

macro_rules! slot_setter {
    ($(#[$doc:meta])* $name:ident, $arg:ty) => {
        $(#[$doc])*
        pub fn $name<F>(mut self, handler: F) -> Self
        where
            F: Fn(&Myo, u64, $arg) -> HandlerResult + Send + Sync + 'static,
        {
            self.$name = Some(Arc::new(handler));
            self
        }
    };
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub fn $name<F>(mut self, handler: F) -> Self
        where
            F: Fn(&Myo, u64) -> HandlerResult + Send + Sync + 'static,
        {
            self.$name = Some(Arc::new(handler));
            self
        }
    };
}

impl Listener {
    /// An empty listener with a fresh identity.
    pub fn new() -> Self {
        Listener {
            id: ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed)),
            on_pair: None,
            on_unpair: None,
            on_connect: None,
            on_disconnect: None,
            on_arm_sync: None,
            on_arm_unsync: None,
            on_lock: None,
            on_unlock: None,
            on_pose: None,
            on_orientation: None,
            on_accelerometer: None,
            on_gyroscope: None,
            on_rssi: None,
            on_battery_level: None,
            on_emg: None,
            on_warmup_completed: None,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    slot_setter!(
        /// A Myo has been paired. Receives its firmware version.
        on_pair, FirmwareVersion
    );
    slot_setter!(on_unpair);
    slot_setter!(
        /// A paired Myo has connected.
        on_connect, FirmwareVersion
    );
    slot_setter!(on_disconnect);
    slot_setter!(
        /// The Myo recognised that it is on an arm.
        on_arm_sync, ArmSync
    );
    slot_setter!(
        /// The Myo was moved or removed from the arm.
        on_arm_unsync
    );
    slot_setter!(on_lock);
    slot_setter!(on_unlock);
    slot_setter!(on_pose, Pose);
    slot_setter!(
        /// Orientation as a unit quaternion.
        on_orientation, Quaternion
    );
    slot_setter!(
        /// Acceleration in g.
        on_accelerometer, Vector3
    );
    slot_setter!(
        /// Angular velocity in deg/s.
        on_gyroscope, Vector3
    );
    slot_setter!(on_rssi, i8);
    slot_setter!(
        /// Battery percentage, 0..=100.
        on_battery_level, u8
    );
    slot_setter!(
        /// One frame of raw EMG, one sample per sensor.
        on_emg, EmgFrame
    );
    slot_setter!(on_warmup_completed, WarmupResult);

    /// Capability bitmap of the filled slots.
    pub fn capabilities(&self) -> Capabilities {
        let slots = [
            (self.on_pair.is_some(), Capabilities::PAIR),
            (self.on_unpair.is_some(), Capabilities::UNPAIR),
            (self.on_connect.is_some(), Capabilities::CONNECT),
            (self.on_disconnect.is_some(), Capabilities::DISCONNECT),
            (self.on_arm_sync.is_some(), Capabilities::ARM_SYNC),
            (self.on_arm_unsync.is_some(), Capabilities::ARM_UNSYNC),
            (self.on_lock.is_some(), Capabilities::LOCK),
            (self.on_unlock.is_some(), Capabilities::UNLOCK),
            (self.on_pose.is_some(), Capabilities::POSE),
            (self.on_orientation.is_some(), Capabilities::ORIENTATION),
            (self.on_accelerometer.is_some(), Capabilities::ACCELEROMETER),
            (self.on_gyroscope.is_some(), Capabilities::GYROSCOPE),
            (self.on_rssi.is_some(), Capabilities::RSSI),
            (self.on_battery_level.is_some(), Capabilities::BATTERY_LEVEL),
            (self.on_emg.is_some(), Capabilities::EMG),
            (self.on_warmup_completed.is_some(), Capabilities::WARMUP_COMPLETED),
        ];

        slots
            .iter()
            .filter(|(filled, _)| *filled)
            .fold(Capabilities::empty(), |acc, (_, cap)| acc | *cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_listener_has_no_capabilities() {
        assert!(Listener::new().capabilities().is_empty());
    }

    #[test]
    fn test_capabilities_follow_filled_slots() {
        let listener = Listener::new()
            .on_pose(|_, _, _| Ok(()))
            .on_emg(|_, _, _| Ok(()))
            .on_disconnect(|_, _| Ok(()));
        assert_eq!(
            listener.capabilities(),
            Capabilities::POSE | Capabilities::EMG | Capabilities::DISCONNECT
        );
    }

    #[test]
    fn test_clone_keeps_identity() {
        let a = Listener::new().on_lock(|_, _| Ok(()));
        let b = a.clone();
        let c = Listener::new();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(b.capabilities(), Capabilities::LOCK);
    }
}
