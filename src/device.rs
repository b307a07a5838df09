use crate::engine::{CommandPort, DeviceCommand, DeviceToken};
use crate::types::{StreamEmg, UnlockType, VibrationType};
use crate::{MyoError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Session state shared between a hub and the devices it minted.
///
/// Commands from a [`Myo`] check the hub's released flag here, so a handle
/// that outlives its hub is rejected instead of reaching a freed engine.
pub(crate) struct DeviceLink {
    released: AtomicBool,
    port: Arc<dyn CommandPort>,
}

impl DeviceLink {
    pub(crate) fn new(port: Arc<dyn CommandPort>) -> Self {
        Self {
            released: AtomicBool::new(false),
            port,
        }
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn mark_released(&self) {
        self.released.store(true, Ordering::Release);
    }
}

/// A Myo armband known to a hub.
///
/// Handles are minted by the hub when the engine reports a device; they
/// cannot be built by application code. Two handles compare equal iff they
/// refer to the same physical device.
#[derive(Clone)]
pub struct Myo {
    token: DeviceToken,
    link: Arc<DeviceLink>,
}

impl Myo {
    pub(crate) fn new(token: DeviceToken, link: Arc<DeviceLink>) -> Self {
        Self { token, link }
    }

    /// Engine identity of this device. Only useful for equality and hashing.
    pub fn token(&self) -> DeviceToken {
        self.token
    }

    /// Vibrate the Myo.
    pub fn vibrate(&self, kind: VibrationType) -> Result<()> {
        self.send(DeviceCommand::Vibrate(kind))
    }

    /// Request the signal strength. The value arrives as an RSSI event.
    pub fn request_rssi(&self) -> Result<()> {
        self.send(DeviceCommand::RequestRssi)
    }

    /// Request the battery level. The value arrives as a battery-level event.
    pub fn request_battery_level(&self) -> Result<()> {
        self.send(DeviceCommand::RequestBatteryLevel)
    }

    /// Unlock the Myo. Emits an unlock event if it was locked.
    pub fn unlock(&self, kind: UnlockType) -> Result<()> {
        self.send(DeviceCommand::Unlock(kind))
    }

    /// Lock the Myo immediately. Emits a lock event if it was unlocked.
    pub fn lock(&self) -> Result<()> {
        self.send(DeviceCommand::Lock)
    }

    /// Tell the Myo a user action was recognised; it vibrates in response.
    pub fn notify_user_action(&self) -> Result<()> {
        self.send(DeviceCommand::NotifyUserAction)
    }

    /// Enable or disable raw EMG streaming.
    pub fn set_stream_emg(&self, mode: StreamEmg) -> Result<()> {
        self.send(DeviceCommand::SetStreamEmg(mode))
    }

    fn send(&self, command: DeviceCommand) -> Result<()> {
        if self.link.is_released() {
            return Err(MyoError::Released);
        }
        log::debug!("{:?} <- {:?}", self.token, command);
        self.link.port.send(self.token, command)?;
        Ok(())
    }
}

impl PartialEq for Myo {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Myo {}

impl Hash for Myo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl fmt::Debug for Myo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Myo").field(&self.token).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPort {
        sent: Mutex<Vec<(DeviceToken, DeviceCommand)>>,
    }

    impl CommandPort for RecordingPort {
        fn send(
            &self,
            device: DeviceToken,
            command: DeviceCommand,
        ) -> std::result::Result<(), EngineError> {
            self.sent.lock().unwrap().push((device, command));
            Ok(())
        }
    }

    fn link() -> (Arc<RecordingPort>, Arc<DeviceLink>) {
        let port = Arc::new(RecordingPort::default());
        let link = Arc::new(DeviceLink::new(port.clone()));
        (port, link)
    }

    #[test]
    fn test_equality_follows_token() {
        let (_, link) = link();
        let a = Myo::new(DeviceToken::from_raw(1), link.clone());
        let b = Myo::new(DeviceToken::from_raw(1), link.clone());
        let c = Myo::new(DeviceToken::from_raw(2), link);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: std::collections::HashSet<Myo> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_commands_reach_port() {
        let (port, link) = link();
        let myo = Myo::new(DeviceToken::from_raw(7), link);
        myo.vibrate(VibrationType::Medium).unwrap();
        myo.unlock(UnlockType::Hold).unwrap();
        myo.set_stream_emg(StreamEmg::Enabled).unwrap();

        let sent = port.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                (DeviceToken::from_raw(7), DeviceCommand::Vibrate(VibrationType::Medium)),
                (DeviceToken::from_raw(7), DeviceCommand::Unlock(UnlockType::Hold)),
                (DeviceToken::from_raw(7), DeviceCommand::SetStreamEmg(StreamEmg::Enabled)),
            ]
        );
    }

    #[test]
    fn test_commands_rejected_after_release() {
        let (port, link) = link();
        let myo = Myo::new(DeviceToken::from_raw(7), link.clone());
        link.mark_released();
        assert!(matches!(myo.lock(), Err(MyoError::Released)));
        assert!(port.sent.lock().unwrap().is_empty());
    }
}
