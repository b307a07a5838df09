//! In-process simulated engine.
//!
//! [`SimEngine`] implements the engine boundary without hardware: events are
//! injected through a [`SimRemote`] (from any thread) and queued on a
//! channel that [`Engine::run`] drains. A [`SimProbe`] records every
//! boundary call and every handler delivery.
//!
//! ```
//! use myo::sim::SimEngine;
//! use myo::{EventPayload, Hub, Listener, Pose};
//! use std::time::Duration;
//!
//! let engine = SimEngine::new();
//! let remote = engine.remote();
//! let hub = Hub::new("com.example.sim", engine).unwrap();
//! hub.add_listener(Listener::new().on_pose(|_, _, pose| {
//!     println!("pose: {}", pose);
//!     Ok(())
//! }))
//! .unwrap();
//!
//! let myo = remote.attach();
//! remote.emit(myo, EventPayload::Pose(Pose::Fist));
//! hub.run(Duration::from_millis(10)).unwrap();
//! ```

use crate::engine::{
    AdapterId, CommandPort, DeviceCommand, DeviceToken, Engine, EngineError, Event, EventHandler,
    EventPayload, Flow, HubHandle, RunMode,
};
use crate::types::{Capabilities, FirmwareVersion, LockingPolicy, Pose, StreamEmg};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Firmware reported by simulated devices.
pub const SIM_FIRMWARE: FirmwareVersion = FirmwareVersion {
    major: 1,
    minor: 5,
    patch: 1970,
    hardware_rev: 2,
};

/// Base of the simulated device token space.
const DEVICE_TOKEN_BASE: u64 = 0x7f00_0000;

/// A call that crossed the engine boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryCall {
    InitHub(String),
    ShutdownHub(HubHandle),
    SetLockingPolicy(LockingPolicy),
    Run(RunMode, Duration),
    WaitForDevice(Option<Duration>),
    CreateAdapter(AdapterId, Capabilities),
    DestroyAdapter(AdapterId),
    Command(DeviceToken, DeviceCommand),
}

#[derive(Default)]
struct ProbeState {
    calls: Vec<BoundaryCall>,
    delivered: usize,
    delivered_kinds: Capabilities,
    live_adapters: BTreeSet<AdapterId>,
}

#[derive(Debug, Clone, Copy)]
struct SimDevice {
    locked: bool,
    rssi: i8,
    battery: u8,
    emg: StreamEmg,
}

impl Default for SimDevice {
    fn default() -> Self {
        Self {
            locked: false,
            rssi: -55,
            battery: 100,
            emg: StreamEmg::Disabled,
        }
    }
}

/// State shared by the engine, its command port and remotes.
struct Shared {
    probe: Mutex<ProbeState>,
    devices: Mutex<HashMap<DeviceToken, SimDevice>>,
    epoch: Instant,
    last_timestamp_us: Mutex<u64>,
    next_device: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn new() -> Self {
        Self {
            probe: Mutex::new(ProbeState::default()),
            devices: Mutex::new(HashMap::new()),
            epoch: Instant::now(),
            last_timestamp_us: Mutex::new(0),
            next_device: AtomicU64::new(1),
        }
    }

    fn record(&self, call: BoundaryCall) {
        log::trace!("sim boundary: {:?}", call);
        lock(&self.probe).calls.push(call);
    }

    /// Microseconds since the engine epoch, never below the last stamp.
    fn stamp(&self) -> u64 {
        let now = self.epoch.elapsed().as_micros() as u64;
        let mut last = lock(&self.last_timestamp_us);
        *last = (*last).max(now);
        *last
    }

    fn push(&self, sender: &Sender<Event>, device: DeviceToken, timestamp_us: u64, payload: EventPayload) {
        let event = Event {
            device,
            timestamp_us,
            payload,
        };
        // The engine owns a receiver for its whole lifetime, so this only
        // fails once the engine is gone.
        if sender.send(event).is_err() {
            log::debug!("sim engine dropped, discarding event for {:?}", device);
        }
    }
}

/// Command port of the simulated engine.
struct SimPort {
    shared: Arc<Shared>,
    sender: Sender<Event>,
}

impl CommandPort for SimPort {
    fn send(&self, device: DeviceToken, command: DeviceCommand) -> Result<(), EngineError> {
        log::trace!("sim command {:?} code={:?}", command, command.code());
        self.shared.record(BoundaryCall::Command(device, command));

        let response = {
            let mut devices = lock(&self.shared.devices);
            let state = devices
                .get_mut(&device)
                .ok_or(EngineError::UnknownDevice(device))?;
            match command {
                DeviceCommand::RequestRssi => Some(EventPayload::Rssi(state.rssi)),
                DeviceCommand::RequestBatteryLevel => Some(EventPayload::BatteryLevel(state.battery)),
                DeviceCommand::Unlock(_) if state.locked => {
                    state.locked = false;
                    Some(EventPayload::Unlocked)
                }
                DeviceCommand::Lock if !state.locked => {
                    state.locked = true;
                    Some(EventPayload::Locked)
                }
                DeviceCommand::SetStreamEmg(mode) => {
                    state.emg = mode;
                    None
                }
                _ => None,
            }
        };

        if let Some(payload) = response {
            let ts = self.shared.stamp();
            self.shared.push(&self.sender, device, ts, payload);
        }
        Ok(())
    }
}

/// Simulated engine.
pub struct SimEngine {
    shared: Arc<Shared>,
    port: Arc<SimPort>,
    sender: Sender<Event>,
    receiver: Receiver<Event>,
    available: bool,
    hub: Option<HubHandle>,
    next_hub: u64,
    adapters: BTreeMap<AdapterId, Capabilities>,
    next_adapter: u64,
    locking_policy: LockingPolicy,
}

impl Default for SimEngine {
    fn default() -> Self {
        SimEngine::new()
    }
}

impl SimEngine {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared::new());
        let port = Arc::new(SimPort {
            shared: shared.clone(),
            sender: sender.clone(),
        });
        Self {
            shared,
            port,
            sender,
            receiver,
            available: true,
            hub: None,
            next_hub: 1,
            adapters: BTreeMap::new(),
            next_adapter: 1,
            locking_policy: LockingPolicy::None,
        }
    }

    /// An engine whose hub allocation always fails, as when no broker is running.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..SimEngine::new()
        }
    }

    pub fn remote(&self) -> SimRemote {
        SimRemote {
            shared: self.shared.clone(),
            sender: self.sender.clone(),
        }
    }

    pub fn probe(&self) -> SimProbe {
        SimProbe {
            shared: self.shared.clone(),
        }
    }

    fn check_hub(&self, hub: HubHandle) -> Result<(), EngineError> {
        match self.hub {
            Some(current) if current == hub => Ok(()),
            _ => Err(EngineError::InvalidHandle(hub)),
        }
    }

    fn deadline(timeout: Option<Duration>) -> Option<Instant> {
        timeout.and_then(|t| Instant::now().checked_add(t))
    }

    /// Next queued event, waiting until `deadline` (`None` waits forever).
    /// A deadline already in the past only takes what is pending.
    fn next_event(&self, deadline: Option<Instant>) -> Option<Event> {
        match deadline {
            None => self.receiver.recv().ok(),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return self.receiver.try_recv().ok();
                }
                match self.receiver.recv_timeout(remaining) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
                }
            }
        }
    }

    /// Apply device-side effects and report whether the event is suppressed.
    fn absorb(&self, event: &Event) -> bool {
        let mut devices = lock(&self.shared.devices);
        let state = devices.entry(event.device).or_default();
        match event.payload {
            EventPayload::Locked => state.locked = true,
            EventPayload::Unlocked => state.locked = false,
            EventPayload::Pose(pose) if pose != Pose::Rest => {
                if self.locking_policy == LockingPolicy::Standard && state.locked {
                    return true;
                }
            }
            EventPayload::Emg(_) => return state.emg == StreamEmg::Disabled,
            _ => {}
        }
        false
    }

    /// Hand `event` to every adapter whose bitmap includes it.
    /// Returns `None` when the device suppressed the event.
    fn deliver(&self, event: &Event, handler: &mut EventHandler<'_>) -> Option<Flow> {
        if self.absorb(event) {
            log::trace!("sim suppressed {:?}", event.payload);
            return None;
        }

        let kind = event.payload.capability();
        for (&adapter, caps) in &self.adapters {
            if !caps.contains(kind) {
                continue;
            }
            {
                let mut probe = lock(&self.shared.probe);
                probe.delivered += 1;
                probe.delivered_kinds |= kind;
            }
            if handler(adapter, event) == Flow::Stop {
                return Some(Flow::Stop);
            }
        }
        Some(Flow::Continue)
    }
}

impl Engine for SimEngine {
    fn init_hub(&mut self, application_id: &str) -> Result<HubHandle, EngineError> {
        self.shared
            .record(BoundaryCall::InitHub(application_id.to_string()));
        if !self.available {
            return Err(EngineError::Unavailable(
                "could not connect to Myo Connect".into(),
            ));
        }
        if self.hub.is_some() {
            return Err(EngineError::Backend("hub already initialised".into()));
        }
        let handle = HubHandle::from_raw(self.next_hub);
        self.next_hub += 1;
        self.hub = Some(handle);
        Ok(handle)
    }

    fn shutdown_hub(&mut self, hub: HubHandle) -> Result<(), EngineError> {
        self.shared.record(BoundaryCall::ShutdownHub(hub));
        self.check_hub(hub)?;
        if !self.adapters.is_empty() {
            log::warn!(
                "sim hub shut down with {} adapters still installed",
                self.adapters.len()
            );
        }
        self.hub = None;
        Ok(())
    }

    fn set_locking_policy(
        &mut self,
        hub: HubHandle,
        policy: LockingPolicy,
    ) -> Result<(), EngineError> {
        self.shared.record(BoundaryCall::SetLockingPolicy(policy));
        self.check_hub(hub)?;
        log::trace!("sim locking policy code={}", policy.code());
        self.locking_policy = policy;
        Ok(())
    }

    fn run(
        &mut self,
        hub: HubHandle,
        duration: Duration,
        mode: RunMode,
        handler: &mut EventHandler<'_>,
    ) -> Result<(), EngineError> {
        self.shared.record(BoundaryCall::Run(mode, duration));
        self.check_hub(hub)?;

        let deadline = Self::deadline(Some(duration));
        while let Some(event) = self.next_event(deadline) {
            match self.deliver(&event, handler) {
                None => continue,
                Some(Flow::Stop) => break,
                Some(Flow::Continue) if mode == RunMode::Once => break,
                Some(Flow::Continue) => {}
            }
        }
        Ok(())
    }

    fn wait_for_device(
        &mut self,
        hub: HubHandle,
        timeout: Option<Duration>,
        handler: &mut EventHandler<'_>,
    ) -> Result<Option<DeviceToken>, EngineError> {
        self.shared.record(BoundaryCall::WaitForDevice(timeout));
        self.check_hub(hub)?;

        let deadline = Self::deadline(timeout);
        while let Some(event) = self.next_event(deadline) {
            if self.deliver(&event, handler) == Some(Flow::Stop) {
                return Ok(None);
            }
            if let EventPayload::Paired(_) = event.payload {
                return Ok(Some(event.device));
            }
        }
        Ok(None)
    }

    fn create_adapter(
        &mut self,
        hub: HubHandle,
        capabilities: Capabilities,
    ) -> Result<AdapterId, EngineError> {
        self.check_hub(hub)?;
        let adapter = AdapterId::from_raw(self.next_adapter);
        self.next_adapter += 1;
        self.shared
            .record(BoundaryCall::CreateAdapter(adapter, capabilities));
        self.adapters.insert(adapter, capabilities);
        lock(&self.shared.probe).live_adapters.insert(adapter);
        Ok(adapter)
    }

    fn destroy_adapter(&mut self, hub: HubHandle, adapter: AdapterId) -> Result<(), EngineError> {
        self.shared.record(BoundaryCall::DestroyAdapter(adapter));
        self.check_hub(hub)?;
        self.adapters
            .remove(&adapter)
            .ok_or(EngineError::UnknownAdapter(adapter))?;
        lock(&self.shared.probe).live_adapters.remove(&adapter);
        Ok(())
    }

    fn command_port(&self) -> Arc<dyn CommandPort> {
        self.port.clone()
    }
}

/// Injects devices and events into a [`SimEngine`]. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct SimRemote {
    shared: Arc<Shared>,
    sender: Sender<Event>,
}

impl SimRemote {
    /// Make a device known to the engine without emitting any event.
    pub fn attach(&self) -> DeviceToken {
        let n = self.shared.next_device.fetch_add(1, Ordering::Relaxed);
        let token = DeviceToken::from_raw(DEVICE_TOKEN_BASE + n * 0x40);
        lock(&self.shared.devices).insert(token, SimDevice::default());
        token
    }

    /// Attach a device and emit its pair and connect events.
    pub fn pair(&self) -> DeviceToken {
        let token = self.attach();
        self.emit(token, EventPayload::Paired(SIM_FIRMWARE));
        self.emit(token, EventPayload::Connected(SIM_FIRMWARE));
        token
    }

    /// Queue an event stamped with the engine clock. Returns the timestamp.
    pub fn emit(&self, device: DeviceToken, payload: EventPayload) -> u64 {
        let ts = self.shared.stamp();
        self.shared.push(&self.sender, device, ts, payload);
        ts
    }

    /// Queue an event with an explicit timestamp.
    pub fn emit_at(&self, device: DeviceToken, timestamp_us: u64, payload: EventPayload) {
        self.shared.push(&self.sender, device, timestamp_us, payload);
    }

    pub fn set_battery(&self, device: DeviceToken, level: u8) {
        if let Some(state) = lock(&self.shared.devices).get_mut(&device) {
            state.battery = level.min(100);
        }
    }

    pub fn set_rssi(&self, device: DeviceToken, rssi: i8) {
        if let Some(state) = lock(&self.shared.devices).get_mut(&device) {
            state.rssi = rssi;
        }
    }
}

/// Read-only view of what crossed the simulated boundary.
#[derive(Clone)]
pub struct SimProbe {
    shared: Arc<Shared>,
}

impl SimProbe {
    pub fn calls(&self) -> Vec<BoundaryCall> {
        lock(&self.shared.probe).calls.clone()
    }

    pub fn commands(&self) -> Vec<(DeviceToken, DeviceCommand)> {
        lock(&self.shared.probe)
            .calls
            .iter()
            .filter_map(|call| match call {
                BoundaryCall::Command(device, command) => Some((*device, *command)),
                _ => None,
            })
            .collect()
    }

    /// Number of (adapter, event) deliveries made to handlers.
    pub fn delivered(&self) -> usize {
        lock(&self.shared.probe).delivered
    }

    /// Union of the event kinds delivered so far.
    pub fn delivered_kinds(&self) -> Capabilities {
        lock(&self.shared.probe).delivered_kinds
    }

    pub fn live_adapters(&self) -> usize {
        lock(&self.shared.probe).live_adapters.len()
    }
}
