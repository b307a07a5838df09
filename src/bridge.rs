//! Listener registry and event dispatch.
//!
//! Every registered listener owns one engine adapter created with the
//! listener's capability bitmap. The engine only delivers events whose bit
//! is set in that bitmap, and dispatch here re-checks the bit before
//! touching a handler slot.

use crate::device::{DeviceLink, Myo};
use crate::engine::{AdapterId, Event, EventPayload};
use crate::listener::{ArmSync, HandlerResult, Listener, ListenerId};
use crate::types::Capabilities;
use crate::{MyoError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A listener installed in the engine.
pub(crate) struct Registration {
    pub listener: Listener,
    pub adapter: AdapterId,
    pub capabilities: Capabilities,
}

#[derive(Default)]
pub(crate) struct Registry {
    records: BTreeMap<ListenerId, Registration>,
    by_adapter: HashMap<AdapterId, ListenerId>,
    last_timestamp_us: u64,
}

impl Registry {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn adapter_of(&self, id: ListenerId) -> Option<AdapterId> {
        self.records.get(&id).map(|record| record.adapter)
    }

    pub fn insert(&mut self, listener: Listener, adapter: AdapterId, capabilities: Capabilities) {
        let id = listener.id();
        self.by_adapter.insert(adapter, id);
        self.records.insert(
            id,
            Registration {
                listener,
                adapter,
                capabilities,
            },
        );
    }

    pub fn remove(&mut self, id: ListenerId) -> Option<Registration> {
        let record = self.records.remove(&id)?;
        self.by_adapter.remove(&record.adapter);
        Some(record)
    }

    /// Remove every registration, oldest listener first.
    pub fn drain(&mut self) -> Vec<Registration> {
        self.by_adapter.clear();
        std::mem::take(&mut self.records).into_values().collect()
    }

    /// Deliver one engine event to the listener behind `adapter`.
    pub fn dispatch(&mut self, adapter: AdapterId, event: &Event, link: &Arc<DeviceLink>) -> Result<()> {
        let kind = event.payload.capability();

        let Some(record) = self
            .by_adapter
            .get(&adapter)
            .and_then(|id| self.records.get(id))
        else {
            log::warn!("Event {:?} for unknown adapter {:?}, dropping", kind, adapter);
            return Ok(());
        };

        if !record.capabilities.contains(kind) {
            log::trace!("Adapter {:?} does not handle {:?}", adapter, kind);
            return Ok(());
        }

        let mut timestamp = event.timestamp_us;
        if timestamp < self.last_timestamp_us {
            log::warn!(
                "Timestamp went backwards ({} < {}), clamping",
                timestamp,
                self.last_timestamp_us
            );
            timestamp = self.last_timestamp_us;
        }
        self.last_timestamp_us = timestamp;

        let myo = Myo::new(event.device, link.clone());
        log::trace!(
            "Dispatch {:?} to listener {} ({:?}, t={})",
            kind,
            record.listener.id(),
            myo,
            timestamp
        );

        invoke(&record.listener, &myo, timestamp, &event.payload)
            .map_err(|source| MyoError::Listener { kind, source })
    }
}

fn invoke(l: &Listener, myo: &Myo, ts: u64, payload: &EventPayload) -> HandlerResult {
    fn call<A>(
        slot: &Option<Arc<dyn Fn(&Myo, u64, A) -> HandlerResult + Send + Sync>>,
        myo: &Myo,
        ts: u64,
        arg: A,
    ) -> HandlerResult {
        match slot {
            Some(f) => f(myo, ts, arg),
            None => Ok(()),
        }
    }

    fn bare(
        slot: &Option<Arc<dyn Fn(&Myo, u64) -> HandlerResult + Send + Sync>>,
        myo: &Myo,
        ts: u64,
    ) -> HandlerResult {
        match slot {
            Some(f) => f(myo, ts),
            None => Ok(()),
        }
    }

    match payload {
        EventPayload::Paired(fw) => call(&l.on_pair, myo, ts, *fw),
        EventPayload::Unpaired => bare(&l.on_unpair, myo, ts),
        EventPayload::Connected(fw) => call(&l.on_connect, myo, ts, *fw),
        EventPayload::Disconnected => bare(&l.on_disconnect, myo, ts),
        EventPayload::ArmSynced {
            arm,
            x_direction,
            rotation,
            warmup_state,
        } => call(
            &l.on_arm_sync,
            myo,
            ts,
            ArmSync {
                arm: *arm,
                x_direction: *x_direction,
                rotation: *rotation,
                warmup_state: *warmup_state,
            },
        ),
        EventPayload::ArmUnsynced => bare(&l.on_arm_unsync, myo, ts),
        EventPayload::Locked => bare(&l.on_lock, myo, ts),
        EventPayload::Unlocked => bare(&l.on_unlock, myo, ts),
        EventPayload::Pose(pose) => call(&l.on_pose, myo, ts, *pose),
        EventPayload::Orientation(q) => call(&l.on_orientation, myo, ts, *q),
        EventPayload::Accelerometer(v) => call(&l.on_accelerometer, myo, ts, *v),
        EventPayload::Gyroscope(v) => call(&l.on_gyroscope, myo, ts, *v),
        EventPayload::Rssi(rssi) => call(&l.on_rssi, myo, ts, *rssi),
        EventPayload::BatteryLevel(level) => call(&l.on_battery_level, myo, ts, *level),
        EventPayload::Emg(frame) => call(&l.on_emg, myo, ts, *frame),
        EventPayload::WarmupCompleted(result) => {
            call(&l.on_warmup_completed, myo, ts, *result)
        }
    }
}
