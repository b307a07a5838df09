use crate::app_id;
use crate::bridge::Registry;
use crate::config::HubConfig;
use crate::device::{DeviceLink, Myo};
use crate::engine::{AdapterId, Engine, EngineError, Event, Flow, HubHandle, RunMode};
use crate::listener::{Listener, ListenerId};
use crate::types::LockingPolicy;
use crate::{MyoError, Result};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

struct HubState {
    engine: Box<dyn Engine>,
    /// `None` once the engine hub has been shut down.
    handle: Option<HubHandle>,
    registry: Registry,
}

/// A session with the Myo engine.
///
/// The hub owns the engine handle and every listener adapter installed in
/// it. Listener handlers only run inside [`Hub::run`], [`Hub::run_once`]
/// and [`Hub::wait_for_device`], on the calling thread.
///
/// Only one call may be in flight at a time. Overlapping calls, including
/// calls made from inside a handler, fail fast with
/// [`MyoError::ConcurrentUse`]. After [`Hub::release`] every operation except
/// `release` and `is_released` fails with [`MyoError::Released`]. Dropping
/// the hub releases it.
pub struct Hub {
    state: Mutex<HubState>,
    link: Arc<DeviceLink>,
    application_id: String,
}

impl Hub {
    /// Validate `application_id` and allocate an engine hub.
    pub fn new<E: Engine + 'static>(application_id: &str, engine: E) -> Result<Hub> {
        Self::with_config(HubConfig::new(application_id), engine)
    }

    /// Like [`Hub::new`], then apply the configured locking policy.
    pub fn with_config<E: Engine + 'static>(config: HubConfig, mut engine: E) -> Result<Hub> {
        app_id::validate(&config.application_id)?;

        let handle = engine
            .init_hub(&config.application_id)
            .map_err(MyoError::EngineInit)?;
        log::info!("Hub initialised for {} ({:?})", config.application_id, handle);

        let link = Arc::new(DeviceLink::new(engine.command_port()));
        let hub = Hub {
            state: Mutex::new(HubState {
                engine: Box::new(engine),
                handle: Some(handle),
                registry: Registry::default(),
            }),
            link,
            application_id: config.application_id,
        };

        if let Some(policy) = config.locking_policy {
            hub.set_locking_policy(policy)?;
        }

        Ok(hub)
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn is_released(&self) -> bool {
        self.link.is_released()
    }

    /// Remove every listener and shut the engine hub down.
    ///
    /// Teardown runs once; later calls return `Ok(())`. If an engine call
    /// fails, teardown still completes and the first failure is returned.
    pub fn release(&self) -> Result<()> {
        if self.link.is_released() {
            return Ok(());
        }
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => {
                self.state.clear_poison();
                poisoned.into_inner()
            }
            Err(TryLockError::WouldBlock) if self.link.is_released() => return Ok(()),
            Err(TryLockError::WouldBlock) => return Err(MyoError::ConcurrentUse),
        };
        teardown(&self.link, &mut state)
    }

    pub fn set_locking_policy(&self, policy: LockingPolicy) -> Result<()> {
        let mut state = self.acquire()?;
        let handle = state.handle()?;
        log::debug!("Locking policy -> {:?}", policy);
        state.engine.set_locking_policy(handle, policy)?;
        Ok(())
    }

    /// Drive the engine for up to `duration`, dispatching every event that arrives.
    ///
    /// A zero duration processes only the events already pending. A handler
    /// error stops the pass and is returned.
    pub fn run(&self, duration: Duration) -> Result<()> {
        self.drive(duration, RunMode::All)
    }

    /// Drive the engine until one event has been processed or `duration` elapses.
    pub fn run_once(&self, duration: Duration) -> Result<()> {
        self.drive(duration, RunMode::Once)
    }

    fn drive(&self, duration: Duration, mode: RunMode) -> Result<()> {
        let mut state = self.acquire()?;
        let handle = state.handle()?;
        let HubState {
            engine, registry, ..
        } = &mut *state;

        let mut failure = None;
        let mut handler = |adapter: AdapterId, event: &Event| {
            match registry.dispatch(adapter, event, &self.link) {
                Ok(()) => Flow::Continue,
                Err(e) => {
                    failure = Some(e);
                    Flow::Stop
                }
            }
        };
        let outcome = engine.run(handle, duration, mode, &mut handler);

        match failure {
            Some(e) => Err(e),
            None => outcome.map_err(MyoError::from),
        }
    }

    /// Block until a Myo pairs, dispatching events to listeners meanwhile.
    ///
    /// A zero `timeout` waits indefinitely. Returns `Ok(None)` on timeout.
    pub fn wait_for_device(&self, timeout: Duration) -> Result<Option<Myo>> {
        let mut state = self.acquire()?;
        let handle = state.handle()?;
        let HubState {
            engine, registry, ..
        } = &mut *state;

        let mut failure = None;
        let mut handler = |adapter: AdapterId, event: &Event| {
            match registry.dispatch(adapter, event, &self.link) {
                Ok(()) => Flow::Continue,
                Err(e) => {
                    failure = Some(e);
                    Flow::Stop
                }
            }
        };
        let timeout = if timeout.is_zero() { None } else { Some(timeout) };
        let outcome = engine.wait_for_device(handle, timeout, &mut handler);

        if let Some(e) = failure {
            return Err(e);
        }
        let device = outcome?.map(|token| Myo::new(token, self.link.clone()));
        match &device {
            Some(myo) => log::info!("Found {:?}", myo),
            None => log::debug!("No Myo found within {:?}", timeout),
        }
        Ok(device)
    }

    /// Register `listener` and install an engine adapter for its handlers.
    ///
    /// Registering a listener that is already registered (or a clone of
    /// one) fails with [`MyoError::DuplicateListener`].
    pub fn add_listener(&self, listener: Listener) -> Result<ListenerId> {
        let mut state = self.acquire()?;
        let handle = state.handle()?;
        let id = listener.id();
        if state.registry.contains(id) {
            return Err(MyoError::DuplicateListener(id));
        }

        let capabilities = listener.capabilities();
        let adapter = state.engine.create_adapter(handle, capabilities)?;
        log::debug!(
            "Listener {} installed as {:?} with {:?}",
            id,
            adapter,
            capabilities
        );
        state.registry.insert(listener, adapter, capabilities);
        Ok(id)
    }

    /// Unregister a listener. Unknown ids are ignored.
    ///
    /// If the engine fails to destroy the adapter, the listener stays
    /// registered and release retries the destroy.
    pub fn remove_listener(&self, id: ListenerId) -> Result<()> {
        let mut state = self.acquire()?;
        let handle = state.handle()?;
        let Some(adapter) = state.registry.adapter_of(id) else {
            return Ok(());
        };
        match state.engine.destroy_adapter(handle, adapter) {
            Ok(()) => {}
            Err(EngineError::UnknownAdapter(_)) => {
                log::warn!("Adapter {:?} of listener {} already gone", adapter, id);
            }
            Err(e) => return Err(e.into()),
        }
        state.registry.remove(id);
        log::debug!("Listener {} removed ({:?})", id, adapter);
        Ok(())
    }

    pub fn is_registered(&self, id: ListenerId) -> Result<bool> {
        let state = self.acquire()?;
        Ok(state.registry.contains(id))
    }

    pub fn listener_count(&self) -> Result<usize> {
        let state = self.acquire()?;
        Ok(state.registry.len())
    }

    /// Release check first, then the single-call guard.
    fn acquire(&self) -> Result<MutexGuard<'_, HubState>> {
        if self.link.is_released() {
            return Err(MyoError::Released);
        }
        match self.state.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => {
                log::warn!("Recovering hub state after a panicking handler");
                self.state.clear_poison();
                Ok(poisoned.into_inner())
            }
            Err(TryLockError::WouldBlock) => Err(MyoError::ConcurrentUse),
        }
    }
}

impl HubState {
    fn handle(&self) -> Result<HubHandle> {
        self.handle.ok_or(MyoError::Released)
    }
}

fn teardown(link: &DeviceLink, state: &mut HubState) -> Result<()> {
    let Some(handle) = state.handle.take() else {
        return Ok(());
    };
    link.mark_released();

    let mut first_error = None;
    for record in state.registry.drain() {
        log::debug!(
            "Removing listener {} ({:?})",
            record.listener.id(),
            record.adapter
        );
        if let Err(e) = state.engine.destroy_adapter(handle, record.adapter) {
            log::warn!("Failed to destroy adapter {:?}: {}", record.adapter, e);
            first_error.get_or_insert(e);
        }
    }

    if let Err(e) = state.engine.shutdown_hub(handle) {
        log::warn!("Failed to shut down hub {:?}: {}", handle, e);
        first_error.get_or_insert(e);
    }
    log::info!("Hub {:?} released", handle);

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = teardown(&self.link, state) {
            log::warn!("Error while releasing hub on drop: {}", e);
        }
    }
}
