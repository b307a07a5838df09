use crate::engine::EngineError;
use crate::listener::ListenerId;
use crate::types::Capabilities;

/// Boxed error returned by listener handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when interacting with a hub or a Myo.
#[derive(Debug, thiserror::Error)]
pub enum MyoError {
    /// The application identifier was rejected before reaching the engine.
    #[error("Invalid application identifier: {reason}")]
    InvalidApplicationId { reason: &'static str },

    #[error("Failed to initialise hub: {0}")]
    EngineInit(#[source] EngineError),

    #[error("Hub has been released")]
    Released,

    #[error("Hub is already in use by another call")]
    ConcurrentUse,

    #[error("Listener {0} is already registered")]
    DuplicateListener(ListenerId),

    #[error("Listener handler for {kind:?} failed: {source}")]
    Listener {
        kind: Capabilities,
        #[source]
        source: HandlerError,
    },

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl MyoError {
    /// True for failures detected locally, before any engine call.
    pub fn is_validation(&self) -> bool {
        matches!(self, MyoError::InvalidApplicationId { .. })
    }
}
