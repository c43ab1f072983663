//! Animation error types

use crate::scheduler::AnimationId;
use strobe_platform::PlatformError;
use thiserror::Error;

/// Errors raised by the animation layer
///
/// Frame-level failures are never surfaced here; they are logged and end the
/// failing run. These errors cover configuration and wiring mistakes.
#[derive(Error, Debug)]
pub enum AnimationError {
    /// No attribute with this name (or alias)
    #[error("Unknown animation attribute: {0}")]
    UnknownAttribute(String),

    /// Value of the wrong shape for the attribute
    #[error("Invalid value for attribute '{name}': expected {expected}, got {got}")]
    InvalidAttribute {
        name: String,
        expected: &'static str,
        got: &'static str,
    },

    /// Negative, NaN or infinite duration
    #[error("Attribute '{0}' must be a finite, non-negative number of seconds")]
    NegativeValue(String),

    /// The scheduler behind a handle has been dropped
    #[error("Animation scheduler has been dropped")]
    SchedulerGone,

    /// `set_global_scheduler` was called twice
    #[error("Global animation scheduler is already installed")]
    SchedulerAlreadyInstalled,

    /// Frame enqueued for an animation the scheduler does not know
    #[error("Animation {0:?} is not registered with the scheduler")]
    Unregistered(AnimationId),

    /// Builder finished without a frame producer
    #[error("Animation '{0}' has no frame producer")]
    MissingFrameProducer(String),

    /// The runner thread could not be spawned
    #[error("Failed to spawn animation runner: {0}")]
    RunnerSpawn(String),

    /// Declarative configuration could not be parsed
    #[error("Invalid animation config: {0}")]
    ConfigParse(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
