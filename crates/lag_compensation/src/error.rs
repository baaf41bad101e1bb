//! Error types for registration, capture and configuration

use thiserror::Error;

use crate::config::ConfigError;
use crate::physics::collision::BodyId;
use crate::physics::storage::PrimitiveKind;

/// Errors raised by the hitbox world
///
/// Every variant is a caller misuse or a misconfigured rig. Out-of-window
/// frame queries and misses are not errors.
#[derive(Error, Debug)]
pub enum HitboxError {
    /// Body was already registered
    #[error("body {0} is already registered")]
    DuplicateBody(BodyId),

    /// Body is not registered
    #[error("body {0} is not registered")]
    UnknownBody(BodyId),

    /// Registry is full
    #[error("cannot register more than {capacity} bodies")]
    TooManyBodies {
        /// Maximum number of bodies
        capacity: usize,
    },

    /// A world-wide flat container is full
    #[error("{kind} storage is full ({capacity} elements)")]
    CapacityExceeded {
        /// Container that overflowed
        kind: PrimitiveKind,
        /// Its fixed capacity
        capacity: usize,
    },

    /// A body reported more primitives of one kind than allowed
    #[error("body {body} reported more than {limit} {kind} primitives")]
    PerBodyLimitExceeded {
        /// Offending body
        body: BodyId,
        /// Primitive kind
        kind: PrimitiveKind,
        /// Per-body limit for that kind
        limit: usize,
    },

    /// A reported primitive transform has no inverse
    #[error("body {body} reported a {kind} with a singular transform")]
    SingularTransform {
        /// Offending body
        body: BodyId,
        /// Primitive kind
        kind: PrimitiveKind,
    },

    /// `advance_frame` was called with an older frame than the current one
    #[error("frame {requested} is older than current frame {current}")]
    FrameRegression {
        /// Last captured frame
        current: u32,
        /// Frame passed to `advance_frame`
        requested: u32,
    },

    /// Ray direction is zero or not finite
    #[error("ray direction must be finite and non-zero")]
    InvalidRay,

    /// A rig's proximity sphere does not enclose its parts
    #[error("proximity radius {radius} is smaller than the {required} needed to enclose all parts")]
    ProximityTooSmall {
        /// Configured radius
        radius: f32,
        /// Smallest enclosing radius
        required: f32,
    },

    /// Configuration loading failed
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias for hitbox operations
pub type Result<T> = std::result::Result<T, HitboxError>;
