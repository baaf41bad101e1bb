//! Replay errors

use lag_compensation::config::ConfigError;
use lag_compensation::HitboxError;
use thiserror::Error;

/// Errors raised while loading or running a scenario
#[derive(Error, Debug)]
pub enum ReplayError {
    /// Scenario file could not be read or parsed
    #[error("scenario error: {0}")]
    Config(#[from] ConfigError),

    /// The hitbox world rejected an operation
    #[error("hitbox world error: {0}")]
    Hitbox(#[from] HitboxError),

    /// An actor names a rig the scenario does not define
    #[error("actor {actor} uses unknown rig '{rig}'")]
    UnknownRig {
        /// Actor id
        actor: u32,
        /// Rig name
        rig: String,
    },

    /// A shot targets an actor the scenario does not define
    #[error("shot {shot} targets unknown actor {actor}")]
    UnknownActor {
        /// Index of the shot in the scenario
        shot: usize,
        /// Target actor id
        actor: u32,
    },

    /// Tick rate must be positive
    #[error("tick rate must be positive, got {0}")]
    InvalidTickRate(f32),
}
