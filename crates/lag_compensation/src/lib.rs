//! # Lag Compensation
//!
//! Server-side hitbox rewind for authoritative multiplayer games.
//!
//! ## Features
//!
//! - **Snapshot History**: The last 60 ticks of every body's hit geometry
//! - **Flat Storage**: Struct-of-arrays containers allocated once, reused every tick
//! - **Two-Phase Raycasts**: Proximity-sphere culling, then exact box, sphere and capsule tests
//! - **Authored Rigs**: Body layouts loaded from TOML or RON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lag_compensation::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut world: HitboxWorld<Hitbody> = HitboxWorld::new();
//!     let layout = HitbodyLayout::load_from_file("rigs/soldier.ron")?;
//!     world.register_body(BodyId(7), Hitbody::new(layout, Transform::identity()))?;
//!
//!     // Once per server tick, after movement
//!     world.advance_frame(1)?;
//!
//!     // When a shot arrives, rewind to what the shooter saw
//!     let ray = Ray::new(Vec3::new(0.0, 1.6, -20.0), Vec3::new(0.0, 0.0, 1.0))?;
//!     if let Some(hit) = world.raycast(1, &ray) {
//!         let HitObject { body, part } = hit.hit_object;
//!         println!("body {} part {:?} at {}", body, part, hit.distance);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::must_use_candidate
)]

pub mod config;
pub mod error;
pub mod foundation;
pub mod physics;

pub use error::{HitboxError, Result};

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, ConfigFormat},
        error::HitboxError,
        foundation::math::{Quat, Transform, Vec3},
        physics::{
            BodyId, GeometrySource, HitCapsule, HitCapsuleShape, HitInfo, HitObject, Hitbody,
            HitbodyLayout, Hitbox, HitboxShape, HitboxWorld, Hitsphere, HitsphereShape, PartId, Ray,
            RaycastScratch,
        },
    };
}
