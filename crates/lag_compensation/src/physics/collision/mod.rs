//! Collision primitives and ray intersection math
//!
//! # Module Organization
//!
//! - [`primitives`] - Rays, hit results, owner handles, bounds and axes
//! - [`raycasts`] - Ray against sphere, oriented box and capsule
//!
//! The intersection functions are pure: they take world-space rays plus
//! whatever transform the primitive was captured with, and return a distance
//! or `f32::INFINITY`.

pub mod primitives;
pub mod raycasts;

pub use primitives::{
    BodyId, BoundingSphere, CapsuleAxis, HitInfo, HitObject, LocalBounds, PartId, Ray,
};
pub use raycasts::{ray_box, ray_capsule, ray_sphere};
