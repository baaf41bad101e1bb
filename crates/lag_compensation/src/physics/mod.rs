//! Lag-compensated hit validation
//!
//! Every server tick the world captures the hit geometry of all registered
//! bodies into a flat snapshot and keeps the last
//! [`MAX_REWIND_FRAMES`](limits::MAX_REWIND_FRAMES) of them. Shots are then
//! validated against the snapshot matching what the shooter saw, using a
//! proximity-sphere broad phase followed by exact box, sphere and capsule
//! tests.

pub mod body;
pub mod collision;
pub mod history;
pub mod limits;
pub mod snapshot;
pub mod storage;
pub mod world;

#[cfg(test)]
mod tests;

pub use body::{
    GeometrySource, HitCapsule, HitCapsuleShape, Hitbody, HitbodyLayout, Hitbox, HitboxShape,
    Hitsphere, HitsphereShape, PrimitiveSink,
};
pub use collision::{
    BodyId, BoundingSphere, CapsuleAxis, HitInfo, HitObject, LocalBounds, PartId, Ray,
};
pub use history::SnapshotHistory;
pub use snapshot::{BodySpans, RaycastScratch, WorldSnapshot};
pub use storage::PrimitiveKind;
pub use world::HitboxWorld;
