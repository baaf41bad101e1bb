//! The lag-compensation world: body registry, history and rewind queries
//!
//! ```rust,no_run
//! use lag_compensation::prelude::*;
//!
//! # fn main() -> Result<(), HitboxError> {
//! let mut world: HitboxWorld<Hitbody> = HitboxWorld::new();
//! let mut layout = HitbodyLayout::default();
//! layout.spheres.push(HitsphereShape { part: PartId(0), offset: Vec3::zeros(), radius: 0.5 });
//! layout.fit_proximity(0.1);
//!
//! world.register_body(BodyId(1), Hitbody::new(layout, Transform::identity()))?;
//! world.advance_frame(1)?;
//!
//! let ray = Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::new(0.0, 0.0, 1.0))?;
//! if let Some(hit) = world.raycast(1, &ray) {
//!     println!("hit {:?} at {}", hit.hit_object, hit.distance);
//! }
//! # Ok(())
//! # }
//! ```

use log::debug;

use crate::error::{HitboxError, Result};
use crate::foundation::time::CaptureTimings;

use super::body::GeometrySource;
use super::collision::{BodyId, HitInfo, Ray};
use super::history::SnapshotHistory;
use super::limits::MAX_BODIES;
use super::snapshot::{RaycastScratch, WorldSnapshot};

/// Registered bodies plus the rewind history built from them
///
/// Bodies are captured in registration order every [`advance_frame`]. By
/// default any [`GeometrySource`] can be registered; pick a concrete `S` to
/// keep typed access to bodies through [`body_mut`].
///
/// [`advance_frame`]: HitboxWorld::advance_frame
/// [`body_mut`]: HitboxWorld::body_mut
pub struct HitboxWorld<S = Box<dyn GeometrySource>> {
    bodies: Vec<(BodyId, S)>,
    history: SnapshotHistory,
    scratch: RaycastScratch,
    timings: CaptureTimings,
}

impl<S: GeometrySource> Default for HitboxWorld<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GeometrySource> HitboxWorld<S> {
    /// Create an empty world with all history storage allocated
    pub fn new() -> Self {
        Self {
            bodies: Vec::with_capacity(MAX_BODIES),
            history: SnapshotHistory::new(),
            scratch: RaycastScratch::new(),
            timings: CaptureTimings::default(),
        }
    }

    /// Add a body; it is captured from the next frame on
    pub fn register_body(&mut self, id: BodyId, source: S) -> Result<()> {
        if self.contains_body(id) {
            return Err(HitboxError::DuplicateBody(id));
        }
        if self.bodies.len() >= MAX_BODIES {
            return Err(HitboxError::TooManyBodies { capacity: MAX_BODIES });
        }

        self.bodies.push((id, source));
        debug!("registered body {} ({} total)", id, self.bodies.len());
        Ok(())
    }

    /// Remove a body and hand it back
    ///
    /// Past snapshots keep their copy of the body until they are recycled.
    pub fn unregister_body(&mut self, id: BodyId) -> Result<S> {
        let index = self.index_of(id).ok_or(HitboxError::UnknownBody(id))?;
        let (_, source) = self.bodies.remove(index);
        debug!("unregistered body {} ({} left)", id, self.bodies.len());
        Ok(source)
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.iter().position(|(registered, _)| *registered == id)
    }

    /// Whether `id` is registered
    pub fn contains_body(&self, id: BodyId) -> bool {
        self.index_of(id).is_some()
    }

    /// Number of registered bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Registered body ids, in capture order
    pub fn body_ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.bodies.iter().map(|(id, _)| *id)
    }

    /// A registered body
    pub fn body(&self, id: BodyId) -> Option<&S> {
        self.bodies
            .iter()
            .find(|(registered, _)| *registered == id)
            .map(|(_, source)| source)
    }

    /// A registered body, mutably (to move it between captures)
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut S> {
        self.bodies
            .iter_mut()
            .find(|(registered, _)| *registered == id)
            .map(|(_, source)| source)
    }

    /// Capture every registered body as `frame`
    ///
    /// Call once per server tick, after poses are final. `frame` must not be
    /// older than [`current_frame`](Self::current_frame).
    pub fn advance_frame(&mut self, frame: u32) -> Result<()> {
        let bodies = self.bodies.iter().map(|(id, source)| (*id, source));
        self.history.advance(frame, bodies, &mut self.timings)?;

        let latest = self.history.latest();
        debug!(
            "captured frame {}: {} bodies, {} boxes, {} spheres, {} capsules in {:?}",
            frame,
            latest.body_count(),
            latest.boxes().bounds().len(),
            latest.spheres().radii().len(),
            latest.capsules().radii().len(),
            self.timings.total()
        );
        Ok(())
    }

    /// Closest hit along `ray` against the world as it was at `frame`
    ///
    /// Frames outside the rewind window are clamped to the nearest retained
    /// frame. Uses the world's own scratch buffers.
    pub fn raycast(&mut self, frame: u32, ray: &Ray) -> Option<HitInfo> {
        self.history.lookup(frame).raycast(ray, &mut self.scratch)
    }

    /// Like [`raycast`](Self::raycast), with caller-provided scratch buffers
    pub fn raycast_with(
        &self,
        frame: u32,
        ray: &Ray,
        scratch: &mut RaycastScratch,
    ) -> Option<HitInfo> {
        self.history.lookup(frame).raycast(ray, scratch)
    }

    /// Snapshot serving `frame` (clamped like [`raycast`](Self::raycast))
    pub fn snapshot(&self, frame: u32) -> &WorldSnapshot {
        self.history.lookup(frame)
    }

    /// The rewind history
    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Frame of the most recent capture
    pub fn current_frame(&self) -> u32 {
        self.history.current_frame()
    }

    /// Section times of the most recent capture
    pub fn last_capture_timings(&self) -> &CaptureTimings {
        &self.timings
    }
}

impl<S> Drop for HitboxWorld<S> {
    fn drop(&mut self) {
        debug!(
            "hitbox world dropped at frame {} with {} bodies",
            self.history.current_frame(),
            self.bodies.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform, Vec3};
    use crate::physics::body::{Hitbody, HitbodyLayout, HitsphereShape};
    use crate::physics::collision::{BoundingSphere, PartId};

    fn ball(radius: f32) -> HitbodyLayout {
        let mut layout = HitbodyLayout {
            spheres: vec![HitsphereShape { part: PartId(0), offset: Vec3::zeros(), radius }],
            ..Default::default()
        };
        layout.fit_proximity(0.0);
        layout
    }

    fn body_at(x: f32) -> Hitbody {
        Hitbody::new(ball(0.5), Transform::from_position(Vec3::new(x, 0.0, 0.0)))
    }

    fn z_ray(x: f32) -> Ray {
        Ray::new(Vec3::new(x, 0.0, -10.0), Vec3::new(0.0, 0.0, 1.0)).unwrap()
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut world = HitboxWorld::new();
        world.register_body(BodyId(1), body_at(0.0)).unwrap();

        let result = world.register_body(BodyId(1), body_at(1.0));

        assert!(matches!(result, Err(HitboxError::DuplicateBody(BodyId(1)))));
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_register_rejects_past_capacity() {
        let mut world = HitboxWorld::new();
        for id in 0..MAX_BODIES as u32 {
            world.register_body(BodyId(id), body_at(0.0)).unwrap();
        }

        let result = world.register_body(BodyId(1000), body_at(0.0));

        assert!(matches!(result, Err(HitboxError::TooManyBodies { capacity: MAX_BODIES })));
    }

    #[test]
    fn test_unregister_unknown_body_fails() {
        let mut world: HitboxWorld<Hitbody> = HitboxWorld::new();

        let result = world.unregister_body(BodyId(5));

        assert!(matches!(result, Err(HitboxError::UnknownBody(BodyId(5)))));
    }

    #[test]
    fn test_unregister_keeps_capture_order() {
        let mut world = HitboxWorld::new();
        for id in 1..=3 {
            world.register_body(BodyId(id), body_at(id as f32 * 3.0)).unwrap();
        }

        let removed = world.unregister_body(BodyId(2)).unwrap();
        world.advance_frame(1).unwrap();

        assert_eq!(removed.transform().position.x, 6.0);
        assert_eq!(world.body_ids().collect::<Vec<_>>(), vec![BodyId(1), BodyId(3)]);
        assert_eq!(world.snapshot(1).proximity().bodies(), &[BodyId(1), BodyId(3)]);
    }

    #[test]
    fn test_rewind_sees_past_pose() {
        let mut world = HitboxWorld::new();
        world.register_body(BodyId(1), body_at(0.0)).unwrap();
        world.advance_frame(1).unwrap();

        world.body_mut(BodyId(1)).unwrap().translate(Vec3::new(5.0, 0.0, 0.0));
        world.advance_frame(2).unwrap();

        let past = world.raycast(1, &z_ray(0.0)).unwrap();
        assert_eq!(past.hit_object.body, BodyId(1));
        assert!(world.raycast(2, &z_ray(0.0)).is_none());
        assert!(world.raycast(2, &z_ray(5.0)).is_some());
    }

    #[test]
    fn test_unregistered_body_stays_in_past_snapshots() {
        let mut world = HitboxWorld::new();
        world.register_body(BodyId(1), body_at(0.0)).unwrap();
        world.advance_frame(1).unwrap();
        world.unregister_body(BodyId(1)).unwrap();
        world.advance_frame(2).unwrap();

        assert!(world.raycast(1, &z_ray(0.0)).is_some());
        assert!(world.raycast(2, &z_ray(0.0)).is_none());
    }

    #[test]
    fn test_boxed_sources_mix_kinds() {
        struct Pillar;

        impl GeometrySource for Pillar {
            fn proximity_volume(&self) -> BoundingSphere {
                BoundingSphere::new(Vec3::new(3.0, 0.0, 0.0), 1.0)
            }
        }

        let mut world: HitboxWorld = HitboxWorld::new();
        world.register_body(BodyId(1), Box::new(body_at(0.0))).unwrap();
        world.register_body(BodyId(2), Box::new(Pillar)).unwrap();
        world.advance_frame(1).unwrap();

        assert_eq!(world.snapshot(1).body_count(), 2);
        assert!(world.raycast(1, &z_ray(3.0)).is_none());
    }

    #[test]
    fn test_raycast_with_external_scratch_matches_owned() {
        let mut world = HitboxWorld::new();
        world.register_body(BodyId(1), body_at(0.0)).unwrap();
        world.advance_frame(1).unwrap();
        let mut scratch = RaycastScratch::new();

        let external = world.raycast_with(1, &z_ray(0.0), &mut scratch);
        let owned = world.raycast(1, &z_ray(0.0));

        assert_eq!(external, owned);
        assert_eq!(scratch.candidate_count(), 1);
    }

    #[test]
    fn test_failed_capture_is_reported_and_slot_empty() {
        let mut world = HitboxWorld::new();
        let mut layout = ball(0.5);
        layout.spheres = vec![layout.spheres[0].clone(); 17];
        world.register_body(BodyId(1), Hitbody::new(layout, Transform::identity())).unwrap();

        let result = world.advance_frame(1);

        assert!(matches!(result, Err(HitboxError::PerBodyLimitExceeded { .. })));
        assert_eq!(world.current_frame(), 1);
        assert_eq!(world.snapshot(1).body_count(), 0);
    }
}
