//! Geometry sources: the capability a body exposes to snapshot capture
//!
//! The world never looks at a scene graph. Each registered body implements
//! [`GeometrySource`] and, once per capture, writes its current world-space
//! geometry through a [`PrimitiveSink`], which enforces per-body and
//! world-wide limits and stamps every primitive with its owner.
//!
//! [`Hitbody`] is a ready-made source: a rig of boxes, spheres and capsules
//! authored in body space (see [`HitbodyLayout`]) and posed by a
//! [`Transform`] every tick.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{HitboxError, Result};
use crate::foundation::math::{transform_point, Mat4, Transform, Vec3};

use super::collision::{BodyId, BoundingSphere, CapsuleAxis, HitObject, LocalBounds, PartId};
use super::storage::{HitCapsuleArrays, HitboxArrays, HitsphereArrays, NarrowArrays};

/// A box as reported by a geometry source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    /// Box space to world space
    pub local_to_world: Mat4,
    /// Extents in box space
    pub bounds: LocalBounds,
    /// Part this box belongs to
    pub part: PartId,
}

/// A sphere as reported by a geometry source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitsphere {
    /// World-space center
    pub center: Vec3,
    /// Radius
    pub radius: f32,
    /// Part this sphere belongs to
    pub part: PartId,
}

/// A capsule as reported by a geometry source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitCapsule {
    /// World-space center
    pub center: Vec3,
    /// Capsule space to world space
    pub local_to_world: Mat4,
    /// Cap radius
    pub radius: f32,
    /// Total length along the axis, caps included
    pub height: f32,
    /// Principal axis in capsule space
    pub axis: CapsuleAxis,
    /// Part this capsule belongs to
    pub part: PartId,
}

/// Write access to one narrow-phase container for one body during capture
pub struct PrimitiveSink<'a, A> {
    arrays: &'a mut A,
    body: BodyId,
    limit: usize,
    written: usize,
}

/// Sink for boxes
pub type BoxSink<'a> = PrimitiveSink<'a, HitboxArrays>;

/// Sink for spheres
pub type SphereSink<'a> = PrimitiveSink<'a, HitsphereArrays>;

/// Sink for capsules
pub type CapsuleSink<'a> = PrimitiveSink<'a, HitCapsuleArrays>;

impl<'a, A: NarrowArrays> PrimitiveSink<'a, A> {
    /// Wrap `arrays` for `body`, allowing at most `limit` appends
    pub fn new(arrays: &'a mut A, body: BodyId, limit: usize) -> Self {
        Self {
            arrays,
            body,
            limit,
            written: 0,
        }
    }

    /// Number of primitives appended through this sink
    pub fn written(&self) -> usize {
        self.written
    }

    /// Body the sink writes for
    pub fn body(&self) -> BodyId {
        self.body
    }

    fn check_limit(&self) -> Result<()> {
        if self.written >= self.limit {
            return Err(HitboxError::PerBodyLimitExceeded {
                body: self.body,
                kind: A::KIND,
                limit: self.limit,
            });
        }
        Ok(())
    }

    fn owner(&self, part: PartId) -> HitObject {
        HitObject::new(self.body, part)
    }

    fn invert(&self, local_to_world: &Mat4) -> Result<Mat4> {
        local_to_world.try_inverse().ok_or(HitboxError::SingularTransform {
            body: self.body,
            kind: A::KIND,
        })
    }
}

impl PrimitiveSink<'_, HitboxArrays> {
    /// Append a box
    pub fn push(&mut self, hitbox: Hitbox) -> Result<()> {
        self.check_limit()?;
        let world_to_local = self.invert(&hitbox.local_to_world)?;
        let owner = self.owner(hitbox.part);
        self.arrays.push(world_to_local, hitbox.bounds, owner)?;
        self.written += 1;
        Ok(())
    }
}

impl PrimitiveSink<'_, HitsphereArrays> {
    /// Append a sphere
    pub fn push(&mut self, sphere: Hitsphere) -> Result<()> {
        self.check_limit()?;
        let owner = self.owner(sphere.part);
        self.arrays.push(BoundingSphere::new(sphere.center, sphere.radius), owner)?;
        self.written += 1;
        Ok(())
    }
}

impl PrimitiveSink<'_, HitCapsuleArrays> {
    /// Append a capsule
    pub fn push(&mut self, capsule: HitCapsule) -> Result<()> {
        self.check_limit()?;
        let world_to_local = self.invert(&capsule.local_to_world)?;
        let local_center = transform_point(&world_to_local, &capsule.center);
        let owner = self.owner(capsule.part);
        self.arrays.push(
            world_to_local,
            local_center,
            capsule.radius,
            capsule.height,
            capsule.axis,
            owner,
        )?;
        self.written += 1;
        Ok(())
    }
}

/// Everything capture needs to know about a body
///
/// Reports must be stable in length within a tick. The proximity volume must
/// enclose every reported primitive, or the broad phase will cull real hits.
pub trait GeometrySource {
    /// Broad-phase sphere enclosing all of this body's primitives
    fn proximity_volume(&self) -> BoundingSphere;

    /// Append this body's boxes
    fn report_boxes(&self, sink: &mut BoxSink<'_>) -> Result<()> {
        let _ = sink;
        Ok(())
    }

    /// Append this body's spheres
    fn report_spheres(&self, sink: &mut SphereSink<'_>) -> Result<()> {
        let _ = sink;
        Ok(())
    }

    /// Append this body's capsules
    fn report_capsules(&self, sink: &mut CapsuleSink<'_>) -> Result<()> {
        let _ = sink;
        Ok(())
    }
}

impl<T: GeometrySource + ?Sized> GeometrySource for Box<T> {
    fn proximity_volume(&self) -> BoundingSphere {
        (**self).proximity_volume()
    }

    fn report_boxes(&self, sink: &mut BoxSink<'_>) -> Result<()> {
        (**self).report_boxes(sink)
    }

    fn report_spheres(&self, sink: &mut SphereSink<'_>) -> Result<()> {
        (**self).report_spheres(sink)
    }

    fn report_capsules(&self, sink: &mut CapsuleSink<'_>) -> Result<()> {
        (**self).report_capsules(sink)
    }
}

/// A box part in body space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitboxShape {
    /// Part id reported on hit
    pub part: PartId,
    /// Pose of the box relative to the body
    #[serde(default)]
    pub transform: Transform,
    /// Box center in its own space
    #[serde(default = "Vec3::zeros")]
    pub center: Vec3,
    /// Full size along each axis
    pub size: Vec3,
}

impl HitboxShape {
    /// Local bounds from center and size
    pub fn bounds(&self) -> LocalBounds {
        LocalBounds::from_center_size(self.center, self.size)
    }
}

/// A sphere part in body space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitsphereShape {
    /// Part id reported on hit
    pub part: PartId,
    /// Center relative to the body origin
    #[serde(default = "Vec3::zeros")]
    pub offset: Vec3,
    /// Radius
    pub radius: f32,
}

/// A capsule part in body space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitCapsuleShape {
    /// Part id reported on hit
    pub part: PartId,
    /// Pose of the capsule relative to the body
    #[serde(default)]
    pub transform: Transform,
    /// Capsule center in its own space
    #[serde(default = "Vec3::zeros")]
    pub center: Vec3,
    /// Cap radius
    pub radius: f32,
    /// Total length, caps included
    pub height: f32,
    /// Principal axis in its own space
    #[serde(default)]
    pub axis: CapsuleAxis,
}

/// Authored layout of a body's hit parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitbodyLayout {
    /// Proximity sphere radius
    pub proximity_radius: f32,
    /// Proximity sphere center relative to the body origin
    pub proximity_offset: Vec3,
    /// Box parts
    pub boxes: Vec<HitboxShape>,
    /// Sphere parts
    pub spheres: Vec<HitsphereShape>,
    /// Capsule parts
    pub capsules: Vec<HitCapsuleShape>,
}

impl Default for HitbodyLayout {
    fn default() -> Self {
        Self {
            proximity_radius: 0.0,
            proximity_offset: Vec3::zeros(),
            boxes: Vec::new(),
            spheres: Vec::new(),
            capsules: Vec::new(),
        }
    }
}

impl Config for HitbodyLayout {}

impl HitbodyLayout {
    /// Smallest proximity radius enclosing every part, in body space
    pub fn enclosing_radius(&self) -> f32 {
        let origin = self.proximity_offset;
        let mut required: f32 = 0.0;

        for shape in &self.boxes {
            for corner in shape.bounds().corners() {
                let point = shape.transform.transform_point(corner);
                required = required.max((point - origin).norm());
            }
        }

        for shape in &self.spheres {
            required = required.max((shape.offset - origin).norm() + shape.radius);
        }

        for shape in &self.capsules {
            let radius = shape.radius.min(shape.height * 0.5);
            let half_segment = (shape.height * 0.5 - radius).max(0.0);
            let scaled_radius = radius * shape.transform.max_scale();
            for sign in [-1.0_f32, 1.0] {
                let cap = shape.center + shape.axis.unit() * (half_segment * sign);
                let point = shape.transform.transform_point(cap);
                required = required.max((point - origin).norm() + scaled_radius);
            }
        }

        required
    }

    /// Check that the proximity radius encloses every part
    pub fn validate_enclosure(&self) -> Result<()> {
        let required = self.enclosing_radius();
        if self.proximity_radius + 1e-4 < required {
            return Err(HitboxError::ProximityTooSmall {
                radius: self.proximity_radius,
                required,
            });
        }
        Ok(())
    }

    /// Set the proximity radius to the enclosing radius plus `margin`
    pub fn fit_proximity(&mut self, margin: f32) {
        self.proximity_radius = self.enclosing_radius() + margin;
    }
}

/// A posed rig of hit parts
#[derive(Debug, Clone, PartialEq)]
pub struct Hitbody {
    layout: HitbodyLayout,
    transform: Transform,
}

impl Hitbody {
    /// Pose `layout` at `transform`
    pub fn new(layout: HitbodyLayout, transform: Transform) -> Self {
        Self { layout, transform }
    }

    /// Authored layout
    pub fn layout(&self) -> &HitbodyLayout {
        &self.layout
    }

    /// Current world pose
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Move the body; takes effect at the next capture
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Move the body by a translation
    pub fn translate(&mut self, delta: Vec3) {
        self.transform.position += delta;
    }
}

impl GeometrySource for Hitbody {
    fn proximity_volume(&self) -> BoundingSphere {
        BoundingSphere::new(
            self.transform.transform_point(self.layout.proximity_offset),
            self.layout.proximity_radius * self.transform.max_scale(),
        )
    }

    fn report_boxes(&self, sink: &mut BoxSink<'_>) -> Result<()> {
        for shape in &self.layout.boxes {
            sink.push(Hitbox {
                local_to_world: self.transform.combine(&shape.transform).to_matrix(),
                bounds: shape.bounds(),
                part: shape.part,
            })?;
        }
        Ok(())
    }

    fn report_spheres(&self, sink: &mut SphereSink<'_>) -> Result<()> {
        for shape in &self.layout.spheres {
            sink.push(Hitsphere {
                center: self.transform.transform_point(shape.offset),
                radius: shape.radius * self.transform.max_scale(),
                part: shape.part,
            })?;
        }
        Ok(())
    }

    fn report_capsules(&self, sink: &mut CapsuleSink<'_>) -> Result<()> {
        for shape in &self.layout.capsules {
            let pose = self.transform.combine(&shape.transform);
            sink.push(HitCapsule {
                center: pose.transform_point(shape.center),
                local_to_world: pose.to_matrix(),
                radius: shape.radius,
                height: shape.height,
                axis: shape.axis,
                part: shape.part,
            })?;
        }
        Ok(())
    }
}
