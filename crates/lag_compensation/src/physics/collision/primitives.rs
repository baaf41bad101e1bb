//! Primitive collision types shared by capture and query
//!
//! Provides rays, hit results, owner handles and the small geometric
//! value types stored in the flat snapshot columns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HitboxError, Result};
use crate::foundation::math::Vec3;

use super::raycasts;

/// Identity of a registered combatant
///
/// Chosen by the caller (typically a network entity id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a hit part inside a body (head, torso, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(pub u32);

/// Owner handle stored next to every narrow-phase primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HitObject {
    /// Body the primitive was captured from
    pub body: BodyId,
    /// Part of that body
    pub part: PartId,
}

impl HitObject {
    /// Creates a new owner handle
    pub fn new(body: BodyId, part: PartId) -> Self {
        Self { body, part }
    }
}

/// A ray for hit validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray, normalizing the direction
    ///
    /// Fails for a zero-length or non-finite direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Result<Self> {
        let length = direction.norm();
        if !length.is_finite() || length <= f32::EPSILON || !origin.iter().all(|c| c.is_finite()) {
            return Err(HitboxError::InvalidRay);
        }
        Ok(Self {
            origin,
            direction: direction / length,
        })
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a successful raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    /// Distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// The primitive that was hit
    pub hit_object: HitObject,
}

/// A bounding sphere, used both as proximity volume and as hitsphere
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Distance along the ray to the sphere, `f32::INFINITY` on a miss
    pub fn intersect_ray(&self, ray: &Ray) -> f32 {
        raycasts::ray_sphere(ray.origin, ray.direction, self.center, self.radius)
    }

    /// Whether `other` lies completely inside this sphere
    pub fn encloses(&self, other: &BoundingSphere) -> bool {
        (other.center - self.center).norm() + other.radius <= self.radius + 1e-4
    }
}

/// Axis-aligned extents in a primitive's local space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalBounds {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Default for LocalBounds {
    fn default() -> Self {
        Self {
            min: Vec3::zeros(),
            max: Vec3::zeros(),
        }
    }
}

impl LocalBounds {
    /// Bounds from explicit corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds centered at `center` with the full `size` along each axis
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-size along each axis
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }
}

/// Principal axis of a capsule, in its local space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CapsuleAxis {
    /// Local X
    X,
    /// Local Y
    #[default]
    Y,
    /// Local Z
    Z,
}

impl CapsuleAxis {
    /// Component index of the axis (0, 1 or 2)
    pub const fn index(self) -> usize {
        match self {
            CapsuleAxis::X => 0,
            CapsuleAxis::Y => 1,
            CapsuleAxis::Z => 2,
        }
    }

    /// Unit vector along the axis
    pub fn unit(self) -> Vec3 {
        let mut axis = Vec3::zeros();
        axis[self.index()] = 1.0;
        axis
    }

    /// Component indices of the plane orthogonal to the axis
    pub const fn plane(self) -> (usize, usize) {
        match self {
            CapsuleAxis::X => (1, 2),
            CapsuleAxis::Y => (0, 2),
            CapsuleAxis::Z => (0, 1),
        }
    }
}
