//! Ray intersection tests for the narrow phase
//!
//! Every test returns the distance along the ray to the first contact, or
//! `f32::INFINITY` when there is none. Distances are measured in units of
//! the world-space ray, so they stay comparable across primitive kinds even
//! when a test runs in a primitive's local space.

use crate::foundation::math::{transform_point, transform_vector, Mat4, Vec2, Vec3};

use super::primitives::{CapsuleAxis, LocalBounds};

/// Below this a local direction component counts as parallel to a slab
const PARALLEL_EPSILON: f32 = 1e-9;

/// Ray against sphere
///
/// A ray starting inside the sphere hits at distance 0.
pub fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> f32 {
    let m = origin - center;
    let a = direction.dot(&direction);
    let b = m.dot(&direction);
    let c = m.dot(&m) - radius * radius;

    // Origin outside the sphere and pointing away from it
    if c > 0.0 && b > 0.0 {
        return f32::INFINITY;
    }

    if a <= PARALLEL_EPSILON {
        return if c <= 0.0 { 0.0 } else { f32::INFINITY };
    }

    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return f32::INFINITY;
    }

    let t = (-b - discriminant.sqrt()) / a;
    t.max(0.0)
}

/// Ray against an oriented box (slab method in box-local space)
///
/// `world_to_local` maps world space into the space where `bounds` is
/// axis-aligned. A ray starting inside the box hits at distance 0.
pub fn ray_box(origin: Vec3, direction: Vec3, world_to_local: &Mat4, bounds: &LocalBounds) -> f32 {
    let local_origin = transform_point(world_to_local, &origin);
    let local_direction = transform_vector(world_to_local, &direction);

    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let o = local_origin[axis];
        let d = local_direction[axis];
        let (lo, hi) = (bounds.min[axis], bounds.max[axis]);

        if d.abs() < PARALLEL_EPSILON {
            if o < lo || o > hi {
                return f32::INFINITY;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t0 = (lo - o) * inv;
        let mut t1 = (hi - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
    }

    if t_far < 0.0 || t_near > t_far {
        f32::INFINITY
    } else {
        t_near.max(0.0)
    }
}

/// Ray against a capsule (finite cylinder plus two end caps)
///
/// `center` is the capsule center in its local space, `height` the total
/// length along `axis` including both caps. The radius is clamped to half
/// the height.
pub fn ray_capsule(
    origin: Vec3,
    direction: Vec3,
    world_to_local: &Mat4,
    center: Vec3,
    radius: f32,
    height: f32,
    axis: CapsuleAxis,
) -> f32 {
    let local_origin = transform_point(world_to_local, &origin);
    let local_direction = transform_vector(world_to_local, &direction);

    let radius = radius.min(height * 0.5);
    let half_segment = (height * 0.5 - radius).max(0.0);

    // Infinite cylinder, solved in the plane orthogonal to the axis
    let (u, v) = axis.plane();
    let m = Vec2::new(local_origin[u] - center[u], local_origin[v] - center[v]);
    let d = Vec2::new(local_direction[u], local_direction[v]);

    let a = d.dot(&d);
    let b = d.dot(&m);
    let c = m.dot(&m) - radius * radius;

    let t_cylinder = if a <= PARALLEL_EPSILON {
        if c > 0.0 {
            return f32::INFINITY;
        }
        0.0
    } else {
        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            return f32::INFINITY;
        }
        let root = discriminant.sqrt();
        if (-b + root) / a < 0.0 {
            return f32::INFINITY;
        }
        ((-b - root) / a).max(0.0)
    };

    let k = axis.index();
    let along = local_origin[k] + local_direction[k] * t_cylinder - center[k];

    if along > half_segment {
        let cap = center + axis.unit() * half_segment;
        ray_sphere(local_origin, local_direction, cap, radius)
    } else if along < -half_segment {
        let cap = center - axis.unit() * half_segment;
        ray_sphere(local_origin, local_direction, cap, radius)
    } else {
        t_cylinder
    }
}
