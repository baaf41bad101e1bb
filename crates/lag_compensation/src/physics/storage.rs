//! Flat struct-of-arrays storage for snapshot geometry
//!
//! Each container allocates its columns once at construction and tracks a
//! live `count` separately from its capacity. Captures reset `count` to zero
//! and overwrite the prefix in place; nothing is shrunk element by element.
//! Appending past capacity is a checked error, never an out-of-bounds write.

use std::fmt;
use std::ops::Range;

use crate::error::{HitboxError, Result};
use crate::foundation::math::{Mat4, Vec3};

use super::collision::{
    ray_box, ray_capsule, ray_sphere, BodyId, BoundingSphere, CapsuleAxis, HitObject, LocalBounds,
    Ray,
};

/// The kinds of geometry a snapshot stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Broad-phase proximity sphere
    Proximity,
    /// Oriented box
    Box,
    /// Sphere
    Sphere,
    /// Capsule
    Capsule,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Proximity => "proximity",
            PrimitiveKind::Box => "box",
            PrimitiveKind::Sphere => "sphere",
            PrimitiveKind::Capsule => "capsule",
        };
        f.write_str(name)
    }
}

#[inline]
fn ensure_room(
    kind: PrimitiveKind,
    count: usize,
    additional: usize,
    capacity: usize,
) -> Result<()> {
    if count + additional > capacity {
        return Err(HitboxError::CapacityExceeded { kind, capacity });
    }
    Ok(())
}

/// Operations shared by the narrow-phase containers
///
/// Used by the query engine to gather candidate spans and test them without
/// caring which primitive kind it is looking at.
pub trait NarrowArrays {
    /// Kind stored in this container
    const KIND: PrimitiveKind;

    /// Number of live elements
    fn len(&self) -> usize;

    /// Fixed capacity
    fn capacity(&self) -> usize;

    /// Whether no elements are live
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all live elements (storage is kept)
    fn clear(&mut self);

    /// Append `range` of `source` after this container's live elements
    fn gather(&mut self, source: &Self, range: Range<usize>) -> Result<()>;

    /// Owner of the element at `index`
    fn hit_object(&self, index: usize) -> HitObject;

    /// Ray distance to the element at `index`
    fn intersect(&self, index: usize, ray: &Ray) -> f32;
}

/// Proximity volumes plus the prefix-sum span table into the narrow-phase
/// containers
#[derive(Debug, Clone)]
pub struct ProximityArrays {
    center: Vec<Vec3>,
    radius: Vec<f32>,
    bodies: Vec<BodyId>,
    box_start: Vec<usize>,
    sphere_start: Vec<usize>,
    capsule_start: Vec<usize>,
    count: usize,
}

/// Running counts of the three narrow-phase containers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimitiveCounts {
    /// Boxes
    pub boxes: usize,
    /// Spheres
    pub spheres: usize,
    /// Capsules
    pub capsules: usize,
}

impl ProximityArrays {
    /// Allocate storage for `capacity` bodies
    pub fn new(capacity: usize) -> Self {
        Self {
            center: vec![Vec3::zeros(); capacity],
            radius: vec![0.0; capacity],
            bodies: vec![BodyId::default(); capacity],
            box_start: vec![0; capacity + 1],
            sphere_start: vec![0; capacity + 1],
            capsule_start: vec![0; capacity + 1],
            count: 0,
        }
    }

    /// Number of live proximity volumes
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no volumes are live
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.center.len()
    }

    /// Drop all live volumes
    pub fn clear(&mut self) {
        self.count = 0;
        self.box_start[0] = 0;
        self.sphere_start[0] = 0;
        self.capsule_start[0] = 0;
    }

    /// Append a body's volume; its spans start at `starts`
    ///
    /// The span stays empty until [`close_span`](Self::close_span) records
    /// where it ends.
    pub fn push(
        &mut self,
        body: BodyId,
        volume: BoundingSphere,
        starts: PrimitiveCounts,
    ) -> Result<usize> {
        ensure_room(PrimitiveKind::Proximity, self.count, 1, self.capacity())?;
        let index = self.count;

        self.center[index] = volume.center;
        self.radius[index] = volume.radius;
        self.bodies[index] = body;

        self.box_start[index] = starts.boxes;
        self.sphere_start[index] = starts.spheres;
        self.capsule_start[index] = starts.capsules;
        self.box_start[index + 1] = starts.boxes;
        self.sphere_start[index + 1] = starts.spheres;
        self.capsule_start[index + 1] = starts.capsules;

        self.count += 1;
        Ok(index)
    }

    /// Record where the spans of volume `index` end (exclusive)
    pub fn close_span(&mut self, index: usize, ends: PrimitiveCounts) {
        debug_assert!(index < self.count);
        self.box_start[index + 1] = ends.boxes;
        self.sphere_start[index + 1] = ends.spheres;
        self.capsule_start[index + 1] = ends.capsules;
    }

    /// The volume at `index` as a sphere
    pub fn volume(&self, index: usize) -> BoundingSphere {
        BoundingSphere::new(self.center[index], self.radius[index])
    }

    /// Body owning the volume at `index`
    pub fn body(&self, index: usize) -> BodyId {
        self.bodies[index]
    }

    /// Live volume centers
    pub fn centers(&self) -> &[Vec3] {
        &self.center[..self.count]
    }

    /// Live volume radii
    pub fn radii(&self) -> &[f32] {
        &self.radius[..self.count]
    }

    /// Live body ids, in capture order
    pub fn bodies(&self) -> &[BodyId] {
        &self.bodies[..self.count]
    }

    /// Box span of volume `index`
    pub fn box_range(&self, index: usize) -> Range<usize> {
        self.box_start[index]..self.box_start[index + 1]
    }

    /// Sphere span of volume `index`
    pub fn sphere_range(&self, index: usize) -> Range<usize> {
        self.sphere_start[index]..self.sphere_start[index + 1]
    }

    /// Capsule span of volume `index`
    pub fn capsule_range(&self, index: usize) -> Range<usize> {
        self.capsule_start[index]..self.capsule_start[index + 1]
    }

    /// Box prefix-sum offsets, `len() + 1` entries
    pub fn box_starts(&self) -> &[usize] {
        &self.box_start[..=self.count]
    }

    /// Sphere prefix-sum offsets, `len() + 1` entries
    pub fn sphere_starts(&self) -> &[usize] {
        &self.sphere_start[..=self.count]
    }

    /// Capsule prefix-sum offsets, `len() + 1` entries
    pub fn capsule_starts(&self) -> &[usize] {
        &self.capsule_start[..=self.count]
    }
}

/// Oriented boxes: world-to-local transform plus local bounds
#[derive(Debug, Clone)]
pub struct HitboxArrays {
    world_to_local: Vec<Mat4>,
    bounds: Vec<LocalBounds>,
    hit_objects: Vec<HitObject>,
    count: usize,
}

impl HitboxArrays {
    /// Allocate storage for `capacity` boxes
    pub fn new(capacity: usize) -> Self {
        Self {
            world_to_local: vec![Mat4::identity(); capacity],
            bounds: vec![LocalBounds::default(); capacity],
            hit_objects: vec![HitObject::default(); capacity],
            count: 0,
        }
    }

    /// Append a box
    pub fn push(
        &mut self,
        world_to_local: Mat4,
        bounds: LocalBounds,
        owner: HitObject,
    ) -> Result<usize> {
        ensure_room(Self::KIND, self.count, 1, self.capacity())?;
        let index = self.count;
        self.world_to_local[index] = world_to_local;
        self.bounds[index] = bounds;
        self.hit_objects[index] = owner;
        self.count += 1;
        Ok(index)
    }

    /// Live world-to-local transforms
    pub fn world_to_local(&self) -> &[Mat4] {
        &self.world_to_local[..self.count]
    }

    /// Live local bounds
    pub fn bounds(&self) -> &[LocalBounds] {
        &self.bounds[..self.count]
    }

    /// Live owners
    pub fn hit_objects(&self) -> &[HitObject] {
        &self.hit_objects[..self.count]
    }
}

impl NarrowArrays for HitboxArrays {
    const KIND: PrimitiveKind = PrimitiveKind::Box;

    fn len(&self) -> usize {
        self.count
    }

    fn capacity(&self) -> usize {
        self.bounds.len()
    }

    fn clear(&mut self) {
        self.count = 0;
    }

    fn gather(&mut self, source: &Self, range: Range<usize>) -> Result<()> {
        debug_assert!(range.end <= source.count);
        let len = range.len();
        ensure_room(Self::KIND, self.count, len, self.capacity())?;
        let dest = self.count..self.count + len;

        self.world_to_local[dest.clone()].copy_from_slice(&source.world_to_local[range.clone()]);
        self.bounds[dest.clone()].copy_from_slice(&source.bounds[range.clone()]);
        self.hit_objects[dest].copy_from_slice(&source.hit_objects[range]);

        self.count += len;
        Ok(())
    }

    fn hit_object(&self, index: usize) -> HitObject {
        self.hit_objects[index]
    }

    fn intersect(&self, index: usize, ray: &Ray) -> f32 {
        ray_box(ray.origin, ray.direction, &self.world_to_local[index], &self.bounds[index])
    }
}

/// World-space spheres
#[derive(Debug, Clone)]
pub struct HitsphereArrays {
    center: Vec<Vec3>,
    radius: Vec<f32>,
    hit_objects: Vec<HitObject>,
    count: usize,
}

impl HitsphereArrays {
    /// Allocate storage for `capacity` spheres
    pub fn new(capacity: usize) -> Self {
        Self {
            center: vec![Vec3::zeros(); capacity],
            radius: vec![0.0; capacity],
            hit_objects: vec![HitObject::default(); capacity],
            count: 0,
        }
    }

    /// Append a sphere
    pub fn push(&mut self, sphere: BoundingSphere, owner: HitObject) -> Result<usize> {
        ensure_room(Self::KIND, self.count, 1, self.capacity())?;
        let index = self.count;
        self.center[index] = sphere.center;
        self.radius[index] = sphere.radius;
        self.hit_objects[index] = owner;
        self.count += 1;
        Ok(index)
    }

    /// Live centers
    pub fn centers(&self) -> &[Vec3] {
        &self.center[..self.count]
    }

    /// Live radii
    pub fn radii(&self) -> &[f32] {
        &self.radius[..self.count]
    }

    /// Live owners
    pub fn hit_objects(&self) -> &[HitObject] {
        &self.hit_objects[..self.count]
    }
}

impl NarrowArrays for HitsphereArrays {
    const KIND: PrimitiveKind = PrimitiveKind::Sphere;

    fn len(&self) -> usize {
        self.count
    }

    fn capacity(&self) -> usize {
        self.center.len()
    }

    fn clear(&mut self) {
        self.count = 0;
    }

    fn gather(&mut self, source: &Self, range: Range<usize>) -> Result<()> {
        debug_assert!(range.end <= source.count);
        let len = range.len();
        ensure_room(Self::KIND, self.count, len, self.capacity())?;
        let dest = self.count..self.count + len;

        self.center[dest.clone()].copy_from_slice(&source.center[range.clone()]);
        self.radius[dest.clone()].copy_from_slice(&source.radius[range.clone()]);
        self.hit_objects[dest].copy_from_slice(&source.hit_objects[range]);

        self.count += len;
        Ok(())
    }

    fn hit_object(&self, index: usize) -> HitObject {
        self.hit_objects[index]
    }

    fn intersect(&self, index: usize, ray: &Ray) -> f32 {
        ray_sphere(ray.origin, ray.direction, self.center[index], self.radius[index])
    }
}

/// Capsules: world-to-local transform, local center, radius, height, axis
#[derive(Debug, Clone)]
pub struct HitCapsuleArrays {
    world_to_local: Vec<Mat4>,
    center: Vec<Vec3>,
    radius: Vec<f32>,
    height: Vec<f32>,
    axis: Vec<CapsuleAxis>,
    hit_objects: Vec<HitObject>,
    count: usize,
}

impl HitCapsuleArrays {
    /// Allocate storage for `capacity` capsules
    pub fn new(capacity: usize) -> Self {
        Self {
            world_to_local: vec![Mat4::identity(); capacity],
            center: vec![Vec3::zeros(); capacity],
            radius: vec![0.0; capacity],
            height: vec![0.0; capacity],
            axis: vec![CapsuleAxis::default(); capacity],
            hit_objects: vec![HitObject::default(); capacity],
            count: 0,
        }
    }

    /// Append a capsule; `local_center` is in the capsule's local space
    pub fn push(
        &mut self,
        world_to_local: Mat4,
        local_center: Vec3,
        radius: f32,
        height: f32,
        axis: CapsuleAxis,
        owner: HitObject,
    ) -> Result<usize> {
        ensure_room(Self::KIND, self.count, 1, self.capacity())?;
        let index = self.count;
        self.world_to_local[index] = world_to_local;
        self.center[index] = local_center;
        self.radius[index] = radius;
        self.height[index] = height;
        self.axis[index] = axis;
        self.hit_objects[index] = owner;
        self.count += 1;
        Ok(index)
    }

    /// Live world-to-local transforms
    pub fn world_to_local(&self) -> &[Mat4] {
        &self.world_to_local[..self.count]
    }

    /// Live local centers
    pub fn centers(&self) -> &[Vec3] {
        &self.center[..self.count]
    }

    /// Live radii
    pub fn radii(&self) -> &[f32] {
        &self.radius[..self.count]
    }

    /// Live total heights
    pub fn heights(&self) -> &[f32] {
        &self.height[..self.count]
    }

    /// Live principal axes
    pub fn axes(&self) -> &[CapsuleAxis] {
        &self.axis[..self.count]
    }

    /// Live owners
    pub fn hit_objects(&self) -> &[HitObject] {
        &self.hit_objects[..self.count]
    }
}

impl NarrowArrays for HitCapsuleArrays {
    const KIND: PrimitiveKind = PrimitiveKind::Capsule;

    fn len(&self) -> usize {
        self.count
    }

    fn capacity(&self) -> usize {
        self.center.len()
    }

    fn clear(&mut self) {
        self.count = 0;
    }

    fn gather(&mut self, source: &Self, range: Range<usize>) -> Result<()> {
        debug_assert!(range.end <= source.count);
        let len = range.len();
        ensure_room(Self::KIND, self.count, len, self.capacity())?;
        let dest = self.count..self.count + len;

        self.world_to_local[dest.clone()].copy_from_slice(&source.world_to_local[range.clone()]);
        self.center[dest.clone()].copy_from_slice(&source.center[range.clone()]);
        self.radius[dest.clone()].copy_from_slice(&source.radius[range.clone()]);
        self.height[dest.clone()].copy_from_slice(&source.height[range.clone()]);
        self.axis[dest.clone()].copy_from_slice(&source.axis[range.clone()]);
        self.hit_objects[dest].copy_from_slice(&source.hit_objects[range]);

        self.count += len;
        Ok(())
    }

    fn hit_object(&self, index: usize) -> HitObject {
        self.hit_objects[index]
    }

    fn intersect(&self, index: usize, ray: &Ray) -> f32 {
        ray_capsule(
            ray.origin,
            ray.direction,
            &self.world_to_local[index],
            self.center[index],
            self.radius[index],
            self.height[index],
            self.axis[index],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::PartId;

    fn owner(body: u32, part: u32) -> HitObject {
        HitObject::new(BodyId(body), PartId(part))
    }

    fn sphere(x: f32) -> BoundingSphere {
        BoundingSphere::new(Vec3::new(x, 0.0, 0.0), 0.5)
    }

    #[test]
    fn test_push_beyond_capacity_is_an_error() {
        let mut spheres = HitsphereArrays::new(2);
        spheres.push(sphere(0.0), owner(1, 0)).unwrap();
        spheres.push(sphere(1.0), owner(1, 1)).unwrap();

        let result = spheres.push(sphere(2.0), owner(1, 2));

        assert!(matches!(
            result,
            Err(HitboxError::CapacityExceeded { kind: PrimitiveKind::Sphere, capacity: 2 })
        ));
        assert_eq!(spheres.len(), 2);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut boxes = HitboxArrays::new(4);
        boxes.push(Mat4::identity(), LocalBounds::default(), owner(1, 0)).unwrap();
        boxes.clear();

        assert!(boxes.is_empty());
        assert_eq!(boxes.capacity(), 4);
        assert!(boxes.bounds().is_empty());
    }

    #[test]
    fn test_gather_appends_subrange_into_fresh_container() {
        let mut source = HitsphereArrays::new(8);
        for i in 0..5 {
            source.push(sphere(i as f32), owner(i, i)).unwrap();
        }

        let mut scratch = HitsphereArrays::new(8);
        scratch.gather(&source, 1..3).unwrap();
        scratch.gather(&source, 4..5).unwrap();

        assert_eq!(scratch.len(), 3);
        assert_eq!(scratch.centers()[0].x, 1.0);
        assert_eq!(scratch.centers()[1].x, 2.0);
        assert_eq!(scratch.centers()[2].x, 4.0);
        assert_eq!(scratch.hit_object(2), owner(4, 4));
    }

    #[test]
    fn test_gather_capsules_copies_every_column() {
        let mut source = HitCapsuleArrays::new(4);
        let transform = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        source
            .push(transform, Vec3::new(0.0, 0.5, 0.0), 0.3, 1.8, CapsuleAxis::Z, owner(7, 2))
            .unwrap();

        let mut scratch = HitCapsuleArrays::new(4);
        scratch.gather(&source, 0..1).unwrap();

        assert_eq!(scratch.world_to_local()[0], transform);
        assert_eq!(scratch.centers()[0], Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(scratch.radii()[0], 0.3);
        assert_eq!(scratch.heights()[0], 1.8);
        assert_eq!(scratch.axes()[0], CapsuleAxis::Z);
        assert_eq!(scratch.hit_object(0), owner(7, 2));
        // Source untouched
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_gather_beyond_capacity_is_an_error() {
        let mut source = HitboxArrays::new(4);
        for i in 0..4 {
            source.push(Mat4::identity(), LocalBounds::default(), owner(1, i)).unwrap();
        }
        let mut scratch = HitboxArrays::new(3);

        let result = scratch.gather(&source, 0..4);

        assert!(matches!(
            result,
            Err(HitboxError::CapacityExceeded { kind: PrimitiveKind::Box, .. })
        ));
        assert!(scratch.is_empty());
    }

    #[test]
    fn test_proximity_spans_are_prefix_sums() {
        let mut proximity = ProximityArrays::new(4);

        let a = proximity.push(BodyId(1), sphere(0.0), PrimitiveCounts::default()).unwrap();
        proximity.close_span(a, PrimitiveCounts { boxes: 2, spheres: 1, capsules: 0 });

        let starts = PrimitiveCounts { boxes: 2, spheres: 1, capsules: 0 };
        let b = proximity.push(BodyId(2), sphere(5.0), starts).unwrap();
        proximity.close_span(b, PrimitiveCounts { boxes: 3, spheres: 1, capsules: 2 });

        assert_eq!(proximity.box_starts(), &[0, 2, 3]);
        assert_eq!(proximity.sphere_starts(), &[0, 1, 1]);
        assert_eq!(proximity.capsule_starts(), &[0, 0, 2]);
        assert_eq!(proximity.box_range(1), 2..3);
        assert_eq!(proximity.sphere_range(1), 1..1);
        assert_eq!(proximity.bodies(), &[BodyId(1), BodyId(2)]);
    }
}
