//! One frame of captured hit geometry and the two-phase raycast over it
//!
//! A snapshot owns four flat containers. Capture rebuilds them from the
//! registered bodies in registration order, so each body's primitives form a
//! contiguous span delimited by the prefix-sum offsets stored next to its
//! proximity volume.
//!
//! Raycasts run in two phases: a broad phase against proximity volumes, then
//! a gather of the surviving bodies' spans into a [`RaycastScratch`] and an
//! exact narrow phase over that compacted candidate set.

use std::ops::Range;

use log::trace;

use crate::error::Result;
use crate::foundation::time::{CaptureMarker, CaptureTimings};

use super::body::{BoxSink, CapsuleSink, GeometrySource, SphereSink};
use super::collision::{BodyId, HitInfo, Ray};
use super::limits::{
    MAX_BOXES_PER_BODY, MAX_BOX_COUNT, MAX_CAPSULES_PER_BODY, MAX_CAPSULE_COUNT, MAX_OBJECTS,
    MAX_PROXIMITY_COUNT, MAX_SPHERES_PER_BODY, MAX_SPHERE_COUNT,
};
use super::storage::{
    HitCapsuleArrays, HitboxArrays, HitsphereArrays, NarrowArrays, PrimitiveCounts, ProximityArrays,
};

/// Where one body's primitives live inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodySpans {
    /// Range in the box container
    pub boxes: Range<usize>,
    /// Range in the sphere container
    pub spheres: Range<usize>,
    /// Range in the capsule container
    pub capsules: Range<usize>,
}

/// Reusable working buffers for raycasts
///
/// Owned by the caller so that queries against shared snapshots stay
/// reentrant: one scratch per concurrent query.
#[derive(Debug, Clone)]
pub struct RaycastScratch {
    live: Vec<bool>,
    boxes: HitboxArrays,
    spheres: HitsphereArrays,
    capsules: HitCapsuleArrays,
    distances: Vec<f32>,
}

impl Default for RaycastScratch {
    fn default() -> Self {
        Self::new()
    }
}

impl RaycastScratch {
    /// Scratch sized for the compile-time world limits
    ///
    /// One distance slot per object a full snapshot can hold.
    pub fn new() -> Self {
        Self {
            live: vec![false; MAX_PROXIMITY_COUNT],
            boxes: HitboxArrays::new(MAX_BOX_COUNT),
            spheres: HitsphereArrays::new(MAX_SPHERE_COUNT),
            capsules: HitCapsuleArrays::new(MAX_CAPSULE_COUNT),
            distances: vec![f32::INFINITY; MAX_OBJECTS],
        }
    }

    /// Scratch sized for explicit capacities
    pub fn with_capacity(bodies: usize, boxes: usize, spheres: usize, capsules: usize) -> Self {
        Self {
            live: vec![false; bodies],
            boxes: HitboxArrays::new(boxes),
            spheres: HitsphereArrays::new(spheres),
            capsules: HitCapsuleArrays::new(capsules),
            distances: vec![f32::INFINITY; boxes + spheres + capsules],
        }
    }

    /// Grow to fit `snapshot` if it was sized smaller
    fn reserve_for(&mut self, snapshot: &WorldSnapshot) {
        let bodies = snapshot.proximity.capacity();
        let boxes = snapshot.boxes.capacity();
        let spheres = snapshot.spheres.capacity();
        let capsules = snapshot.capsules.capacity();

        if self.live.len() < bodies
            || self.boxes.capacity() < boxes
            || self.spheres.capacity() < spheres
            || self.capsules.capacity() < capsules
        {
            *self = Self::with_capacity(
                bodies.max(self.live.len()),
                boxes.max(self.boxes.capacity()),
                spheres.max(self.spheres.capacity()),
                capsules.max(self.capsules.capacity()),
            );
        }
    }

    fn reset(&mut self) {
        self.boxes.clear();
        self.spheres.clear();
        self.capsules.clear();
    }

    /// Proximity volumes that survived the broad phase of the last query
    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|live| **live).count()
    }

    /// Narrow-phase candidates gathered by the last query
    pub fn candidate_count(&self) -> usize {
        self.boxes.len() + self.spheres.len() + self.capsules.len()
    }
}

/// Test every element of a candidate container, writing into `distances`
fn narrow_phase<A: NarrowArrays>(arrays: &A, ray: &Ray, distances: &mut [f32]) {
    for (index, distance) in distances.iter_mut().enumerate().take(arrays.len()) {
        *distance = arrays.intersect(index, ray);
    }
}

/// One captured frame
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    frame: u32,
    proximity: ProximityArrays,
    boxes: HitboxArrays,
    spheres: HitsphereArrays,
    capsules: HitCapsuleArrays,
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldSnapshot {
    /// Empty snapshot sized for the compile-time world limits
    pub fn new() -> Self {
        Self::with_capacity(MAX_PROXIMITY_COUNT, MAX_BOX_COUNT, MAX_SPHERE_COUNT, MAX_CAPSULE_COUNT)
    }

    /// Empty snapshot sized for explicit capacities
    pub fn with_capacity(bodies: usize, boxes: usize, spheres: usize, capsules: usize) -> Self {
        Self {
            frame: 0,
            proximity: ProximityArrays::new(bodies),
            boxes: HitboxArrays::new(boxes),
            spheres: HitsphereArrays::new(spheres),
            capsules: HitCapsuleArrays::new(capsules),
        }
    }

    /// Frame this snapshot was captured for
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Number of bodies captured
    pub fn body_count(&self) -> usize {
        self.proximity.len()
    }

    /// Proximity volumes and span offsets
    pub fn proximity(&self) -> &ProximityArrays {
        &self.proximity
    }

    /// Captured boxes
    pub fn boxes(&self) -> &HitboxArrays {
        &self.boxes
    }

    /// Captured spheres
    pub fn spheres(&self) -> &HitsphereArrays {
        &self.spheres
    }

    /// Captured capsules
    pub fn capsules(&self) -> &HitCapsuleArrays {
        &self.capsules
    }

    /// Drop all content and stamp the snapshot with `frame`
    pub fn clear(&mut self, frame: u32) {
        self.frame = frame;
        self.proximity.clear();
        self.boxes.clear();
        self.spheres.clear();
        self.capsules.clear();
    }

    fn counts(&self) -> PrimitiveCounts {
        PrimitiveCounts {
            boxes: self.boxes.len(),
            spheres: self.spheres.len(),
            capsules: self.capsules.len(),
        }
    }

    /// Capture `bodies`, in iteration order, as `frame`
    pub fn capture<'a, S, I>(&mut self, frame: u32, bodies: I) -> Result<()>
    where
        S: GeometrySource + ?Sized + 'a,
        I: IntoIterator<Item = (BodyId, &'a S)>,
    {
        self.capture_timed(frame, bodies, &mut CaptureTimings::default())
    }

    /// Capture `bodies` as `frame`, accumulating section times into `timings`
    ///
    /// On error the snapshot is left empty rather than half-written.
    pub fn capture_timed<'a, S, I>(
        &mut self,
        frame: u32,
        bodies: I,
        timings: &mut CaptureTimings,
    ) -> Result<()>
    where
        S: GeometrySource + ?Sized + 'a,
        I: IntoIterator<Item = (BodyId, &'a S)>,
    {
        self.clear(frame);

        let result = self.capture_bodies(bodies, timings);
        if result.is_err() {
            self.clear(frame);
        }
        result
    }

    fn capture_bodies<'a, S, I>(&mut self, bodies: I, timings: &mut CaptureTimings) -> Result<()>
    where
        S: GeometrySource + ?Sized + 'a,
        I: IntoIterator<Item = (BodyId, &'a S)>,
    {
        for (body, source) in bodies {
            timings.begin(CaptureMarker::CopyProximity);
            let pushed = self.proximity.push(body, source.proximity_volume(), self.counts());
            timings.end(CaptureMarker::CopyProximity);
            let index = pushed?;

            timings.begin(CaptureMarker::CopyBoxes);
            let mut sink = BoxSink::new(&mut self.boxes, body, MAX_BOXES_PER_BODY);
            let boxes = source.report_boxes(&mut sink);
            timings.end(CaptureMarker::CopyBoxes);
            boxes?;

            timings.begin(CaptureMarker::CopySpheres);
            let mut sink = SphereSink::new(&mut self.spheres, body, MAX_SPHERES_PER_BODY);
            let spheres = source.report_spheres(&mut sink);
            timings.end(CaptureMarker::CopySpheres);
            spheres?;

            timings.begin(CaptureMarker::CopyCapsules);
            let mut sink = CapsuleSink::new(&mut self.capsules, body, MAX_CAPSULES_PER_BODY);
            let capsules = source.report_capsules(&mut sink);
            timings.end(CaptureMarker::CopyCapsules);
            capsules?;

            let ends = self.counts();
            self.proximity.close_span(index, ends);
        }
        Ok(())
    }

    /// Index of `body` in this snapshot
    fn body_index(&self, body: BodyId) -> Option<usize> {
        self.proximity.bodies().iter().position(|captured| *captured == body)
    }

    /// Where `body`'s primitives live, if it was captured in this frame
    pub fn body_spans(&self, body: BodyId) -> Option<BodySpans> {
        let index = self.body_index(body)?;
        Some(BodySpans {
            boxes: self.proximity.box_range(index),
            spheres: self.proximity.sphere_range(index),
            capsules: self.proximity.capsule_range(index),
        })
    }

    /// Closest hit along `ray`, or `None` on a miss
    ///
    /// Ties keep the first candidate in scan order: boxes, then spheres, then
    /// capsules, each in gather order.
    pub fn raycast(&self, ray: &Ray, scratch: &mut RaycastScratch) -> Option<HitInfo> {
        scratch.reserve_for(self);
        scratch.reset();

        let body_count = self.proximity.len();

        // Broad phase
        for index in 0..body_count {
            scratch.live[index] = self.proximity.volume(index).intersect_ray(ray).is_finite();
        }
        scratch.live[body_count..].fill(false);

        if let Err(err) = self.gather(scratch) {
            log::error!("raycast gather failed on frame {}: {}", self.frame, err);
            return None;
        }

        let box_count = scratch.boxes.len();
        let sphere_count = scratch.spheres.len();
        let capsule_count = scratch.capsules.len();
        let total = box_count + sphere_count + capsule_count;

        trace!(
            "raycast frame {}: {}/{} bodies live, {} candidates",
            self.frame,
            scratch.live_count(),
            body_count,
            total
        );

        if total == 0 {
            return None;
        }

        // Narrow phase
        let distances = &mut scratch.distances[..total];
        narrow_phase(&scratch.boxes, ray, &mut distances[..box_count]);
        narrow_phase(&scratch.spheres, ray, &mut distances[box_count..box_count + sphere_count]);
        narrow_phase(&scratch.capsules, ray, &mut distances[box_count + sphere_count..]);

        // Closest hit
        let mut closest: Option<(usize, f32)> = None;
        for (index, distance) in distances.iter().copied().enumerate() {
            if !distance.is_finite() {
                continue;
            }
            if closest.map_or(true, |(_, best)| distance < best) {
                closest = Some((index, distance));
            }
        }

        let (index, distance) = closest?;
        let hit_object = if index < box_count {
            scratch.boxes.hit_object(index)
        } else if index < box_count + sphere_count {
            scratch.spheres.hit_object(index - box_count)
        } else {
            scratch.capsules.hit_object(index - box_count - sphere_count)
        };

        Some(HitInfo {
            distance,
            point: ray.point_at(distance),
            hit_object,
        })
    }

    /// Copy the spans of every live body into the scratch containers
    fn gather(&self, scratch: &mut RaycastScratch) -> Result<()> {
        for index in 0..self.proximity.len() {
            if !scratch.live[index] {
                continue;
            }
            scratch.boxes.gather(&self.boxes, self.proximity.box_range(index))?;
            scratch.spheres.gather(&self.spheres, self.proximity.sphere_range(index))?;
            scratch.capsules.gather(&self.capsules, self.proximity.capsule_range(index))?;
        }
        Ok(())
    }
}
