//! Fixed-length history of captured frames
//!
//! Slot 0 is always the most recent capture. Advancing recycles the oldest
//! slot to the front and captures into it, so the history never allocates
//! after construction.

use std::collections::VecDeque;

use log::{debug, warn};

use crate::error::{HitboxError, Result};
use crate::foundation::time::{CaptureMarker, CaptureTimings};

use super::body::GeometrySource;
use super::collision::BodyId;
use super::limits::MAX_REWIND_FRAMES;
use super::snapshot::WorldSnapshot;

/// Ring of the last `window` snapshots, newest first
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    slots: VecDeque<WorldSnapshot>,
    current_frame: u32,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotHistory {
    /// History of [`MAX_REWIND_FRAMES`] snapshots sized for the world limits
    pub fn new() -> Self {
        Self::with_window(MAX_REWIND_FRAMES)
    }

    /// History of `window` snapshots (at least one)
    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            slots: (0..window).map(|_| WorldSnapshot::new()).collect(),
            current_frame: 0,
        }
    }

    /// Number of retained snapshots
    pub fn window_len(&self) -> usize {
        self.slots.len()
    }

    /// Frame of the most recent capture
    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    /// The most recent snapshot
    pub fn latest(&self) -> &WorldSnapshot {
        &self.slots[0]
    }

    /// Recycle the oldest slot and capture `bodies` into it as `frame`
    ///
    /// `frame` may repeat the current frame but never go back. If capture
    /// fails the new slot is left empty and the error is returned.
    pub fn advance<'a, S, I>(
        &mut self,
        frame: u32,
        bodies: I,
        timings: &mut CaptureTimings,
    ) -> Result<()>
    where
        S: GeometrySource + ?Sized + 'a,
        I: IntoIterator<Item = (BodyId, &'a S)>,
    {
        if frame < self.current_frame {
            return Err(HitboxError::FrameRegression {
                current: self.current_frame,
                requested: frame,
            });
        }

        timings.reset();

        timings.begin(CaptureMarker::CopySnapshots);
        if let Some(oldest) = self.slots.pop_back() {
            self.slots.push_front(oldest);
        }
        timings.end(CaptureMarker::CopySnapshots);

        self.current_frame = frame;
        let result = self.slots[0].capture_timed(frame, bodies, timings);
        if let Err(err) = &result {
            warn!("capture of frame {} failed, slot left empty: {}", frame, err);
        }
        result
    }

    /// Snapshot closest to `frame` within the window
    ///
    /// Frames newer than the current frame serve the current snapshot; frames
    /// older than the window serve the oldest retained one.
    pub fn lookup(&self, frame: u32) -> &WorldSnapshot {
        let delta = i64::from(self.current_frame) - i64::from(frame);
        let newest = 0_i64;
        let oldest = self.slots.len() as i64 - 1;
        let clamped = delta.clamp(newest, oldest);

        if clamped != delta {
            debug!(
                "frame {} is outside the rewind window, serving frame {}",
                frame,
                self.slots[clamped as usize].frame()
            );
        }
        &self.slots[clamped as usize]
    }

    /// Snapshots, newest first
    pub fn iter(&self) -> impl Iterator<Item = &WorldSnapshot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::physics::collision::BoundingSphere;

    struct Marker;

    impl GeometrySource for Marker {
        fn proximity_volume(&self) -> BoundingSphere {
            BoundingSphere::new(Vec3::zeros(), 1.0)
        }
    }

    fn advance(
        history: &mut SnapshotHistory,
        frame: u32,
        bodies: &[(BodyId, Marker)],
    ) -> Result<()> {
        let bodies = bodies.iter().map(|(id, body)| (*id, body));
        history.advance(frame, bodies, &mut CaptureTimings::default())
    }

    #[test]
    fn test_lookup_current_frame_is_latest() {
        let mut history = SnapshotHistory::with_window(4);
        for frame in 1..=3 {
            advance(&mut history, frame, &[(BodyId(frame), Marker)]).unwrap();
        }

        assert_eq!(history.current_frame(), 3);
        assert_eq!(history.lookup(3).frame(), 3);
        assert_eq!(history.lookup(2).frame(), 2);
        assert_eq!(history.lookup(3).proximity().bodies(), &[BodyId(3)]);
    }

    #[test]
    fn test_lookup_clamps_future_and_expired_frames() {
        let mut history = SnapshotHistory::with_window(3);
        for frame in 10..=15 {
            advance(&mut history, frame, &[]).unwrap();
        }

        assert_eq!(history.lookup(99).frame(), 15);
        assert_eq!(history.lookup(13).frame(), 13);
        assert_eq!(history.lookup(12).frame(), 13);
        assert_eq!(history.lookup(0).frame(), 13);
    }

    #[test]
    fn test_window_keeps_newest_first() {
        let mut history = SnapshotHistory::with_window(3);
        for frame in 1..=5 {
            advance(&mut history, frame, &[]).unwrap();
        }

        let frames: Vec<u32> = history.iter().map(WorldSnapshot::frame).collect();
        assert_eq!(frames, vec![5, 4, 3]);
        assert_eq!(history.window_len(), 3);
    }

    #[test]
    fn test_frame_regression_is_rejected() {
        let mut history = SnapshotHistory::with_window(3);
        advance(&mut history, 7, &[]).unwrap();

        let result = advance(&mut history, 6, &[]);

        assert!(matches!(
            result,
            Err(HitboxError::FrameRegression { current: 7, requested: 6 })
        ));
        assert_eq!(history.latest().frame(), 7);
    }

    #[test]
    fn test_repeated_frame_is_accepted() {
        let mut history = SnapshotHistory::with_window(3);
        advance(&mut history, 4, &[]).unwrap();
        advance(&mut history, 4, &[(BodyId(1), Marker)]).unwrap();

        assert_eq!(history.lookup(4).body_count(), 1);
    }

    #[test]
    fn test_advance_records_capture_timings() {
        let mut history = SnapshotHistory::with_window(2);
        let mut timings = CaptureTimings::default();
        let bodies = [(BodyId(1), Marker), (BodyId(2), Marker)];

        history
            .advance(1, bodies.iter().map(|(id, body)| (*id, body)), &mut timings)
            .unwrap();

        assert!(timings.total() >= timings.get(CaptureMarker::CopyProximity));
        assert_eq!(history.latest().body_count(), 2);
    }
}
