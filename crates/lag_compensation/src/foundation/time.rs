//! Timing utilities for capture profiling

use std::time::{Duration, Instant};

/// Accumulating stopwatch
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed += start.elapsed();
            self.start_time = None;
        }
    }

    /// Reset the stopwatch to zero
    pub fn reset(&mut self) {
        self.start_time = None;
        self.elapsed = Duration::ZERO;
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let current_elapsed = if let Some(start) = self.start_time {
            start.elapsed()
        } else {
            Duration::ZERO
        };
        self.elapsed + current_elapsed
    }

    /// Check if the stopwatch is currently running
    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }
}

/// Named sections of a frame capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureMarker {
    /// Recycling the oldest history slot to the front
    CopySnapshots,
    /// Writing proximity volumes
    CopyProximity,
    /// Writing hitboxes
    CopyBoxes,
    /// Writing hitspheres
    CopySpheres,
    /// Writing capsules
    CopyCapsules,
}

impl CaptureMarker {
    /// Every marker, in capture order
    pub const ALL: [CaptureMarker; 5] = [
        CaptureMarker::CopySnapshots,
        CaptureMarker::CopyProximity,
        CaptureMarker::CopyBoxes,
        CaptureMarker::CopySpheres,
        CaptureMarker::CopyCapsules,
    ];

    const fn index(self) -> usize {
        match self {
            CaptureMarker::CopySnapshots => 0,
            CaptureMarker::CopyProximity => 1,
            CaptureMarker::CopyBoxes => 2,
            CaptureMarker::CopySpheres => 3,
            CaptureMarker::CopyCapsules => 4,
        }
    }
}

/// Time spent in each section of the most recent capture
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureTimings {
    sections: [Stopwatch; 5],
}

impl CaptureTimings {
    /// Clear all sections
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }

    /// Begin timing a section
    #[inline]
    pub fn begin(&mut self, marker: CaptureMarker) {
        self.sections[marker.index()].start();
    }

    /// End timing a section, accumulating into its total
    #[inline]
    pub fn end(&mut self, marker: CaptureMarker) {
        self.sections[marker.index()].stop();
    }

    /// Accumulated time for a section
    pub fn get(&self, marker: CaptureMarker) -> Duration {
        self.sections[marker.index()].elapsed()
    }

    /// Sum of all sections
    pub fn total(&self) -> Duration {
        CaptureMarker::ALL.iter().map(|marker| self.get(*marker)).sum()
    }
}
