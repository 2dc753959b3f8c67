//! Pointer trail for velocity analysis.
//!
//! The trail keeps a bounded history of pointer positions. Speed is only
//! analysed over the trailing slice once that slice is full, so a handful of
//! fast samples right after page load cannot trip the detector.

use crate::core::event::Millis;
use std::collections::VecDeque;

/// Maximum samples retained.
pub const TRAIL_CAPACITY: usize = 50;

/// Samples in the trailing analysis slice.
pub const ANALYSIS_WINDOW: usize = 10;

/// A pointer position at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
    pub at: Millis,
}

/// Bounded pointer history.
#[derive(Debug, Default)]
pub struct PointerTrail {
    samples: VecDeque<PointerSample>,
}

impl PointerTrail {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(TRAIL_CAPACITY),
        }
    }

    /// Record a sample and return the average speed of the trailing window,
    /// in pixels per second, once the window is full.
    pub fn push(&mut self, sample: PointerSample) -> Option<f64> {
        self.samples.push_back(sample);
        while self.samples.len() > TRAIL_CAPACITY {
            self.samples.pop_front();
        }

        if self.samples.len() < ANALYSIS_WINDOW {
            return None;
        }

        let samples = self.samples.make_contiguous();
        Some(average_speed(&samples[samples.len() - ANALYSIS_WINDOW..]))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Total path length over total elapsed time, in pixels per second.
///
/// Returns 0 for fewer than two samples or no elapsed time.
pub fn average_speed(samples: &[PointerSample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }

    let mut distance = 0.0;
    let mut elapsed_ms: u64 = 0;
    for pair in samples.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        distance += ((curr.x - prev.x).powi(2) + (curr.y - prev.y).powi(2)).sqrt();
        elapsed_ms += curr.at.saturating_sub(prev.at);
    }

    if elapsed_ms == 0 {
        return 0.0;
    }
    distance / elapsed_ms as f64 * 1000.0
}
