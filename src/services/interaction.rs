//! Subject/actor interaction counting
//!
//! Counts rising edges of subject-actor overlap inside a sliding window.
//! Sustained contact is one interaction; play needs repeated approach and
//! retreat.

use crate::domain::types::BBox;
use std::collections::VecDeque;
use tracing::debug;

pub struct InteractionDetector {
    window_ms: u64,
    /// Start times of recent interactions, oldest first
    events: VecDeque<u64>,
    /// Whether the subject overlapped an actor on the previous tick
    overlapping: bool,
}

impl InteractionDetector {
    pub fn new(window_ms: u64) -> Self {
        Self { window_ms, events: VecDeque::new(), overlapping: false }
    }

    /// Process one tick and return the interaction count.
    ///
    /// Entries stay in the window while `now - t <= window_ms`.
    pub fn observe(&mut self, subject: Option<&BBox>, actors: &[BBox], now: u64) -> usize {
        let overlapping = subject.is_some_and(|s| actors.iter().any(|a| s.overlaps(a)));

        if overlapping && !self.overlapping {
            self.events.push_back(now);
            debug!(count = %self.events.len(), "interaction_started");
        }
        self.overlapping = overlapping;

        while let Some(&oldest) = self.events.front() {
            if now.saturating_sub(oldest) <= self.window_ms {
                break;
            }
            self.events.pop_front();
        }

        self.events.len()
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBJECT: BBox = BBox::new(100.0, 100.0, 150.0, 150.0);
    const TOUCHING: BBox = BBox::new(140.0, 100.0, 200.0, 200.0);
    const APART: BBox = BBox::new(300.0, 300.0, 350.0, 350.0);

    #[test]
    fn test_sustained_overlap_counts_once() {
        let mut detector = InteractionDetector::new(10_000);
        for tick in 0..30u64 {
            detector.observe(Some(&SUBJECT), &[TOUCHING], tick * 100);
        }
        assert_eq!(detector.count(), 1);
    }

    #[test]
    fn test_rising_edges_age_out() {
        let mut detector = InteractionDetector::new(10_000);
        for ts in [1000, 4000, 8000] {
            detector.observe(Some(&SUBJECT), &[APART], ts - 500);
            detector.observe(Some(&SUBJECT), &[TOUCHING], ts);
        }
        assert_eq!(detector.count(), 3);

        // Entry at t=1s is still inside the window at t=11s, gone just after
        assert_eq!(detector.observe(Some(&SUBJECT), &[], 11_000), 3);
        assert_eq!(detector.observe(Some(&SUBJECT), &[], 11_001), 2);
        assert_eq!(detector.observe(Some(&SUBJECT), &[], 14_001), 1);
        assert_eq!(detector.observe(Some(&SUBJECT), &[], 18_001), 0);
    }

    #[test]
    fn test_absence_ends_contact() {
        let mut detector = InteractionDetector::new(10_000);
        detector.observe(Some(&SUBJECT), &[TOUCHING], 0);
        detector.observe(None, &[TOUCHING], 100);
        assert_eq!(detector.observe(Some(&SUBJECT), &[TOUCHING], 200), 2);
    }

    #[test]
    fn test_any_actor_counts() {
        let mut detector = InteractionDetector::new(10_000);
        assert_eq!(detector.observe(Some(&SUBJECT), &[APART, TOUCHING], 0), 1);
    }
}
