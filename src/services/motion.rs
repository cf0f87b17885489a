//! Subject motion tracking
//!
//! The tracker is the only writer of `MotionState`. It is updated on ticks
//! where the subject is visible and left alone otherwise, so time since last
//! seen/moved can be measured across gaps.

use crate::domain::types::{Point, Velocity};
use tracing::debug;

/// Motion history carried across ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionState {
    pub last_position: Option<Point>,
    pub last_velocity: Option<Velocity>,
    /// Epoch ms of the last visible tick
    pub last_seen_at: Option<u64>,
    /// Epoch ms of the last tick that counted as movement
    pub last_moved_at: Option<u64>,
}

/// What one update observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub moved: bool,
    pub displacement: f64,
    pub velocity: Velocity,
}

pub struct MotionTracker {
    state: MotionState,
    move_threshold: f64,
}

impl MotionTracker {
    pub fn new(move_threshold: f64) -> Self {
        Self { state: MotionState::default(), move_threshold }
    }

    #[inline]
    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Record the subject center for this tick.
    ///
    /// The first observation always counts as movement. Velocity is the
    /// displacement over time since the previous update, or zero when no time
    /// has passed.
    pub fn update(&mut self, center: Point, now: u64) -> MotionSample {
        let sample = match (self.state.last_position, self.state.last_seen_at) {
            (Some(prev), Some(seen_at)) => {
                let displacement = center.distance(&prev);
                let elapsed_ms = now.saturating_sub(seen_at);
                let velocity = if elapsed_ms == 0 {
                    Velocity::ZERO
                } else {
                    let dt = elapsed_ms as f64 / 1000.0;
                    Velocity { vx: (center.x - prev.x) / dt, vy: (center.y - prev.y) / dt }
                };
                MotionSample { moved: displacement > self.move_threshold, displacement, velocity }
            }
            _ => MotionSample { moved: true, displacement: 0.0, velocity: Velocity::ZERO },
        };

        self.state.last_position = Some(center);
        self.state.last_velocity = Some(sample.velocity);
        self.state.last_seen_at = Some(now);
        if sample.moved {
            self.state.last_moved_at = Some(now);
        }

        debug!(
            moved = %sample.moved,
            displacement = %format!("{:.1}", sample.displacement),
            vx = %format!("{:.1}", sample.velocity.vx),
            vy = %format!("{:.1}", sample.velocity.vy),
            "motion_updated"
        );

        sample
    }
}
