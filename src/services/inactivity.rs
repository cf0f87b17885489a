//! Sleep/wake inference from motion history
//!
//! Two states. Awake goes to Asleep once the subject has gone unseen or
//! unmoved for the sleep timeout; Asleep goes back to Awake on the first tick
//! that counts as movement. Nothing else changes the state.

use crate::services::motion::MotionState;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wakefulness {
    #[default]
    Awake,
    Asleep,
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InactivitySignal {
    Awake,
    FellAsleep,
    Asleep,
    WokeUp,
}

impl InactivitySignal {
    #[inline]
    pub fn is_asleep(self) -> bool {
        matches!(self, InactivitySignal::FellAsleep | InactivitySignal::Asleep)
    }
}

pub struct InactivityDetector {
    sleep_timeout_ms: u64,
    state: Wakefulness,
}

impl InactivityDetector {
    pub fn new(sleep_timeout_ms: u64) -> Self {
        Self { sleep_timeout_ms, state: Wakefulness::Awake }
    }

    #[inline]
    pub fn state(&self) -> Wakefulness {
        self.state
    }

    /// `moved` is None when the subject was not visible this tick.
    pub fn evaluate(&mut self, motion: &MotionState, moved: Option<bool>, now: u64) -> InactivitySignal {
        match self.state {
            Wakefulness::Asleep => {
                if moved == Some(true) {
                    self.state = Wakefulness::Awake;
                    info!("subject_woke");
                    InactivitySignal::WokeUp
                } else {
                    InactivitySignal::Asleep
                }
            }
            Wakefulness::Awake => {
                if self.timed_out(motion, now) {
                    self.state = Wakefulness::Asleep;
                    info!(
                        since_seen_ms = ?motion.last_seen_at.map(|t| now.saturating_sub(t)),
                        since_moved_ms = ?motion.last_moved_at.map(|t| now.saturating_sub(t)),
                        "subject_asleep"
                    );
                    InactivitySignal::FellAsleep
                } else {
                    InactivitySignal::Awake
                }
            }
        }
    }

    /// Never true before the subject has been seen once
    fn timed_out(&self, motion: &MotionState, now: u64) -> bool {
        let Some(seen_at) = motion.last_seen_at else {
            return false;
        };
        let since_seen = now.saturating_sub(seen_at);
        let since_moved = motion.last_moved_at.map_or(u64::MAX, |t| now.saturating_sub(t));
        since_seen >= self.sleep_timeout_ms || since_moved >= self.sleep_timeout_ms
    }
}
