//! Per-key dwell timers with post-fire cooldown
//!
//! A key fires once its condition has held continuously for the dwell
//! duration and its cooldown since the previous firing has elapsed. Any
//! interruption discards the partial dwell.

use rustc_hash::FxHashMap;
use tracing::debug;

/// Independently debounced condition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DwellKey {
    Zone(String),
    Boundary(String),
    Play,
    Idle,
}

impl std::fmt::Display for DwellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DwellKey::Zone(name) => write!(f, "zone:{}", name),
            DwellKey::Boundary(name) => write!(f, "boundary:{}", name),
            DwellKey::Play => write!(f, "play"),
            DwellKey::Idle => write!(f, "idle"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellPolicy {
    pub dwell_ms: u64,
    pub cooldown_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DwellTimer {
    pub started_at: Option<u64>,
    pub last_fired_at: Option<u64>,
}

#[derive(Debug, Clone)]
struct Entry {
    policy: DwellPolicy,
    timer: DwellTimer,
}

#[derive(Debug, Default)]
pub struct DwellDebouncer {
    entries: FxHashMap<DwellKey, Entry>,
}

impl DwellDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: DwellKey, policy: DwellPolicy) {
        self.entries.insert(key, Entry { policy, timer: DwellTimer::default() });
    }

    /// Advance the timer for `key` and fire if dwell and cooldown allow.
    ///
    /// Unknown keys never fire.
    pub fn should_fire(&mut self, key: &DwellKey, condition_holds: bool, now: u64) -> bool {
        self.advance(key, condition_holds, now, true)
    }

    /// Advance the timer for `key` without allowing it to fire.
    ///
    /// Keeps continuity bookkeeping for a key whose rule is outranked this
    /// tick: the dwell keeps accumulating or is reset, and firing waits for a
    /// tick where the rule is reachable.
    pub fn track(&mut self, key: &DwellKey, condition_holds: bool, now: u64) {
        self.advance(key, condition_holds, now, false);
    }

    pub fn timer(&self, key: &DwellKey) -> Option<DwellTimer> {
        self.entries.get(key).map(|e| e.timer)
    }

    fn advance(&mut self, key: &DwellKey, condition_holds: bool, now: u64, armed: bool) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };

        if !condition_holds {
            if let Some(started_at) = entry.timer.started_at.take() {
                debug!(key = %key, held_ms = %now.saturating_sub(started_at), "dwell_reset");
            }
            return false;
        }

        let started_at = match entry.timer.started_at {
            Some(t) => t,
            None => {
                debug!(key = %key, "dwell_started");
                *entry.timer.started_at.insert(now)
            }
        };

        if !armed {
            return false;
        }

        let dwelled = now.saturating_sub(started_at) >= entry.policy.dwell_ms;
        let cooled = entry
            .timer
            .last_fired_at
            .map_or(true, |fired_at| now.saturating_sub(fired_at) >= entry.policy.cooldown_ms);

        if dwelled && cooled {
            entry.timer.started_at = None;
            entry.timer.last_fired_at = Some(now);
            debug!(key = %key, "dwell_fired");
            return true;
        }
        false
    }
}
