//! Activity resolution
//!
//! Combines the per-tick signals into at most one activity label using a
//! fixed rule order. Rules below the winner still advance their dwell timers
//! so continuity is not lost while they are outranked, but only the winning
//! rule may fire.

use crate::domain::zone::ZoneRole;
use crate::infra::config::{Config, DepartureConfig};
use crate::services::dwell::{DwellDebouncer, DwellKey, DwellPolicy};
use crate::services::inactivity::InactivitySignal;
use crate::services::motion::MotionState;
use crate::services::spatial::Classification;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Sleep,
    Boundary,
    ZoneDwell,
    Resting,
    Play,
    Idle,
    Departure,
}

/// Evaluation order, highest priority first
pub const PRIORITY: [Rule; 7] = [
    Rule::Sleep,
    Rule::Boundary,
    Rule::ZoneDwell,
    Rule::Resting,
    Rule::Play,
    Rule::Idle,
    Rule::Departure,
];

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::Sleep => "sleep",
            Rule::Boundary => "boundary",
            Rule::ZoneDwell => "zone_dwell",
            Rule::Resting => "resting",
            Rule::Play => "play",
            Rule::Idle => "idle",
            Rule::Departure => "departure",
        }
    }

    /// Whether the label is inferred rather than backed by a live detection
    #[inline]
    pub fn is_inferred(&self) -> bool {
        matches!(self, Rule::Sleep | Rule::Departure)
    }
}

/// Everything the resolver reads for one tick
#[derive(Debug, Clone, Copy)]
pub struct TickSignals<'a> {
    pub now: u64,
    pub inactivity: InactivitySignal,
    /// Subject box reported with finite coordinates
    pub visible: bool,
    pub classification: &'a Classification,
    pub interaction_count: usize,
    pub objects_present: bool,
    pub motion: &'a MotionState,
    /// Primary zone at the last sighting
    pub last_zone: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub rule: Rule,
    pub label: String,
}

impl Resolution {
    fn new(rule: Rule, label: &str) -> Self {
        Self { rule, label: label.to_string() }
    }
}

struct ZoneRule {
    index: usize,
    key: DwellKey,
    activity: String,
}

struct BoundaryRule {
    index: usize,
    key: DwellKey,
    activity: String,
}

pub struct ActivityResolver {
    debouncer: DwellDebouncer,
    dwell_zones: Vec<ZoneRule>,
    /// (zone index, label)
    resting_zones: Vec<(usize, String)>,
    boundaries: Vec<BoundaryRule>,
    sleep_label: String,
    play_label: String,
    idle_label: String,
    interaction_threshold: usize,
    sleep_timeout_ms: u64,
    departure: Option<DepartureConfig>,
}

impl ActivityResolver {
    pub fn new(config: &Config) -> Self {
        let mut debouncer = DwellDebouncer::new();
        let mut dwell_zones = Vec::new();
        let mut resting_zones = Vec::new();

        for (index, zone) in config.zones().iter().enumerate() {
            match zone.role {
                ZoneRole::Dwell => {
                    let key = DwellKey::Zone(zone.name.clone());
                    debouncer.register(
                        key.clone(),
                        DwellPolicy { dwell_ms: zone.dwell_ms, cooldown_ms: zone.cooldown_ms },
                    );
                    dwell_zones.push(ZoneRule { index, key, activity: zone.activity.clone() });
                }
                ZoneRole::Resting => resting_zones.push((index, zone.activity.clone())),
            }
        }

        let boundaries = config
            .boundaries()
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let key = DwellKey::Boundary(line.name.clone());
                debouncer.register(key.clone(), DwellPolicy { dwell_ms: 0, cooldown_ms: line.cooldown_ms });
                BoundaryRule { index, key, activity: line.activity.clone() }
            })
            .collect();

        let cooldown_ms = config.activity_cooldown_ms();
        debouncer.register(DwellKey::Play, DwellPolicy { dwell_ms: config.play_dwell_ms(), cooldown_ms });
        debouncer.register(DwellKey::Idle, DwellPolicy { dwell_ms: config.idle_dwell_ms(), cooldown_ms });

        Self {
            debouncer,
            dwell_zones,
            resting_zones,
            boundaries,
            sleep_label: config.sleep_label().to_string(),
            play_label: config.play_label().to_string(),
            idle_label: config.idle_label().to_string(),
            interaction_threshold: config.interaction_count_threshold(),
            sleep_timeout_ms: config.sleep_timeout_ms(),
            departure: config.departure().cloned(),
        }
    }

    #[inline]
    pub fn debouncer(&self) -> &DwellDebouncer {
        &self.debouncer
    }

    /// Pick the label for this tick, if any.
    ///
    /// Every rule is evaluated so debounced keys see their condition on every
    /// tick. A rule is armed only while no higher rule has matched.
    pub fn resolve(&mut self, signals: &TickSignals<'_>) -> Option<Resolution> {
        let mut winner: Option<Resolution> = None;

        for rule in PRIORITY {
            let armed = winner.is_none();
            let hit = match rule {
                Rule::Sleep => self.sleep(signals),
                Rule::Boundary => self.boundary(signals, armed),
                Rule::ZoneDwell => self.zone_dwell(signals, armed),
                Rule::Resting => self.resting(signals),
                Rule::Play => self.play(signals, armed),
                Rule::Idle => self.idle(signals, armed),
                Rule::Departure => self.departure(signals),
            };
            if armed {
                winner = hit;
            }
        }

        if let Some(resolution) = &winner {
            debug!(rule = %resolution.rule.as_str(), label = %resolution.label, "activity_resolved");
        }
        winner
    }

    fn sleep(&self, s: &TickSignals<'_>) -> Option<Resolution> {
        s.inactivity.is_asleep().then(|| Resolution::new(Rule::Sleep, &self.sleep_label))
    }

    fn boundary(&mut self, s: &TickSignals<'_>, armed: bool) -> Option<Resolution> {
        let mut hit = None;
        for line in &self.boundaries {
            let holds = s.classification.crossed(line.index);
            if armed && hit.is_none() {
                if self.debouncer.should_fire(&line.key, holds, s.now) {
                    hit = Some(Resolution::new(Rule::Boundary, &line.activity));
                }
            } else {
                self.debouncer.track(&line.key, holds, s.now);
            }
        }
        hit
    }

    fn zone_dwell(&mut self, s: &TickSignals<'_>, armed: bool) -> Option<Resolution> {
        let mut hit = None;
        for zone in &self.dwell_zones {
            let holds = s.visible && s.classification.in_zone(zone.index);
            if armed && hit.is_none() {
                if self.debouncer.should_fire(&zone.key, holds, s.now) {
                    hit = Some(Resolution::new(Rule::ZoneDwell, &zone.activity));
                }
            } else {
                self.debouncer.track(&zone.key, holds, s.now);
            }
        }
        hit
    }

    fn resting(&self, s: &TickSignals<'_>) -> Option<Resolution> {
        if !s.visible {
            return None;
        }
        self.resting_zones
            .iter()
            .find(|(index, _)| s.classification.in_zone(*index))
            .map(|(_, label)| Resolution::new(Rule::Resting, label))
    }

    fn play_holds(&self, s: &TickSignals<'_>) -> bool {
        s.visible && (s.interaction_count >= self.interaction_threshold || s.objects_present)
    }

    fn play(&mut self, s: &TickSignals<'_>, armed: bool) -> Option<Resolution> {
        let holds = self.play_holds(s);
        self.debounce(&DwellKey::Play, holds, s.now, armed)
            .then(|| Resolution::new(Rule::Play, &self.play_label))
    }

    fn idle(&mut self, s: &TickSignals<'_>, armed: bool) -> Option<Resolution> {
        let holds = s.visible
            && !s.inactivity.is_asleep()
            && s.classification.zones.is_empty()
            && !self.play_holds(s);
        self.debounce(&DwellKey::Idle, holds, s.now, armed)
            .then(|| Resolution::new(Rule::Idle, &self.idle_label))
    }

    fn departure(&self, s: &TickSignals<'_>) -> Option<Resolution> {
        let departure = self.departure.as_ref()?;
        if s.visible || s.last_zone != Some(departure.zone.as_str()) {
            return None;
        }
        let since_seen = s.now.saturating_sub(s.motion.last_seen_at?);
        if since_seen < departure.min_absence_ms || since_seen >= self.sleep_timeout_ms {
            return None;
        }
        let speed = departure.direction.component(s.motion.last_velocity?);
        (speed > departure.min_speed).then(|| Resolution::new(Rule::Departure, &departure.activity))
    }

    fn debounce(&mut self, key: &DwellKey, holds: bool, now: u64, armed: bool) -> bool {
        if armed {
            self.debouncer.should_fire(key, holds, now)
        } else {
            self.debouncer.track(key, holds, now);
            false
        }
    }
}
