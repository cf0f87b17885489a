//! Configuration loading from TOML files
//!
//! The binary selects the config file via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Every config is validated before the engine is built. A validation
//! failure is fatal at startup; nothing is checked again per tick.

use crate::domain::types::{BBox, Velocity};
use crate::domain::zone::{Axis, BoundaryLine, Zone, ZoneRole};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name used for the tracked subject in logs
    #[serde(default = "default_subject_name")]
    pub subject: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { subject: default_subject_name() }
    }
}

fn default_subject_name() -> String {
    "subject".to_string()
}

/// A zone as written in TOML; durations fall back to the section defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    /// [x1, y1, x2, y2]
    pub bounds: [f64; 4],
    pub activity: String,
    #[serde(default)]
    pub role: ZoneRole,
    #[serde(default)]
    pub dwell_ms: Option<u64>,
    #[serde(default)]
    pub cooldown_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZonesConfig {
    #[serde(default = "default_zone_dwell_ms")]
    pub default_dwell_ms: u64,
    #[serde(default = "default_zone_cooldown_ms")]
    pub default_cooldown_ms: u64,
    /// Zone reported when the visible subject overlaps nothing ("" disables)
    #[serde(default = "default_zone_label")]
    pub default_zone: String,
    /// Listed in priority order
    #[serde(default, rename = "zone")]
    pub zones: Vec<ZoneConfig>,
}

fn default_zone_dwell_ms() -> u64 {
    5000
}

fn default_zone_cooldown_ms() -> u64 {
    10_000
}

fn default_zone_label() -> String {
    "Play area".to_string()
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            default_dwell_ms: default_zone_dwell_ms(),
            default_cooldown_ms: default_zone_cooldown_ms(),
            default_zone: default_zone_label(),
            zones: Config::default_zone_layout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoundariesConfig {
    /// Listed in priority order
    #[serde(default, rename = "line")]
    pub lines: Vec<BoundaryLine>,
}

impl Default for BoundariesConfig {
    fn default() -> Self {
        Self { lines: Config::default_boundary_lines() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotionConfig {
    /// Minimum center displacement (frame units) that counts as movement
    #[serde(default = "default_move_threshold")]
    pub move_threshold: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self { move_threshold: default_move_threshold() }
    }
}

fn default_move_threshold() -> f64 {
    10.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "default_interaction_window_ms")]
    pub window_ms: u64,
    /// Rising-edge overlaps within the window needed for a play candidate
    #[serde(default = "default_interaction_count_threshold")]
    pub count_threshold: usize,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            window_ms: default_interaction_window_ms(),
            count_threshold: default_interaction_count_threshold(),
        }
    }
}

fn default_interaction_window_ms() -> u64 {
    10_000
}

fn default_interaction_count_threshold() -> usize {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct InactivityConfig {
    #[serde(default = "default_sleep_timeout_ms")]
    pub sleep_timeout_ms: u64,
    #[serde(default = "default_sleep_label")]
    pub activity: String,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self { sleep_timeout_ms: default_sleep_timeout_ms(), activity: default_sleep_label() }
    }
}

fn default_sleep_timeout_ms() -> u64 {
    600_000
}

fn default_sleep_label() -> String {
    "Sleeping".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivitiesConfig {
    #[serde(default = "default_play_label")]
    pub play_label: String,
    #[serde(default = "default_play_dwell_ms")]
    pub play_dwell_ms: u64,
    #[serde(default = "default_idle_label")]
    pub idle_label: String,
    #[serde(default = "default_idle_dwell_ms")]
    pub idle_dwell_ms: u64,
    /// Shared by play and idle
    #[serde(default = "default_activity_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for ActivitiesConfig {
    fn default() -> Self {
        Self {
            play_label: default_play_label(),
            play_dwell_ms: default_play_dwell_ms(),
            idle_label: default_idle_label(),
            idle_dwell_ms: default_idle_dwell_ms(),
            cooldown_ms: default_activity_cooldown_ms(),
        }
    }
}

fn default_play_label() -> String {
    "Playing".to_string()
}

fn default_play_dwell_ms() -> u64 {
    10_000
}

fn default_idle_label() -> String {
    "Idle".to_string()
}

fn default_idle_dwell_ms() -> u64 {
    40_000
}

fn default_activity_cooldown_ms() -> u64 {
    8000
}

/// Direction of the last velocity that a departure requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Speed along this direction (negative when moving the other way)
    #[inline]
    pub fn component(&self, v: Velocity) -> f64 {
        match self {
            Direction::Left => -v.vx,
            Direction::Right => v.vx,
            Direction::Up => -v.vy,
            Direction::Down => v.vy,
        }
    }
}

/// Inference for a subject that vanished from a zone while heading one way
#[derive(Debug, Clone, Deserialize)]
pub struct DepartureConfig {
    #[serde(default = "default_departure_enabled")]
    pub enabled: bool,
    #[serde(default = "default_departure_zone")]
    pub zone: String,
    #[serde(default = "default_departure_direction")]
    pub direction: Direction,
    /// Units per second along `direction`
    #[serde(default = "default_departure_min_speed")]
    pub min_speed: f64,
    #[serde(default = "default_departure_min_absence_ms")]
    pub min_absence_ms: u64,
    #[serde(default = "default_departure_label")]
    pub activity: String,
}

impl Default for DepartureConfig {
    fn default() -> Self {
        Self {
            enabled: default_departure_enabled(),
            zone: default_departure_zone(),
            direction: default_departure_direction(),
            min_speed: default_departure_min_speed(),
            min_absence_ms: default_departure_min_absence_ms(),
            activity: default_departure_label(),
        }
    }
}

fn default_departure_enabled() -> bool {
    true
}

fn default_departure_zone() -> String {
    "Bed".to_string()
}

fn default_departure_direction() -> Direction {
    Direction::Left
}

fn default_departure_min_speed() -> f64 {
    1.0
}

fn default_departure_min_absence_ms() -> u64 {
    2000
}

fn default_departure_label() -> String {
    "At the window".to_string()
}

/// Detector class names per observation role
#[derive(Debug, Clone, Deserialize)]
pub struct ClassesConfig {
    #[serde(default = "default_subject_classes")]
    pub subject: Vec<String>,
    #[serde(default = "default_actor_classes")]
    pub actor: Vec<String>,
    #[serde(default = "default_object_classes")]
    pub object: Vec<String>,
}

impl Default for ClassesConfig {
    fn default() -> Self {
        Self {
            subject: default_subject_classes(),
            actor: default_actor_classes(),
            object: default_object_classes(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_subject_classes() -> Vec<String> {
    strings(&["cat", "dog", "bird"])
}

fn default_actor_classes() -> Vec<String> {
    strings(&["person"])
}

fn default_object_classes() -> Vec<String> {
    strings(&["sports ball", "cup", "teddy bear", "toy", "apple", "feather", "bottle", "book"])
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// Activity events (JSONL)
    #[serde(default = "default_events_file")]
    pub events_file: String,
    /// Session lifecycle events (JSONL)
    #[serde(default = "default_system_file")]
    pub system_file: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self { events_file: default_events_file(), system_file: default_system_file() }
    }
}

fn default_events_file() -> String {
    "activity_events.jsonl".to_string()
}

fn default_system_file() -> String {
    "system_events.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub zones: ZonesConfig,
    #[serde(default)]
    pub boundaries: BoundariesConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub inactivity: InactivityConfig,
    #[serde(default)]
    pub activities: ActivitiesConfig,
    #[serde(default)]
    pub departure: DepartureConfig,
    #[serde(default)]
    pub classes: ClassesConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    config_file: String,
    subject_name: String,
    zones: Vec<Zone>,
    default_zone: Option<String>,
    boundaries: Vec<BoundaryLine>,
    move_threshold: f64,
    interaction_window_ms: u64,
    interaction_count_threshold: usize,
    sleep_timeout_ms: u64,
    sleep_label: String,
    play_label: String,
    play_dwell_ms: u64,
    idle_label: String,
    idle_dwell_ms: u64,
    activity_cooldown_ms: u64,
    departure: Option<DepartureConfig>,
    classes: ClassesConfig,
    events_file: String,
    system_file: String,
    metrics_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    /// Room layout the monitor ships with (640x480 camera frame)
    fn default_zone_layout() -> Vec<ZoneConfig> {
        let zone = |name: &str, bounds: [f64; 4], activity: &str, role: ZoneRole, dwell_ms: Option<u64>| {
            ZoneConfig {
                name: name.to_string(),
                bounds,
                activity: activity.to_string(),
                role,
                dwell_ms,
                cooldown_ms: None,
            }
        };
        vec![
            zone("Bed", [0.0, 0.0, 180.0, 130.0], "On Bed", ZoneRole::Resting, None),
            zone("Fountain", [328.0, 160.0, 375.0, 192.0], "Drinking", ZoneRole::Dwell, Some(6000)),
            zone("Food", [445.0, 400.0, 580.0, 465.0], "Eating", ZoneRole::Dwell, Some(5000)),
            zone("Cat Tree", [460.0, 35.0, 630.0, 235.0], "Climbing", ZoneRole::Dwell, Some(6000)),
        ]
    }

    fn default_boundary_lines() -> Vec<BoundaryLine> {
        vec![
            BoundaryLine {
                name: "bathroom".to_string(),
                axis: Axis::Horizontal,
                position: 475.0,
                activity: "Bathroom".to_string(),
                cooldown_ms: 60_000,
            },
            BoundaryLine {
                name: "door".to_string(),
                axis: Axis::Vertical,
                position: 638.0,
                activity: "Door".to_string(),
                cooldown_ms: 30_000,
            },
        ]
    }

    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        let zones_section = toml_config.zones;
        let default_dwell_ms = zones_section.default_dwell_ms;
        let default_cooldown_ms = zones_section.default_cooldown_ms;

        let zones = zones_section
            .zones
            .into_iter()
            .map(|z| Zone {
                name: z.name,
                bounds: BBox::from(z.bounds),
                activity: z.activity,
                role: z.role,
                dwell_ms: z.dwell_ms.unwrap_or(default_dwell_ms),
                cooldown_ms: z.cooldown_ms.unwrap_or(default_cooldown_ms),
            })
            .collect();

        let default_zone = Some(zones_section.default_zone).filter(|z| !z.is_empty());
        let departure = Some(toml_config.departure).filter(|d| d.enabled);

        Self {
            config_file,
            subject_name: toml_config.session.subject,
            zones,
            default_zone,
            boundaries: toml_config.boundaries.lines,
            move_threshold: toml_config.motion.move_threshold,
            interaction_window_ms: toml_config.interaction.window_ms,
            interaction_count_threshold: toml_config.interaction.count_threshold,
            sleep_timeout_ms: toml_config.inactivity.sleep_timeout_ms,
            sleep_label: toml_config.inactivity.activity,
            play_label: toml_config.activities.play_label,
            play_dwell_ms: toml_config.activities.play_dwell_ms,
            idle_label: toml_config.activities.idle_label,
            idle_dwell_ms: toml_config.activities.idle_dwell_ms,
            activity_cooldown_ms: toml_config.activities.cooldown_ms,
            departure,
            classes: toml_config.classes,
            events_file: toml_config.sink.events_file,
            system_file: toml_config.sink.system_file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
        }
    }

    /// Parse TOML text and validate it
    pub fn from_toml_str(content: &str, source: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)
            .with_context(|| format!("Failed to parse config file {}", source))?;
        let config = Self::from_toml(toml_config, source.to_string());
        config.validate().with_context(|| format!("Invalid config file {}", source))?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Load configuration, using defaults only when the file does not exist.
    ///
    /// A file that exists but fails to parse or validate is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            eprintln!("Warning: config file {} not found. Using defaults.", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut names = HashSet::new();
        for zone in &self.zones {
            if zone.name.is_empty() {
                bail!("zone with empty name");
            }
            if !names.insert(zone.name.as_str()) {
                bail!("duplicate zone name '{}'", zone.name);
            }
            if !zone.bounds.has_area() {
                bail!("zone '{}' has malformed bounds {:?}", zone.name, zone.bounds);
            }
            if zone.activity.is_empty() {
                bail!("zone '{}' has an empty activity label", zone.name);
            }
            if zone.role == ZoneRole::Dwell {
                if zone.dwell_ms == 0 {
                    bail!("zone '{}' dwell_ms must be positive", zone.name);
                }
                if zone.cooldown_ms == 0 {
                    bail!("zone '{}' cooldown_ms must be positive", zone.name);
                }
            }
        }

        let mut lines = HashSet::new();
        for line in &self.boundaries {
            if !lines.insert(line.name.as_str()) {
                bail!("duplicate boundary name '{}'", line.name);
            }
            if !line.position.is_finite() {
                bail!("boundary '{}' position must be finite", line.name);
            }
            if line.cooldown_ms == 0 {
                bail!("boundary '{}' cooldown_ms must be positive", line.name);
            }
            if line.activity.is_empty() {
                bail!("boundary '{}' has an empty activity label", line.name);
            }
        }

        if !self.move_threshold.is_finite() || self.move_threshold < 0.0 {
            bail!("motion.move_threshold must be a non-negative number");
        }
        if self.interaction_window_ms == 0 {
            bail!("interaction.window_ms must be positive");
        }
        if self.interaction_count_threshold == 0 {
            bail!("interaction.count_threshold must be positive");
        }
        if self.sleep_timeout_ms == 0 {
            bail!("inactivity.sleep_timeout_ms must be positive");
        }
        if self.play_dwell_ms == 0 || self.idle_dwell_ms == 0 {
            bail!("activities dwell durations must be positive");
        }
        if self.activity_cooldown_ms == 0 {
            bail!("activities.cooldown_ms must be positive");
        }
        if self.metrics_interval_secs == 0 {
            bail!("metrics.interval_secs must be positive");
        }
        for (key, label) in [
            ("inactivity.activity", &self.sleep_label),
            ("activities.play_label", &self.play_label),
            ("activities.idle_label", &self.idle_label),
        ] {
            if label.is_empty() {
                bail!("{} must not be empty", key);
            }
        }

        if let Some(departure) = &self.departure {
            if !self.zones.iter().any(|z| z.name == departure.zone) {
                bail!("departure.zone '{}' names no configured zone", departure.zone);
            }
            if !departure.min_speed.is_finite() || departure.min_speed < 0.0 {
                bail!("departure.min_speed must be a non-negative number");
            }
            if departure.activity.is_empty() {
                bail!("departure.activity must not be empty");
            }
        }

        Ok(())
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone_names(&self) -> Vec<&str> {
        self.zones.iter().map(|z| z.name.as_str()).collect()
    }

    pub fn default_zone(&self) -> Option<&str> {
        self.default_zone.as_deref()
    }

    pub fn boundaries(&self) -> &[BoundaryLine] {
        &self.boundaries
    }

    pub fn move_threshold(&self) -> f64 {
        self.move_threshold
    }

    pub fn interaction_window_ms(&self) -> u64 {
        self.interaction_window_ms
    }

    pub fn interaction_count_threshold(&self) -> usize {
        self.interaction_count_threshold
    }

    pub fn sleep_timeout_ms(&self) -> u64 {
        self.sleep_timeout_ms
    }

    pub fn sleep_label(&self) -> &str {
        &self.sleep_label
    }

    pub fn play_label(&self) -> &str {
        &self.play_label
    }

    pub fn play_dwell_ms(&self) -> u64 {
        self.play_dwell_ms
    }

    pub fn idle_label(&self) -> &str {
        &self.idle_label
    }

    pub fn idle_dwell_ms(&self) -> u64 {
        self.idle_dwell_ms
    }

    pub fn activity_cooldown_ms(&self) -> u64 {
        self.activity_cooldown_ms
    }

    pub fn departure(&self) -> Option<&DepartureConfig> {
        self.departure.as_ref()
    }

    pub fn classes(&self) -> &ClassesConfig {
        &self.classes
    }

    pub fn events_file(&self) -> &str {
        &self.events_file
    }

    pub fn system_file(&self) -> &str {
        &self.system_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    // Builders for embedding hosts and tests. They do not re-validate.

    pub fn with_zones(mut self, zones: Vec<Zone>) -> Self {
        self.zones = zones;
        self
    }

    pub fn with_boundaries(mut self, boundaries: Vec<BoundaryLine>) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_default_zone(mut self, zone: Option<&str>) -> Self {
        self.default_zone = zone.map(str::to_string);
        self
    }

    pub fn with_sleep_timeout_ms(mut self, ms: u64) -> Self {
        self.sleep_timeout_ms = ms;
        self
    }

    pub fn with_interaction(mut self, window_ms: u64, count_threshold: usize) -> Self {
        self.interaction_window_ms = window_ms;
        self.interaction_count_threshold = count_threshold;
        self
    }

    pub fn with_activity_timing(
        mut self,
        play_dwell_ms: u64,
        idle_dwell_ms: u64,
        cooldown_ms: u64,
    ) -> Self {
        self.play_dwell_ms = play_dwell_ms;
        self.idle_dwell_ms = idle_dwell_ms;
        self.activity_cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_departure(mut self, departure: Option<DepartureConfig>) -> Self {
        self.departure = departure;
        self
    }
}
