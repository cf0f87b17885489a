//! Integration tests for configuration loading

use activity_monitor::domain::{Axis, ZoneRole};
use activity_monitor::infra::config::Direction;
use activity_monitor::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_load_config_from_file() {
    let temp_file = write_config(
        r#"
[session]
subject = "dog"

[zones]
default_dwell_ms = 3000
default_cooldown_ms = 7000
default_zone = ""

[[zones.zone]]
name = "Basket"
bounds = [0, 0, 100, 100]
activity = "Resting"
role = "resting"

[[zones.zone]]
name = "Bowl"
bounds = [200.5, 200, 260, 240]
activity = "Eating"
dwell_ms = 4000

[[boundaries.line]]
name = "hall"
axis = "vertical"
position = 500
activity = "Hallway"
cooldown_ms = 15000

[interaction]
window_ms = 8000
count_threshold = 2

[inactivity]
sleep_timeout_ms = 120000

[departure]
zone = "Basket"
direction = "up"

[metrics]
interval_secs = 15
"#,
    );

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.subject_name(), "dog");
    assert_eq!(config.zone_names(), vec!["Basket", "Bowl"]);
    assert_eq!(config.zones()[0].role, ZoneRole::Resting);
    let bowl = &config.zones()[1];
    assert_eq!(bowl.dwell_ms, 4000);
    assert_eq!(bowl.cooldown_ms, 7000);
    assert_eq!(bowl.bounds.x1, 200.5);
    assert_eq!(config.default_zone(), None);
    assert_eq!(config.boundaries().len(), 1);
    assert_eq!(config.boundaries()[0].axis, Axis::Vertical);
    assert_eq!(config.interaction_window_ms(), 8000);
    assert_eq!(config.interaction_count_threshold(), 2);
    assert_eq!(config.sleep_timeout_ms(), 120_000);
    assert_eq!(config.sleep_label(), "Sleeping");
    assert_eq!(config.departure().unwrap().direction, Direction::Up);
    assert_eq!(config.metrics_interval_secs(), 15);
}

#[test]
fn test_dev_config_is_valid() {
    let config = Config::from_file("config/dev.toml").unwrap();
    assert_eq!(config.zone_names(), vec!["Bed", "Fountain", "Food", "Cat Tree"]);
    assert_eq!(config.events_file(), "data/activity_events.jsonl");
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml").unwrap();
    assert_eq!(config.config_file(), "default");
    assert_eq!(config.zones().len(), 4);
    assert_eq!(config.sleep_timeout_ms(), 600_000);
}

#[test]
fn test_load_from_path_rejects_unparseable_file() {
    let temp_file = write_config("[zones\nbroken");
    assert!(Config::load_from_path(temp_file.path()).is_err());
}

#[test]
fn test_duplicate_zone_names_rejected() {
    let temp_file = write_config(
        r#"
[[zones.zone]]
name = "Bed"
bounds = [0, 0, 10, 10]
activity = "On Bed"

[[zones.zone]]
name = "Bed"
bounds = [20, 20, 30, 30]
activity = "On Bed"
"#,
    );
    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("duplicate zone name"));
}

#[test]
fn test_zero_duration_rejected() {
    let temp_file = write_config(
        r#"
[activities]
idle_dwell_ms = 0
"#,
    );
    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_inverted_zone_bounds_rejected() {
    let temp_file = write_config(
        r#"
[departure]
enabled = false

[[zones.zone]]
name = "Shelf"
bounds = [50, 50, 10, 10]
activity = "Perching"
"#,
    );
    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("malformed bounds"));
}

#[test]
fn test_departure_zone_must_exist() {
    let temp_file = write_config(
        r#"
[[zones.zone]]
name = "Sofa"
bounds = [0, 0, 100, 100]
activity = "Lounging"
"#,
    );
    // Departure defaults to zone "Bed", which this layout lacks
    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{:#}", err).contains("departure.zone"));
}
