//! Scenario tests for the ActivityEngine

use super::*;
use crate::domain::types::BBox;
use crate::io::sink::MemorySink;
use crate::services::dwell::DwellKey;
use crate::services::resolver::Rule;

/// Inside the Food zone, clear of every other zone and line
const FOOD: BBox = BBox::new(480.0, 410.0, 540.0, 455.0);
/// Open floor, overlapping no zone
const FLOOR: BBox = BBox::new(300.0, 300.0, 340.0, 340.0);
const FLOOR_SHIFTED: BBox = BBox::new(260.0, 300.0, 300.0, 340.0);
/// Left of the door line, then beyond it
const NEAR_DOOR: BBox = BBox::new(560.0, 300.0, 600.0, 340.0);
const PAST_DOOR: BBox = BBox::new(620.0, 300.0, 660.0, 340.0);
/// On the bed, then further left on the bed
const BED: BBox = BBox::new(100.0, 40.0, 160.0, 100.0);
const BED_LEFT: BBox = BBox::new(60.0, 40.0, 120.0, 100.0);

fn create_test_engine() -> ActivityEngine<MemorySink> {
    create_test_engine_with_config(Config::default())
}

fn create_test_engine_with_config(config: Config) -> ActivityEngine<MemorySink> {
    ActivityEngine::new(&config, MemorySink::new(), Arc::new(Metrics::new()))
}

fn seen(ts: u64, bbox: BBox) -> Observation {
    Observation::at(ts).with_subject(bbox, 0.9)
}

fn secs(s: u64) -> u64 {
    s * 1000
}

fn event_times(engine: &ActivityEngine<MemorySink>) -> Vec<u64> {
    engine.sink().events().iter().map(|e| e.ts()).collect()
}

#[test]
fn test_eating_fires_after_dwell_and_repeat_is_suppressed() {
    let mut engine = create_test_engine();

    for s in 0..=20 {
        // Away from the bowl at 6s and 7s
        let bbox = if s == 6 || s == 7 { FLOOR } else { FOOD };
        engine.tick(&seen(secs(s), bbox));
    }

    assert_eq!(engine.sink().labels(), vec!["Eating"]);
    let event = &engine.sink().events()[0];
    assert_eq!(event.ts(), 5000);
    assert_eq!(event.zone(), Some("Food"));
    assert_eq!(event.confidence(), Some(0.9));
    assert_eq!(event.position(), Some(FOOD.center()));

    // The second dwell fired at 15s but matched the last emitted label
    let food = DwellKey::Zone("Food".to_string());
    assert_eq!(engine.resolver.debouncer().timer(&food).unwrap().last_fired_at, Some(15_000));
    assert_eq!(engine.metrics().events_suppressed(), 1);
}

#[test]
fn test_no_eating_before_cooldown() {
    let mut engine = create_test_engine();
    let mut fired = Vec::new();

    for s in 0..=14 {
        let bbox = if s == 6 || s == 7 { FLOOR } else { FOOD };
        let outcome = engine.tick(&seen(secs(s), bbox));
        if outcome.resolved.as_ref().is_some_and(|r| r.rule == Rule::ZoneDwell) {
            fired.push(outcome.ts);
        }
    }
    assert_eq!(fired, vec![5000]);
}

#[test]
fn test_sleeps_after_timeout_and_wakes_on_movement() {
    let mut engine = create_test_engine();

    engine.tick(&seen(0, FLOOR));
    assert!(engine.tick(&Observation::at(secs(300))).event.is_none());

    let outcome = engine.tick(&Observation::at(secs(600)));
    let event = outcome.event.unwrap();
    assert_eq!(event.activity(), "Sleeping");
    assert_eq!(event.confidence(), None);
    assert_eq!(event.position(), None);
    assert_eq!(event.zone(), Some("Play area"));

    assert!(engine.tick(&Observation::at(secs(620))).event.is_none());

    let outcome = engine.tick(&seen(secs(650), FLOOR_SHIFTED));
    assert_eq!(outcome.moved, Some(true));
    assert!(outcome.woke_up);
    assert_eq!(engine.inactivity.state(), crate::services::inactivity::Wakefulness::Awake);
    assert_eq!(engine.sink().labels(), vec!["Sleeping"]);
}

#[test]
fn test_still_subject_in_zone_falls_asleep() {
    let config = Config::default().with_sleep_timeout_ms(20_000);
    let mut engine = create_test_engine_with_config(config);

    for s in 0..=30 {
        engine.tick(&seen(secs(s), FOOD));
    }

    assert_eq!(engine.sink().labels(), vec!["Eating", "Sleeping"]);
    assert_eq!(event_times(&engine), vec![5000, 20_000]);
}

#[test]
fn test_sleep_requires_a_sighting() {
    let mut engine = create_test_engine();
    for s in (0..=1200).step_by(100) {
        engine.tick(&Observation::at(secs(s)));
    }
    assert!(engine.sink().events().is_empty());
    assert_eq!(engine.metrics().absent_ticks_total(), 13);
}

#[test]
fn test_repeated_interactions_become_play() {
    let config = Config::default().with_activity_timing(2000, 40_000, 8000);
    let mut engine = create_test_engine_with_config(config);
    let actor = BBox::new(330.0, 290.0, 400.0, 380.0);
    let mut counts = Vec::new();

    for s in 0..=20 {
        let mut observation = seen(secs(s), FLOOR);
        if matches!(s, 1 | 4 | 8) {
            observation = observation.with_actor(actor);
        }
        counts.push(engine.tick(&observation).interaction_count);
    }

    assert_eq!(counts[8], 3);
    assert_eq!(counts[11], 3);
    assert_eq!(counts[12], 2);
    assert_eq!(counts[20], 0);
    assert_eq!(engine.sink().labels(), vec!["Playing"]);
    assert_eq!(event_times(&engine), vec![10_000]);
}

#[test]
fn test_sustained_contact_counts_once() {
    let mut engine = create_test_engine();
    let actor = BBox::new(330.0, 290.0, 400.0, 380.0);

    let counts: Vec<usize> = (0..30)
        .map(|s| engine.tick(&seen(s * 100, FLOOR).with_actor(actor)).interaction_count)
        .collect();
    assert_eq!(counts.last(), Some(&1));
}

#[test]
fn test_boundary_crossing_respects_line_cooldown() {
    let mut engine = create_test_engine();

    let timeline = [(0, NEAR_DOOR), (1, PAST_DOOR), (2, NEAR_DOOR), (3, PAST_DOOR), (40, NEAR_DOOR), (41, PAST_DOOR)];
    let outcomes: Vec<_> = timeline
        .iter()
        .map(|&(s, bbox)| engine.tick(&seen(secs(s), bbox)))
        .collect();

    // The crossing at 3s is inside the door's 30s cooldown
    assert!(outcomes[3].resolved.is_none());
    assert_eq!(engine.sink().labels(), vec!["Door", "Idle", "Door"]);
    assert_eq!(event_times(&engine), vec![1000, 40_000, 41_000]);
}

#[test]
fn test_absent_ticks_leave_motion_state_alone() {
    let mut engine = create_test_engine();
    engine.tick(&seen(0, FLOOR));
    engine.tick(&seen(1000, FLOOR_SHIFTED));
    let before = engine.motion_state().clone();

    for s in 2..6 {
        let outcome = engine.tick(&Observation::at(secs(s)));
        assert_eq!(outcome.moved, None);
    }
    // A box with non-finite coordinates is no subject at all
    let garbage = BBox::new(f64::NAN, 0.0, 10.0, 10.0);
    assert_eq!(engine.tick(&seen(secs(6), garbage)).moved, None);

    assert_eq!(engine.motion_state(), &before);
}

#[test]
fn test_degenerate_box_overlaps_nothing() {
    let mut engine = create_test_engine();
    // Zero-area box in the middle of the Food zone
    let outcome = engine.tick(&seen(0, BBox::new(500.0, 430.0, 500.0, 430.0)));
    assert_eq!(outcome.moved, Some(true));
    assert_eq!(engine.last_zone(), Some("Play area"));
}

#[test]
fn test_idle_repeat_produces_no_event() {
    let config = Config::default().with_activity_timing(10_000, 4000, 8000);
    let mut engine = create_test_engine_with_config(config);

    let mut resolved_idle = 0;
    for s in 0..=20 {
        let outcome = engine.tick(&seen(secs(s), FLOOR));
        if outcome.resolved.is_some_and(|r| r.rule == Rule::Idle) {
            resolved_idle += 1;
        }
    }

    // Fires at 4s, 12s and 20s (4s dwell, 8s cooldown)
    assert_eq!(resolved_idle, 3);
    assert_eq!(engine.sink().labels(), vec!["Idle"]);
    assert_eq!(engine.metrics().events_suppressed(), 2);
}

#[test]
fn test_sink_failure_does_not_roll_back() {
    let mut engine =
        ActivityEngine::new(&Config::default(), MemorySink::failing(), Arc::new(Metrics::new()));

    let mut emitted = None;
    for s in 0..=5 {
        if let Some(event) = engine.tick(&seen(secs(s), FOOD)).event {
            emitted = Some(event);
        }
    }

    assert_eq!(emitted.map(|e| e.ts()), Some(5000));
    assert!(engine.sink().events().is_empty());
    assert_eq!(engine.activity_state().last_emitted.as_deref(), Some("Eating"));
    assert_eq!(engine.metrics().sink_failures(), 1);

    // Recovery does not replay the lost event
    engine.sink_mut().set_failing(false);
    for s in 6..=15 {
        engine.tick(&seen(secs(s), FOOD));
    }
    assert!(engine.sink().events().is_empty());
}

#[test]
fn test_departure_from_bed() {
    let mut engine = create_test_engine();

    engine.tick(&seen(0, BED));
    engine.tick(&seen(1000, BED_LEFT));
    assert!(engine.tick(&Observation::at(2000)).event.is_none());
    let event = engine.tick(&Observation::at(3000)).event.unwrap();

    assert_eq!(event.activity(), "At the window");
    assert_eq!(event.zone(), Some("Bed"));
    assert_eq!(event.confidence(), None);
    assert_eq!(event.position(), None);
    assert_eq!(engine.sink().labels(), vec!["On Bed", "At the window"]);
}

#[test]
fn test_tick_time_is_clamped() {
    let mut engine = create_test_engine();
    engine.tick(&seen(5000, FLOOR));
    assert_eq!(engine.tick(&seen(3000, FLOOR)).ts, 5000);
    assert_eq!(engine.tick(&seen(6000, FLOOR)).ts, 6000);
}

#[tokio::test]
async fn test_run_consumes_until_channel_closes() {
    let mut engine = create_test_engine();
    let (tx, rx) = mpsc::channel(16);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    for s in 0..=5 {
        tx.send(seen(secs(s), FOOD)).await.unwrap();
    }
    drop(tx);

    engine.run(rx, shutdown_rx).await;
    assert_eq!(engine.sink().labels(), vec!["Eating"]);
    assert_eq!(engine.metrics().ticks_total(), 6);
}
