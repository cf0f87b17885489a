//! Activity monitor - turns per-frame subject observations into activity events
//!
//! Module structure:
//! - `domain/` - Geometry, observations, zones and emitted records
//! - `io/` - Observation source and event sinks
//! - `services/` - Activity inference engine
//! - `infra/` - Infrastructure (Config, Metrics)

use activity_monitor::domain::event::{new_uuid_v7, SystemEvent, SystemEventKind};
use activity_monitor::infra::{Config, Metrics};
use activity_monitor::io::{read_observations, ClassMap, EventSink, JsonlSink};
use activity_monitor::services::ActivityEngine;
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Activity monitor - infers subject activities from detector frames
#[derive(Parser, Debug)]
#[command(name = "activity-monitor", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml")]
    config: String,

    /// JSONL frame input ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Override the activity events file from config
    #[arg(short, long)]
    events: Option<String>,
}

fn record_system<S: EventSink>(sink: &mut S, session_id: &str, kind: SystemEventKind, message: &str) {
    if let Err(e) = sink.record_system(&SystemEvent::new(session_id, kind, message)) {
        warn!(event = %kind.as_str(), error = %e, "system_event_failed");
    }
}

async fn open_input(input: &str) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open input: {}", input))?;
    Ok(Box::new(BufReader::new(file)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls the level; default INFO, debug for per-tick detail
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), git_hash = env!("GIT_HASH"), "activity_monitor_starting");

    let args = Args::parse();

    let config = Config::load_from_path(&args.config)?;
    let events_file = args.events.clone().unwrap_or_else(|| config.events_file().to_string());

    info!(
        config_file = %config.config_file(),
        subject = %config.subject_name(),
        zones = ?config.zone_names(),
        boundaries = %config.boundaries().len(),
        sleep_timeout_ms = %config.sleep_timeout_ms(),
        events_file = %events_file,
        input = %args.input,
        "config_loaded"
    );

    let session_id = new_uuid_v7();
    let mut sink = JsonlSink::new(&events_file, config.system_file());
    record_system(&mut sink, &session_id, SystemEventKind::Start, "monitoring started");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(Metrics::new());

    let reader = match open_input(&args.input).await {
        Ok(reader) => reader,
        Err(e) => {
            record_system(&mut sink, &session_id, SystemEventKind::Crash, &format!("{:#}", e));
            return Err(e);
        }
    };

    // Bounded channel for backpressure between source and engine
    let (observation_tx, observation_rx) = mpsc::channel(1000);

    let source_classes = ClassMap::from_config(config.classes());
    let source_shutdown = shutdown_rx.clone();
    let source_metrics = metrics.clone();
    let source = tokio::spawn(async move {
        read_observations(reader, source_classes, observation_tx, source_shutdown, source_metrics).await
    });

    // Periodic metrics summary
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let mut engine = ActivityEngine::new(&config, sink, metrics.clone());
    info!(session_id = %session_id, "engine_started");

    // Runs until the source finishes or shutdown is signalled
    engine.run(observation_rx, shutdown_rx).await;

    let source_result = match source.await {
        Ok(result) => result,
        Err(e) => Err(anyhow::anyhow!("source task failed: {}", e)),
    };

    metrics.report().log();
    let sink = engine.sink_mut();

    match source_result {
        Ok(forwarded) => {
            info!(forwarded = %forwarded, "source_finished");
            record_system(sink, &session_id, SystemEventKind::Stop, "monitoring stopped");
            info!("activity-monitor shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "source_failed");
            record_system(sink, &session_id, SystemEventKind::Crash, &format!("{:#}", e));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_resolution() {
        std::env::remove_var("CONFIG_FILE");
        let args = Args::try_parse_from(["activity-monitor"]).unwrap();
        assert_eq!(args.config, "config/dev.toml");

        std::env::set_var("CONFIG_FILE", "config/attic.toml");
        let args = Args::try_parse_from(["activity-monitor"]).unwrap();
        assert_eq!(args.config, "config/attic.toml");

        let args = Args::try_parse_from(["activity-monitor", "--config", "config/living_room.toml"]).unwrap();
        assert_eq!(args.config, "config/living_room.toml");
        std::env::remove_var("CONFIG_FILE");
    }
}
