mod config;
mod db;
mod error;
mod geo;
mod models;
mod payroll;
mod processor;
mod queue;
mod reports;
mod store;
mod tasks;
mod timefmt;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use config::AppConfig;
use payroll::PayrollCalculator;
use processor::event_processor::EventProcessor;
use processor::sync_dispatch::StoreTransport;
use processor::trip_lifecycle::TripLifecycle;
use queue::{OfflineQueue, SyncTransport};
use store::{PgStore, TripStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Minehaul Trips service...");

    // Init DB
    let pool = db::init_pool(&config.database_url).await?;
    info!("Connected to database");

    let store = Arc::new(PgStore::new(pool));
    let lifecycle = TripLifecycle::new(config.rate_per_km);
    let queue = Arc::new(OfflineQueue::open_spool(
        &config.queue_spool,
        config.queue_capacity,
        config.gps_batch_size,
    ));
    match queue.recover().await {
        Ok(recovered) if recovered > 0 => info!(recovered, "requeued items from an interrupted run"),
        Ok(_) => {}
        Err(e) => warn!("failed to recover queue spool: {}", e),
    }

    let transport: Arc<dyn SyncTransport> =
        Arc::new(StoreTransport::new(store.clone(), lifecycle.clone()));

    let scheduler = Arc::new(tasks::spawn_flush_task(
        queue.clone(),
        transport.clone(),
        Duration::from_secs(config.flush_interval_secs),
        config.flush_jitter_ms,
    ));

    let processor = EventProcessor::new(
        store.clone(),
        queue.clone(),
        lifecycle,
        scheduler.clone(),
        chrono::Duration::seconds(config.geo_max_age_secs),
        chrono::Duration::seconds(config.geo_timeout_secs),
    );

    // Client events arrive as NDJSON on stdin.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => processor.process_line(&line).await,
                Ok(None) => {
                    info!("event stream closed");
                    break;
                }
                Err(e) => {
                    error!("failed to read event stream: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    scheduler.stop().await;

    // Day-end recap for the operator log.
    let today = chrono::Local::now().date_naive();
    match store.trips_between(today, today).await {
        Ok(trips) => {
            let calculator = PayrollCalculator::new(config.rate_per_km);
            let verified = reports::verified_trip_count(&trips);
            let summaries = reports::billing_by_driver(&trips, &calculator);
            let due: f64 = summaries.iter().map(|s| s.total_due).sum();
            let gps_priced = summaries.iter().filter(|s| s.gps_preferred).count();
            info!(
                trips = trips.len(),
                verified,
                gps_priced,
                total_due = %timefmt::format_peso(due),
                "today's trip summary"
            );
        }
        Err(e) => warn!("could not load today's trips for the summary: {}", e),
    }

    match store.compliance_checks().await {
        Ok(checks) => {
            let tally = reports::compliance_summary(&checks);
            info!(
                compliant = tally.compliant,
                needs_review = tally.needs_review,
                non_compliant = tally.non_compliant,
                "fleet compliance tally"
            );
        }
        Err(e) => warn!("could not load compliance checks for the tally: {}", e),
    }

    // Best-effort final drain; don't hold up process exit for a slow store.
    match tokio::time::timeout(Duration::from_secs(2), queue.flush(transport.as_ref())).await {
        Ok(Ok(report)) => info!(sent = report.sent, failed = report.failed, "final flush"),
        Ok(Err(e)) => warn!("final flush failed: {}", e),
        Err(_) => warn!("final flush timed out"),
    }

    Ok(())
}
