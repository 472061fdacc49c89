//! Grind session tracker entry point.
//!
//! Polls one player's hiscore table on a fixed cadence, records every
//! snapshot into a rolling day history, and lets the session courier
//! turn XP-change runs into Discord reports. Optionally archives every
//! successful poll to `PostgreSQL`.
//!
//! # Architecture
//!
//! ```text
//! interval tick --> Poller --> HiscoreClient (HTTP)
//!                     |--> HistoryBuffer (rolling day)
//!                     +--> SessionCourier --> DiscordNotifier (webhook)
//! ```
//!
//! The loop exits on Ctrl-C or after too many consecutive fetch
//! failures (the hiscore endpoint throttles aggressively; backing off
//! for a supervisor restart beats hammering it).

mod config;
mod error;
mod hiscore;
mod notifier;

use std::sync::Arc;

use anyhow::Context;
use grindwatch_core::{HistoryBuffer, PollError, Poller, SessionCourier};
use grindwatch_db::{PollStore, PostgresPool};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;
use crate::hiscore::HiscoreClient;
use crate::notifier::DiscordNotifier;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// wires the poll pipeline, then runs the poll loop until shutdown.
///
/// # Errors
///
/// Returns an error if initialization fails. Steady-state poll failures
/// are counted and logged, not propagated.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("grindwatch starting");

    // Load configuration from environment
    let config = RunnerConfig::from_env().context("loading configuration")?;
    info!(
        player = config.player,
        poll_interval_secs = config.poll_interval.as_secs(),
        history_capacity = config.history_capacity,
        max_consecutive_failures = config.max_consecutive_failures,
        archive_enabled = config.database_url.is_some(),
        "configuration loaded"
    );

    // Wire the poll pipeline
    let client = HiscoreClient::new(&config.hiscore_api_url, &config.player)
        .context("building hiscore client")?;
    info!(url = client.url(), "hiscore client configured");

    let history =
        Arc::new(HistoryBuffer::new(config.history_capacity).context("building history buffer")?);
    let notifier = Arc::new(DiscordNotifier::new(
        reqwest::Client::new(),
        &config.webhook_url,
    ));
    let courier = SessionCourier::new(notifier);
    let mut poller = Poller::new(client, Arc::clone(&history), courier);

    // Optional poll archive
    let mut archive = None;
    if let Some(url) = config.database_url.as_deref() {
        let pool = PostgresPool::connect_url(url)
            .await
            .context("connecting to the poll archive")?;
        PollStore::new(pool.pool())
            .ensure_schema()
            .await
            .context("bootstrapping the poll archive schema")?;
        info!("poll archive enabled");
        archive = Some(pool);
    }

    let mut interval = tokio::time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut consecutive_failures: u32 = 0;

    info!("entering poll loop");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match poller.poll().await {
                    Ok(cycle) => {
                        consecutive_failures = 0;
                        info!(
                            outcome = ?cycle.outcome,
                            total_xp = cycle.snapshot.total_xp(),
                            history_len = history.len(),
                            "poll complete"
                        );
                        if let Some(pool) = &archive {
                            let store = PollStore::new(pool.pool());
                            if let Err(db_error) = store.insert_poll(&cycle.snapshot).await {
                                // Archive failures never disturb session tracking.
                                warn!(%db_error, "failed to archive poll");
                            }
                        }
                    }
                    Err(PollError::Fetch { source }) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        warn!(
                            %source,
                            consecutive_failures,
                            "fetch failed, cycle aborted"
                        );
                        if consecutive_failures >= config.max_consecutive_failures {
                            error!(
                                threshold = config.max_consecutive_failures,
                                "too many consecutive fetch failures, shutting down"
                            );
                            break;
                        }
                    }
                    Err(poll_error) => {
                        // Courier hand-off errors are programming errors,
                        // not upstream weather. Surface loudly and stop.
                        error!(%poll_error, "poll cycle failed, shutting down");
                        break;
                    }
                }
            }
            result = &mut shutdown => {
                if let Err(signal_error) = result {
                    warn!(%signal_error, "ctrl-c handler failed, shutting down anyway");
                }
                info!("shutdown signal received");
                break;
            }
        }
    }

    // Discard any in-flight session and drain connections.
    poller.shutdown().await;
    if let Some(pool) = &archive {
        pool.close().await;
    }
    info!("grindwatch stopped");
    Ok(())
}
