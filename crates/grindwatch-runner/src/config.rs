//! Configuration for the runner binary.
//!
//! All configuration is loaded from environment variables. The runner
//! needs to know which player to track and where to deliver session
//! reports; everything else has defaults sized for the one-poll-per-
//! minute deployment.

use std::time::Duration;

use crate::error::RunnerError;

/// Default hiscore endpoint (ultimate ironman table).
const DEFAULT_HISCORE_API_URL: &str =
    "https://secure.runescape.com/m=hiscore_oldschool_ultimate/index_lite.json";

/// Default seconds between polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default history capacity: one snapshot per minute for a day.
const DEFAULT_HISTORY_CAPACITY: usize = 1440;

/// Default number of consecutive fetch failures tolerated before exit.
const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Display name of the tracked player.
    pub player: String,
    /// Discord webhook URL for session reports.
    pub webhook_url: String,
    /// Hiscore API base URL (overridable for tests and other game modes).
    pub hiscore_api_url: String,
    /// Time between poll cycles.
    pub poll_interval: Duration,
    /// Number of snapshots the rolling history retains.
    pub history_capacity: usize,
    /// Consecutive fetch failures tolerated before the process exits.
    pub max_consecutive_failures: u32,
    /// Optional `PostgreSQL` URL; enables the poll archive when set.
    pub database_url: Option<String>,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `GRINDWATCH_PLAYER` -- player display name
    /// - `DISCORD_WEBHOOK_URL` -- webhook for session reports
    ///
    /// Optional variables:
    /// - `HISCORE_API_URL` -- hiscore endpoint override
    /// - `POLL_INTERVAL_SECS` -- seconds between polls (default 60)
    /// - `HISTORY_CAPACITY` -- rolling history size (default 1440)
    /// - `MAX_CONSECUTIVE_FAILURES` -- fetch failures before exit (default 3)
    /// - `DATABASE_URL` -- enables the `PostgreSQL` poll archive
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] if a required variable is missing
    /// or an optional one fails to parse.
    pub fn from_env() -> Result<Self, RunnerError> {
        let player = env_var("GRINDWATCH_PLAYER")?;
        let webhook_url = env_var("DISCORD_WEBHOOK_URL")?;

        let hiscore_api_url = std::env::var("HISCORE_API_URL")
            .unwrap_or_else(|_| DEFAULT_HISCORE_API_URL.to_owned());

        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_SECS.to_string())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid POLL_INTERVAL_SECS: {e}")))?;
        if poll_interval_secs == 0 {
            return Err(RunnerError::Config(
                "POLL_INTERVAL_SECS must be at least 1".to_owned(),
            ));
        }

        let history_capacity: usize = std::env::var("HISTORY_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_HISTORY_CAPACITY.to_string())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid HISTORY_CAPACITY: {e}")))?;

        let max_consecutive_failures: u32 = std::env::var("MAX_CONSECUTIVE_FAILURES")
            .unwrap_or_else(|_| DEFAULT_MAX_CONSECUTIVE_FAILURES.to_string())
            .parse()
            .map_err(|e| {
                RunnerError::Config(format!("invalid MAX_CONSECUTIVE_FAILURES: {e}"))
            })?;

        let database_url = std::env::var("DATABASE_URL").ok();

        Ok(Self {
            player,
            webhook_url,
            hiscore_api_url,
            poll_interval: Duration::from_secs(poll_interval_secs),
            history_capacity,
            max_consecutive_failures,
            database_url,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name)
        .map_err(|e| RunnerError::Config(format!("missing required env var {name}: {e}")))
}
