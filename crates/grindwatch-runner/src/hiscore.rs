//! Hiscore API client.
//!
//! Fetches the tracked player's `index_lite.json` table once per poll
//! cycle and stamps it into a [`Snapshot`]. The only massaging applied
//! is unranked-entry normalization: the API reports `-1` for activities
//! the player has never placed in, which is flattened to rank 0 /
//! score 0 so deltas stay meaningful.

use std::time::Duration;

use chrono::Utc;
use grindwatch_core::{FetchError, StatsClient};
use grindwatch_types::{Activity, Skill, Snapshot};
use serde::Deserialize;

use crate::error::RunnerError;

/// Timeout for one hiscore request. The endpoint is slow under load but
/// a stalled request should never eat a whole poll interval.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wire shape of the hiscore `index_lite.json` payload.
#[derive(Debug, Deserialize)]
struct HiscoreResponse {
    skills: Vec<Skill>,
    activities: Vec<Activity>,
}

/// HTTP client for one player's hiscore table.
#[derive(Debug, Clone)]
pub struct HiscoreClient {
    client: reqwest::Client,
    player_url: String,
}

impl HiscoreClient {
    /// Build a client for the given endpoint and player name.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::HttpClient`] if the underlying client
    /// cannot be constructed.
    pub fn new(api_url: &str, player: &str) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RunnerError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            player_url: player_url(api_url, player),
        })
    }

    /// The fully formatted per-player URL this client polls.
    pub fn url(&self) -> &str {
        &self.player_url
    }
}

impl StatsClient for HiscoreClient {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let response = self
            .client
            .get(&self.player_url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(format!(
                "hiscore endpoint returned {status}"
            )));
        }

        let raw: HiscoreResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(into_snapshot(raw))
    }
}

/// Format the per-player request URL. Spaces in display names are
/// percent-encoded; the hiscore endpoint accepts no other specials.
fn player_url(api_url: &str, player: &str) -> String {
    let encoded = player.replace(' ', "%20");
    format!("{api_url}?player={encoded}")
}

/// Normalize the wire payload and stamp it with the fetch time.
fn into_snapshot(raw: HiscoreResponse) -> Snapshot {
    let mut activities = raw.activities;
    for activity in &mut activities {
        if activity.rank == -1 {
            activity.rank = 0;
            activity.score = 0;
        }
    }

    Snapshot {
        timestamp: Utc::now(),
        skills: raw.skills,
        activities,
    }
}
