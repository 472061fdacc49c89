//! One poll cycle: fetch a snapshot, record it, route the change flag.
//!
//! The poller is deliberately thin. It owns no policy beyond the
//! routing table in [`Poller::poll`]:
//!
//! | change flag | courier state | action                          |
//! |-------------|---------------|---------------------------------|
//! | `true`      | idle          | start courier, pack snapshot    |
//! | `true`      | recording     | pack snapshot                   |
//! | `false`     | recording     | finish with full day history    |
//! | `false`     | idle          | nothing (steady state)          |
//!
//! Timer cadence, retry counting, and shutdown all belong to the caller
//! (the runner binary). A fetch failure aborts the cycle before any
//! buffer or courier interaction, so a flaky upstream can never warp a
//! session boundary.

use std::sync::Arc;

use grindwatch_types::Snapshot;
use tracing::debug;

use crate::courier::{CourierError, Notifier, SessionCourier};
use crate::history::HistoryBuffer;

/// Errors surfaced by the stats-fetching collaborator.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request failed (connect, timeout, non-2xx status).
    #[error("hiscore request failed: {0}")]
    Http(String),

    /// The response body could not be decoded into a snapshot.
    #[error("hiscore response decode failed: {0}")]
    Decode(String),
}

/// Errors that can occur during one poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The upstream fetch failed; the cycle was aborted with no buffer
    /// or courier interaction. Retry policy is the caller's concern.
    #[error("fetch failed: {source}")]
    Fetch {
        /// The underlying fetch error.
        #[from]
        source: FetchError,
    },

    /// The courier rejected a hand-off.
    #[error("courier error: {source}")]
    Courier {
        /// The underlying courier error.
        #[from]
        source: CourierError,
    },
}

/// The stats-fetching collaborator called once per poll cycle.
pub trait StatsClient {
    /// Fetch one fresh snapshot of the tracked player.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the upstream call or decode fails.
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, FetchError>> + Send;
}

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No XP change and no session in progress.
    Idle,
    /// XP change detected while idle; a new session began with this
    /// snapshot.
    SessionStarted,
    /// XP change detected during an active session; snapshot appended.
    SessionContinued,
    /// No XP change ended the active session; the report hand-off has
    /// completed (delivered or logged as lost).
    SessionFinalized,
}

/// Summary of one completed poll cycle.
///
/// Carries a copy of the fetched snapshot so the caller can archive the
/// poll (e.g. into the database) without a second upstream fetch.
#[derive(Debug)]
pub struct PollCycle {
    /// How the cycle was routed.
    pub outcome: PollOutcome,
    /// The snapshot fetched during this cycle.
    pub snapshot: Snapshot,
}

/// Drives one fetch-record-route cycle per invocation.
pub struct Poller<C, N> {
    client: C,
    history: Arc<HistoryBuffer>,
    courier: SessionCourier<N>,
}

impl<C, N> Poller<C, N>
where
    C: StatsClient + Send + Sync,
    N: Notifier + Send + Sync + 'static,
{
    /// Wire a poller over its three collaborators.
    pub const fn new(client: C, history: Arc<HistoryBuffer>, courier: SessionCourier<N>) -> Self {
        Self {
            client,
            history,
            courier,
        }
    }

    /// Run exactly one poll cycle.
    ///
    /// The change flag returned by [`HistoryBuffer::add`] is the only
    /// session-boundary signal; buffer contents are never re-read to
    /// infer state.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Fetch`] if the upstream fetch fails (the
    /// buffer and courier are untouched in that case), or
    /// [`PollError::Courier`] if a hand-off to the session worker is
    /// rejected.
    pub async fn poll(&mut self) -> Result<PollCycle, PollError> {
        let snapshot = self.client.fetch().await?;
        let changed = self.history.add(snapshot.clone());

        let outcome = if changed {
            if self.courier.is_running() {
                self.courier.pack(snapshot.clone()).await?;
                PollOutcome::SessionContinued
            } else {
                self.courier.start()?;
                self.courier.pack(snapshot.clone()).await?;
                PollOutcome::SessionStarted
            }
        } else if self.courier.is_running() {
            self.courier.finish(self.history.get_all()).await?;
            PollOutcome::SessionFinalized
        } else {
            PollOutcome::Idle
        };

        debug!(?outcome, history_len = self.history.len(), "poll cycle complete");
        Ok(PollCycle { outcome, snapshot })
    }

    /// Whether a session is currently being recorded.
    pub fn session_active(&self) -> bool {
        self.courier.is_running()
    }

    /// Shut down the courier, discarding any in-flight session.
    pub async fn shutdown(&mut self) {
        self.courier.stop().await;
    }
}
