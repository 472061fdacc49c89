//! Session courier: the Idle/Recording state machine.
//!
//! A *session* is the contiguous run of snapshots between a detected XP
//! change and the next no-change poll. The courier accumulates those
//! snapshots on a dedicated worker task and, when the session ends,
//! hands the full day history plus the session's own snapshots to the
//! [`Notifier`] exactly once.
//!
//! # Hand-off design
//!
//! The poll loop talks to the worker over a *bounded* mpsc channel, and
//! every send is preceded by an explicit running check: sending to a
//! courier that was never started returns [`CourierError::NotRunning`]
//! immediately instead of blocking forever. [`SessionCourier::finish`]
//! additionally joins the worker, so the report attempt has fully
//! resolved (delivered or logged as lost) before the next poll cycle
//! begins.
//!
//! # Failure policy
//!
//! Report delivery is at-most-once. A delivery error is logged with the
//! number of lost snapshots and the accumulator is reset regardless; no
//! retry, no spill to disk. A session that ends with zero accumulated
//! snapshots produces no report at all.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use grindwatch_types::Snapshot;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Bound on the worker's input queue. One snapshot arrives per poll
/// cycle, so anything above single digits only matters if the notifier
/// stalls mid-finalize.
const QUEUE_CAPACITY: usize = 32;

/// Errors surfaced by the reporting collaborator.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The report could not be built or delivered.
    #[error("report delivery failed: {0}")]
    Delivery(String),
}

/// Errors that can occur when driving the session courier.
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    /// `start` was called while a session worker is already running.
    #[error("courier is already recording a session")]
    AlreadyRunning,

    /// `pack` or `finish` was called while the courier is idle.
    ///
    /// The poll loop is expected to check [`SessionCourier::is_running`]
    /// first; this error is the fail-fast replacement for blocking on a
    /// channel nobody is reading.
    #[error("courier is not running")]
    NotRunning,

    /// The worker task went away with messages still in flight.
    #[error("courier worker channel closed unexpectedly")]
    ChannelClosed,
}

/// The reporting collaborator called once per completed session.
///
/// `day` is the full rolling history at finalize time; `session` is the
/// accumulator for the session that just ended, in poll order.
pub trait Notifier {
    /// Build and deliver one session report.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the report cannot be delivered. The
    /// courier logs the error and resets regardless -- implementations
    /// should not assume a retry.
    fn report(
        &self,
        day: &[Snapshot],
        session: &[Snapshot],
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Messages accepted by the session worker.
#[derive(Debug)]
enum CourierMessage {
    /// One in-session snapshot to append to the accumulator.
    Pack(Snapshot),
    /// Finalize the session, reporting against this day history.
    Finish(Vec<Snapshot>),
}

/// Accumulates one session's snapshots and triggers its report.
///
/// States:
///
/// - **Idle** -- no worker task, `is_running()` is `false`. `pack` and
///   `finish` fail fast.
/// - **Recording** -- a worker task owns the session accumulator and
///   drains the input queue. Entered via [`start`], left via
///   [`finish`] (report) or [`stop`] (discard).
///
/// [`start`]: SessionCourier::start
/// [`finish`]: SessionCourier::finish
/// [`stop`]: SessionCourier::stop
#[derive(Debug)]
pub struct SessionCourier<N> {
    notifier: Arc<N>,
    running: Arc<AtomicBool>,
    tx: Option<mpsc::Sender<CourierMessage>>,
    worker: Option<JoinHandle<()>>,
}

impl<N> SessionCourier<N>
where
    N: Notifier + Send + Sync + 'static,
{
    /// Create an idle courier that will report through `notifier`.
    pub fn new(notifier: Arc<N>) -> Self {
        Self {
            notifier,
            running: Arc::new(AtomicBool::new(false)),
            tx: None,
            worker: None,
        }
    }

    /// Whether a session worker is currently recording.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the session worker and enter Recording.
    ///
    /// The running flag is set before the task is spawned, so a `pack`
    /// issued immediately after `start` returns cannot race past an
    /// unstarted worker.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::AlreadyRunning`] if a session is already
    /// being recorded.
    pub fn start(&mut self) -> Result<(), CourierError> {
        if self.is_running() {
            return Err(CourierError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        self.running.store(true, Ordering::SeqCst);
        self.tx = Some(tx);
        self.worker = Some(tokio::spawn(run_session(
            rx,
            Arc::clone(&self.notifier),
            Arc::clone(&self.running),
        )));
        debug!("session recording started");
        Ok(())
    }

    /// Append one snapshot to the active session.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::NotRunning`] if the courier is idle, or
    /// [`CourierError::ChannelClosed`] if the worker died.
    pub async fn pack(&self, snapshot: Snapshot) -> Result<(), CourierError> {
        if !self.is_running() {
            return Err(CourierError::NotRunning);
        }
        let tx = self.tx.as_ref().ok_or(CourierError::NotRunning)?;
        tx.send(CourierMessage::Pack(snapshot))
            .await
            .map_err(|_| CourierError::ChannelClosed)
    }

    /// Finalize the active session against the given day history.
    ///
    /// Sends the finalize signal, then joins the worker: when this
    /// returns, the report attempt has completed (or its failure has
    /// been logged) and the courier is Idle with an empty accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::NotRunning`] if the courier is idle, or
    /// [`CourierError::ChannelClosed`] if the worker died before
    /// receiving the signal.
    pub async fn finish(&mut self, day: Vec<Snapshot>) -> Result<(), CourierError> {
        if !self.is_running() {
            return Err(CourierError::NotRunning);
        }
        let tx = self.tx.take().ok_or(CourierError::NotRunning)?;
        let sent = tx.send(CourierMessage::Finish(day)).await;
        drop(tx);

        self.join_worker().await;
        self.running.store(false, Ordering::SeqCst);

        sent.map_err(|_| CourierError::ChannelClosed)
    }

    /// Shut the courier down, discarding any in-flight session without
    /// a report. Idempotent; intended for process shutdown.
    pub async fn stop(&mut self) {
        self.tx = None;
        self.join_worker().await;
        if self.running.swap(false, Ordering::SeqCst) {
            info!("courier stopped, in-flight session discarded");
        }
    }

    /// Await the worker task if one exists.
    async fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if let Err(join_error) = worker.await {
                warn!(%join_error, "courier worker ended abnormally");
            }
        }
    }
}

/// Worker loop: owns the session accumulator for exactly one session.
async fn run_session<N>(
    mut rx: mpsc::Receiver<CourierMessage>,
    notifier: Arc<N>,
    running: Arc<AtomicBool>,
) where
    N: Notifier + Send + Sync,
{
    let mut session: Vec<Snapshot> = Vec::new();

    while let Some(message) = rx.recv().await {
        match message {
            CourierMessage::Pack(snapshot) => {
                session.push(snapshot);
                debug!(session_len = session.len(), "packed in-session snapshot");
            }
            CourierMessage::Finish(day) => {
                // Leave Recording before the (potentially slow) report
                // so the observable state matches the session boundary.
                running.store(false, Ordering::SeqCst);

                if session.is_empty() {
                    warn!("session finalized with no snapshots, skipping report");
                } else if let Err(notify_error) = notifier.report(&day, &session).await {
                    error!(
                        %notify_error,
                        lost_snapshots = session.len(),
                        "report delivery failed, session data dropped"
                    );
                } else {
                    info!(
                        session_len = session.len(),
                        day_len = day.len(),
                        "session report delivered"
                    );
                }

                session.clear();
                return;
            }
        }
    }

    // Channel closed without a finalize: stop() path, discard.
    running.store(false, Ordering::SeqCst);
}
