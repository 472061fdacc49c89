//! Core session-detection machinery for the grindwatch poller.
//!
//! Everything with a real invariant lives here; the hiscore client, the
//! Discord notifier, and the poll archive are thin I/O collaborators
//! behind the [`StatsClient`] and [`Notifier`] seams.
//!
//! # Architecture
//!
//! ```text
//! Poller --> StatsClient (fetch) --> Snapshot
//!    |
//!    +-- HistoryBuffer::add --> changed flag
//!    |
//!    +-- changed:    SessionCourier::pack  (accumulate)
//!    +-- no change:  SessionCourier::finish (report + reset)
//! ```
//!
//! The change flag returned by [`HistoryBuffer::add`] is the single
//! source of truth for session boundaries. The courier never re-reads
//! buffer contents to decide where a session starts or ends.
//!
//! # Modules
//!
//! - [`history`] -- fixed-capacity circular snapshot store with XP change
//!   detection
//! - [`courier`] -- the Idle/Recording state machine that accumulates a
//!   session and triggers exactly one report when it ends
//! - [`poller`] -- one poll cycle: fetch, add, route

pub mod courier;
pub mod history;
pub mod poller;

pub use courier::{CourierError, Notifier, NotifyError, SessionCourier};
pub use history::{HistoryBuffer, HistoryError};
pub use poller::{FetchError, PollCycle, PollError, PollOutcome, Poller, StatsClient};
