//! `PostgreSQL` poll archive for grindwatch.
//!
//! The archive is optional -- the core session machinery is entirely
//! in-memory, and nothing here participates in session detection. When a
//! `DATABASE_URL` is configured, the runner writes every successful poll
//! into the `polls` table (timestamp plus the skills and activities rows
//! as JSONB) so day histories survive restarts for offline analysis.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool configuration and handle
//! - [`poll_store`] -- the `polls` table operations
//! - [`error`] -- shared error type

pub mod error;
pub mod poll_store;
pub mod postgres;

pub use error::DbError;
pub use poll_store::{PollRow, PollStore};
pub use postgres::{PostgresConfig, PostgresPool};
