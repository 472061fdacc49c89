//! Operations on the `polls` table.
//!
//! One row per successful poll: the fetch timestamp plus the full skills
//! and activities tables as JSONB. Rows are append-only; the archive has
//! no part in session detection and is only read back for offline
//! analysis.

use chrono::{DateTime, Utc};
use grindwatch_types::Snapshot;
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `polls` table.
pub struct PollStore<'a> {
    pool: &'a PgPool,
}

/// One archived poll row.
#[derive(Debug, sqlx::FromRow)]
pub struct PollRow {
    /// Surrogate row id.
    pub id: i64,
    /// When the snapshot was fetched.
    pub polled_at: DateTime<Utc>,
    /// Skill rows as JSONB.
    pub skills: serde_json::Value,
    /// Activity rows as JSONB.
    pub activities: serde_json::Value,
}

impl<'a> PollStore<'a> {
    /// Create a new poll store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the `polls` table if it does not exist yet.
    ///
    /// Kept as an in-process bootstrap (rather than a migration
    /// directory) because the archive is a single append-only table and
    /// the daemon is its only writer.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS polls (
                id BIGSERIAL PRIMARY KEY,
                polled_at TIMESTAMPTZ NOT NULL,
                skills JSONB NOT NULL,
                activities JSONB NOT NULL
            )",
        )
        .execute(self.pool)
        .await?;

        tracing::debug!("poll archive schema ensured");
        Ok(())
    }

    /// Append one snapshot to the archive.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the snapshot rows cannot be
    /// encoded, or [`DbError::Postgres`] if the insert fails.
    pub async fn insert_poll(&self, snapshot: &Snapshot) -> Result<(), DbError> {
        let skills = serde_json::to_value(&snapshot.skills)?;
        let activities = serde_json::to_value(&snapshot.activities)?;

        sqlx::query(
            r"INSERT INTO polls (polled_at, skills, activities)
              VALUES ($1, $2, $3)",
        )
        .bind(snapshot.timestamp)
        .bind(skills)
        .bind(activities)
        .execute(self.pool)
        .await?;

        tracing::debug!(polled_at = %snapshot.timestamp, "archived poll");
        Ok(())
    }

    /// Fetch the most recent `limit` rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn recent_polls(&self, limit: i64) -> Result<Vec<PollRow>, DbError> {
        let rows = sqlx::query_as::<_, PollRow>(
            r"SELECT id, polled_at, skills, activities
              FROM polls
              ORDER BY polled_at DESC
              LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
