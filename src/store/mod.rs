//! Read-only access to the relational store
//!
//! Two SQLite databases are consulted:
//! - the event log, mapping frame ids to the time the input was logged
//! - the broadcast index, listing recorded broadcasts with start and length

#[cfg(test)]
pub(crate) mod fixtures;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::timestamp::{format_offset, parse_timestamp, to_sql_timestamp};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use tracing::debug;

/// One recorded broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Broadcast {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub length_secs: i64,
}

impl Broadcast {
    pub fn end(&self) -> DateTime<Utc> {
        self.recorded_at + TimeDelta::seconds(self.length_secs)
    }

    /// Whether `at` falls within `[recorded_at, recorded_at + length)`
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.recorded_at <= at && at < self.end()
    }

    /// Offset of `at` into the broadcast
    pub fn offset_of(&self, at: DateTime<Utc>) -> TimeDelta {
        at - self.recorded_at
    }

    /// Shareable URL pointing at `at` inside the broadcast
    pub fn web_url(&self, template: &str, at: DateTime<Utc>) -> String {
        template
            .replace("{id}", &self.id.to_string())
            .replace("{offset}", &format_offset(self.offset_of(at)))
    }
}

#[derive(Debug, FromRow)]
struct BroadcastRow {
    id: i64,
    recorded_at: String,
    length: i64,
}

impl TryFrom<BroadcastRow> for Broadcast {
    type Error = crate::error::Error;

    fn try_from(row: BroadcastRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            recorded_at: parse_timestamp(&row.recorded_at)?,
            length_secs: row.length,
        })
    }
}

async fn open_read_only(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .create_if_missing(false);

    debug!("Opening SQLite database at {:?}", path);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Event log handle (frame id -> logged time)
#[derive(Clone)]
pub struct EventLog {
    pool: SqlitePool,
    table: String,
}

impl EventLog {
    pub async fn open(path: &Path, config: &StoreConfig) -> Result<Self> {
        Ok(Self {
            pool: open_read_only(path).await?,
            table: config.input_table.clone(),
        })
    }

    /// Time the input for `frame_id` was logged
    pub async fn logged_time(&self, frame_id: i64) -> Result<Option<DateTime<Utc>>> {
        let query = format!("SELECT date FROM {} WHERE id = ? LIMIT 1", self.table);
        let row: Option<(String,)> = sqlx::query_as(&query)
            .bind(frame_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(date,)| parse_timestamp(&date)).transpose()
    }
}

/// Broadcast index handle
#[derive(Clone)]
pub struct BroadcastIndex {
    pool: SqlitePool,
    table: String,
}

impl BroadcastIndex {
    pub async fn open(path: &Path, config: &StoreConfig) -> Result<Self> {
        Ok(Self {
            pool: open_read_only(path).await?,
            table: config.broadcast_table.clone(),
        })
    }

    /// Most recent broadcast that started at or before `at`
    ///
    /// The broadcast may have ended before `at`; the caller finds out when no
    /// segment covers the time.
    pub async fn latest_started_by(&self, at: DateTime<Utc>) -> Result<Option<Broadcast>> {
        let query = format!(
            r#"
            SELECT id, recorded_at, length
            FROM {}
            WHERE julianday(recorded_at) <= julianday(?)
            ORDER BY julianday(recorded_at) DESC
            LIMIT 1
            "#,
            self.table
        );

        let row = sqlx::query_as::<_, BroadcastRow>(&query)
            .bind(to_sql_timestamp(at))
            .fetch_optional(&self.pool)
            .await?;

        row.map(Broadcast::try_from).transpose()
    }
}
