//! Read-only Postgres access. The engine never writes; [`SCHEMA_DDL`] is the
//! layout these queries expect, for setting up a database to read from.

use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::config::Settings;
use crate::dates;
use crate::history::{HistoryResult, HistorySource, RawDayEntry};
use crate::models::{TimeWindowRaw, TradeRecord};

/// Tables read by [`fetch_trades`] and [`PgHistory`]. Not executed by this crate.
pub const SCHEMA_DDL: &str = r#"
CREATE SCHEMA IF NOT EXISTS trading_psych;

CREATE TABLE IF NOT EXISTS trading_psych.trades (
    id UUID PRIMARY KEY,
    entry_time TIMESTAMPTZ,
    pnl DOUBLE PRECISION,
    exited_early BOOLEAN,
    score DOUBLE PRECISION
);

CREATE TABLE IF NOT EXISTS trading_psych.time_windows (
    session_date DATE NOT NULL,
    window_id TEXT,
    start_hour INTEGER,
    end_hour INTEGER,
    score DOUBLE PRECISION,
    trade_count INTEGER,
    color TEXT,
    message TEXT
);

CREATE INDEX IF NOT EXISTS time_windows_session_date_idx
    ON trading_psych.time_windows (session_date);
"#;

pub async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    let database_url = settings
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when no input files are given")?;

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn fetch_trades(pool: &PgPool) -> anyhow::Result<Vec<TradeRecord>> {
    let records = sqlx::query(
        r#"
        SELECT t.id, t.entry_time, t.pnl, t.exited_early, t.score
        FROM trading_psych.trades t
        ORDER BY t.entry_time
        "#,
    )
    .fetch_all(pool)
    .await?;
    let mut trades = Vec::with_capacity(records.len());

    for row in records {
        let id: Uuid = row.try_get("id")?;
        let entry_time: Option<DateTime<Utc>> = row.try_get("entry_time")?;
        trades.push(TradeRecord {
            id: id.to_string(),
            occurred_at: entry_time.map(|utc| utc.with_timezone(&Local).naive_local()),
            pnl: row.try_get::<Option<f64>, _>("pnl")?.unwrap_or(0.0),
            exited_early: row.try_get::<Option<bool>, _>("exited_early")?.unwrap_or(false),
            score: row.try_get("score")?,
        });
    }

    tracing::info!(trades = trades.len(), "trades loaded from Postgres");
    Ok(trades)
}

/// Reads per-day time windows from `trading_psych.time_windows`.
pub struct PgHistory {
    pool: PgPool,
}

impl PgHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn hour(value: Option<i32>) -> Option<u32> {
    value.and_then(|hour| u32::try_from(hour).ok())
}

#[async_trait]
impl HistorySource for PgHistory {
    async fn fetch_history(&self, start_iso: &str, end_iso: &str) -> anyhow::Result<Option<HistoryResult>> {
        let start = dates::date_as_written(start_iso)?;
        let end = dates::date_as_written(end_iso)?;

        let records = sqlx::query(
            r#"
            SELECT w.session_date, w.window_id, w.start_hour, w.end_hour,
                   w.score, w.trade_count, w.color, w.message
            FROM trading_psych.time_windows w
            WHERE w.session_date BETWEEN $1 AND $2
            ORDER BY w.session_date, w.start_hour
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut days: BTreeMap<NaiveDate, Vec<TimeWindowRaw>> = BTreeMap::new();
        for row in records {
            let session_date: NaiveDate = row.try_get("session_date")?;
            days.entry(session_date).or_default().push(TimeWindowRaw {
                id: row.try_get("window_id")?,
                start_hour: hour(row.try_get("start_hour")?),
                end_hour: hour(row.try_get("end_hour")?),
                score: row.try_get("score")?,
                trade_count: row
                    .try_get::<Option<i32>, _>("trade_count")?
                    .and_then(|count| u32::try_from(count).ok()),
                color: row.try_get("color")?,
                message: row.try_get("message")?,
            });
        }

        let history = days
            .into_iter()
            .map(|(date, windows)| RawDayEntry {
                date: Some(date.to_string()),
                windows: Some(windows),
            })
            .collect();

        Ok(Some(HistoryResult {
            history: Some(history),
            single: RawDayEntry::default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> &'static str {
        let start = SCHEMA_DDL
            .find(&format!("CREATE TABLE IF NOT EXISTS {name} ("))
            .unwrap();
        let rest = &SCHEMA_DDL[start..];
        &rest[..rest.find(");").unwrap()]
    }

    #[test]
    fn schema_covers_every_column_read() {
        let trades = table("trading_psych.trades");
        for column in ["id UUID", "entry_time TIMESTAMPTZ", "pnl", "exited_early", "score"] {
            assert!(trades.contains(column), "trades is missing {column}");
        }

        let windows = table("trading_psych.time_windows");
        for column in [
            "session_date DATE",
            "window_id TEXT",
            "start_hour INTEGER",
            "end_hour INTEGER",
            "score",
            "trade_count INTEGER",
            "color",
            "message",
        ] {
            assert!(windows.contains(column), "time_windows is missing {column}");
        }
    }

    #[test]
    fn negative_hours_read_as_missing() {
        assert_eq!(hour(Some(9)), Some(9));
        assert_eq!(hour(Some(-1)), None);
        assert_eq!(hour(None), None);
    }
}
