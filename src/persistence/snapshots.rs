//! Performance snapshot persistence.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::ledger::PerformanceSnapshot;

#[derive(Debug, FromRow)]
pub struct SnapshotRow {
    pub agent_id: String,
    pub account_value: f64,
    pub total_pnl: f64,
    pub win_rate: f64,
    pub trades_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<SnapshotRow> for PerformanceSnapshot {
    fn from(row: SnapshotRow) -> Self {
        PerformanceSnapshot {
            agent_id: row.agent_id,
            account_value: row.account_value,
            total_pnl: row.total_pnl,
            win_rate: row.win_rate,
            trades_count: row.trades_count.max(0) as u64,
            timestamp: row.created_at,
        }
    }
}

pub async fn insert_snapshot(pool: &PgPool, snapshot: &PerformanceSnapshot) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO performance_snapshots (agent_id, account_value, total_pnl, win_rate, trades_count, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&snapshot.agent_id)
    .bind(snapshot.account_value)
    .bind(snapshot.total_pnl)
    .bind(snapshot.win_rate)
    .bind(snapshot.trades_count as i64)
    .bind(snapshot.timestamp)
    .execute(pool)
    .await?;
    Ok(())
}

/// Snapshots for one agent since `since`, oldest first (for charting).
pub async fn list_snapshots_since(
    pool: &PgPool,
    agent_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<PerformanceSnapshot>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SnapshotRow>(
        "SELECT agent_id, account_value, total_pnl, win_rate, trades_count, created_at \
         FROM performance_snapshots WHERE agent_id = $1 AND created_at >= $2 ORDER BY created_at ASC",
    )
    .bind(agent_id)
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(PerformanceSnapshot::from).collect())
}
