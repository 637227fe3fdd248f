//! Trade persistence: insert on buy, update on close, recent/open reads.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::trade::{Trade, TradeSide, TradeStatus};

fn side_to_str(side: TradeSide) -> &'static str {
    match side {
        TradeSide::Long => "long",
        TradeSide::Short => "short",
    }
}

fn str_to_side(s: &str) -> Option<TradeSide> {
    match s {
        "long" => Some(TradeSide::Long),
        "short" => Some(TradeSide::Short),
        _ => None,
    }
}

fn status_to_str(status: TradeStatus) -> &'static str {
    match status {
        TradeStatus::Open => "OPEN",
        TradeStatus::Closed => "CLOSED",
    }
}

fn str_to_status(s: &str) -> Option<TradeStatus> {
    match s {
        "OPEN" => Some(TradeStatus::Open),
        "CLOSED" => Some(TradeStatus::Closed),
        _ => None,
    }
}

#[derive(Debug, FromRow)]
pub struct TradeRow {
    pub id: Uuid,
    pub agent_id: String,
    pub side: String,
    pub symbol: String,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub notional_entry: f64,
    pub notional_exit: Option<f64>,
    pub fees: f64,
    pub net_pnl: f64,
    pub status: String,
}

impl TradeRow {
    /// Rows with an unknown side or status are skipped by callers.
    pub fn into_trade(self) -> Option<Trade> {
        Some(Trade {
            side: str_to_side(&self.side)?,
            status: str_to_status(&self.status)?,
            id: self.id,
            agent_id: self.agent_id,
            symbol: self.symbol,
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            quantity: self.quantity,
            entry_time: self.entry_time,
            exit_time: self.exit_time,
            notional_entry: self.notional_entry,
            notional_exit: self.notional_exit,
            fees: self.fees,
            net_pnl: self.net_pnl,
        })
    }
}

const TRADE_COLUMNS: &str = "id, agent_id, side, symbol, entry_price, exit_price, quantity, entry_time, \
     exit_time, notional_entry, notional_exit, fees, net_pnl, status";

/// Insert a freshly opened trade.
pub async fn insert_trade(pool: &PgPool, trade: &Trade) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO trades (id, agent_id, side, symbol, entry_price, exit_price, quantity, entry_time, \
         exit_time, notional_entry, notional_exit, fees, net_pnl, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(trade.id)
    .bind(&trade.agent_id)
    .bind(side_to_str(trade.side))
    .bind(&trade.symbol)
    .bind(trade.entry_price)
    .bind(trade.exit_price)
    .bind(trade.quantity)
    .bind(trade.entry_time)
    .bind(trade.exit_time)
    .bind(trade.notional_entry)
    .bind(trade.notional_exit)
    .bind(trade.fees)
    .bind(trade.net_pnl)
    .bind(status_to_str(trade.status))
    .execute(pool)
    .await?;
    Ok(())
}

/// Write the exit side of a trade (by id).
pub async fn update_trade(pool: &PgPool, trade: &Trade) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE trades SET exit_price = $1, exit_time = $2, notional_exit = $3, fees = $4, \
         net_pnl = $5, status = $6 WHERE id = $7",
    )
    .bind(trade.exit_price)
    .bind(trade.exit_time)
    .bind(trade.notional_exit)
    .bind(trade.fees)
    .bind(trade.net_pnl)
    .bind(status_to_str(trade.status))
    .bind(trade.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recently opened trades first.
pub async fn list_recent_trades(pool: &PgPool, limit: usize) -> Result<Vec<Trade>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TradeRow>(&format!(
        "SELECT {TRADE_COLUMNS} FROM trades ORDER BY entry_time DESC LIMIT $1"
    ))
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().filter_map(TradeRow::into_trade).collect())
}

/// Same order as the in-memory ledgers: oldest first.
fn open_trades_sql(by_agent: bool) -> String {
    let filter = if by_agent { " AND agent_id = $1" } else { "" };
    format!("SELECT {TRADE_COLUMNS} FROM trades WHERE status = 'OPEN'{filter} ORDER BY entry_time ASC")
}

/// Open trades, optionally for one agent, oldest first.
pub async fn list_open_trades(
    pool: &PgPool,
    agent_id: Option<&str>,
) -> Result<Vec<Trade>, sqlx::Error> {
    let sql = open_trades_sql(agent_id.is_some());
    let mut query = sqlx::query_as::<_, TradeRow>(&sql);
    if let Some(agent_id) = agent_id {
        query = query.bind(agent_id);
    }
    let rows = query.fetch_all(pool).await?;
    Ok(rows.into_iter().filter_map(TradeRow::into_trade).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_trades_are_read_oldest_first() {
        for by_agent in [false, true] {
            let sql = open_trades_sql(by_agent);
            assert!(sql.ends_with("ORDER BY entry_time ASC"), "{sql}");
            assert_eq!(sql.contains("agent_id = $1"), by_agent);
        }
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [TradeStatus::Open, TradeStatus::Closed] {
            assert_eq!(str_to_status(status_to_str(status)), Some(status));
        }
        assert_eq!(str_to_side(side_to_str(TradeSide::Long)), Some(TradeSide::Long));
        assert_eq!(str_to_status("open"), None);
    }
}
