use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::order::{Price, Qty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Long,
    Short,
}

/// Lifecycle of a trade record: `Open -> Closed`, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: Uuid,
    pub agent_id: String,
    pub side: TradeSide,
    pub symbol: String,
    pub entry_price: Price,
    pub exit_price: Option<Price>,
    pub quantity: Qty,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub notional_entry: f64,
    pub notional_exit: Option<f64>,
    pub fees: f64,
    #[serde(rename = "netPnL")]
    pub net_pnl: f64,
    pub status: TradeStatus,
}

impl Trade {
    /// New long trade at buy time. The entry fee is realized immediately.
    pub fn open_long(agent_id: &str, symbol: &str, price: Price, quantity: Qty, notional: f64, fee: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.to_string(),
            side: TradeSide::Long,
            symbol: symbol.to_string(),
            entry_price: price,
            exit_price: None,
            quantity,
            entry_time: Utc::now(),
            exit_time: None,
            notional_entry: notional,
            notional_exit: None,
            fees: fee,
            net_pnl: -fee,
            status: TradeStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Close against an exit fill. Returns false (and leaves the record untouched)
    /// if the trade was already closed.
    pub fn close(&mut self, exit_price: Price, notional_exit: f64, fee: f64, net_pnl: f64) -> bool {
        if !self.is_open() {
            return false;
        }
        self.exit_price = Some(exit_price);
        self.exit_time = Some(Utc::now());
        self.notional_exit = Some(notional_exit);
        self.fees += fee;
        self.net_pnl = net_pnl;
        self.status = TradeStatus::Closed;
        true
    }
}
