//! Per-agent portfolio ledger: cash, positions, trade records and derived valuation.
//! Testable without the engine or any transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::feed::PriceSnapshot;
use crate::types::order::{AgentId, Qty};
use crate::types::position::Position;
use crate::types::trade::Trade;

pub type SharedLedger = Arc<RwLock<AgentLedger>>;

/// Quantity below which a position counts as fully closed.
pub const QUANTITY_EPSILON: Qty = 1e-4;

#[derive(Debug, Clone)]
pub struct AgentLedger {
    pub(crate) agent_id: AgentId,
    pub(crate) name: String,
    pub(crate) starting_capital: f64,
    pub(crate) cash_balance: f64,
    pub(crate) positions: BTreeMap<String, Position>,
    /// Oldest first; FIFO closing walks this in order.
    pub(crate) open_trades: Vec<Trade>,
    /// Closed records are not retained; win rate only needs the tallies.
    pub(crate) closed_count: u64,
    pub(crate) winning_count: u64,
    pub(crate) trades_count: u64,
    account_value: f64,
    total_pnl: f64,
}

/// `modelStates` projection of one ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerView {
    pub agent_id: AgentId,
    pub name: String,
    pub account_value: f64,
    pub cash_balance: f64,
    pub positions: Vec<Position>,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    pub return_percent: f64,
    pub win_rate: f64,
    pub trades_count: u64,
}

/// Periodic performance record written to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub agent_id: AgentId,
    pub account_value: f64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    pub win_rate: f64,
    pub trades_count: u64,
    pub timestamp: DateTime<Utc>,
}

impl AgentLedger {
    pub fn new(agent_id: &str, name: &str, starting_capital: f64) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            name: name.to_string(),
            starting_capital,
            cash_balance: starting_capital,
            positions: BTreeMap::new(),
            open_trades: Vec::new(),
            closed_count: 0,
            winning_count: 0,
            trades_count: 0,
            account_value: starting_capital,
            total_pnl: 0.0,
        }
    }

    pub fn shared(self) -> SharedLedger {
        Arc::new(RwLock::new(self))
    }

    /// Re-mark every position against `prices` and recompute account value from scratch.
    /// Symbols missing from the snapshot are marked at their average entry price.
    pub fn valuate(&mut self, prices: &PriceSnapshot) {
        let mut total = self.cash_balance;
        for position in self.positions.values_mut() {
            let price = prices
                .get(&position.symbol)
                .copied()
                .unwrap_or(position.average_entry_price);
            position.mark(price);
            total += position.current_value;
        }
        self.account_value = total;
        self.total_pnl = total - self.starting_capital;
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn starting_capital(&self) -> f64 {
        self.starting_capital
    }

    pub fn cash_balance(&self) -> f64 {
        self.cash_balance
    }

    pub fn account_value(&self) -> f64 {
        self.account_value
    }

    pub fn total_pnl(&self) -> f64 {
        self.total_pnl
    }

    pub fn return_percent(&self) -> f64 {
        if self.starting_capital > 0.0 {
            self.total_pnl / self.starting_capital * 100.0
        } else {
            0.0
        }
    }

    /// Share of closed trades with positive net PnL, in percent. Zero when nothing has closed.
    pub fn win_rate(&self) -> f64 {
        if self.closed_count == 0 {
            return 0.0;
        }
        self.winning_count as f64 / self.closed_count as f64 * 100.0
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn open_trades(&self) -> &[Trade] {
        &self.open_trades
    }

    pub fn closed_count(&self) -> u64 {
        self.closed_count
    }

    /// Closed trades with positive net PnL.
    pub fn winning_count(&self) -> u64 {
        self.winning_count
    }

    pub fn trades_count(&self) -> u64 {
        self.trades_count
    }

    /// Σ quantity × average entry price across open positions.
    pub fn committed_capital(&self) -> f64 {
        self.positions.values().map(Position::cost_basis).sum()
    }

    /// Open trades whose symbol no longer has a position in this ledger.
    pub fn orphaned_open_trades(&self) -> impl Iterator<Item = &Trade> {
        self.open_trades
            .iter()
            .filter(|t| !self.positions.contains_key(&t.symbol))
    }

    /// Close the oldest open trade for `symbol` and tally it for the win rate.
    pub(crate) fn close_oldest_open(
        &mut self,
        symbol: &str,
        exit_price: f64,
        notional_exit: f64,
        fee: f64,
        net_pnl: f64,
    ) -> Option<Trade> {
        let idx = self.open_trades.iter().position(|t| t.symbol == symbol)?;
        let mut trade = self.open_trades.remove(idx);
        trade.close(exit_price, notional_exit, fee, net_pnl);
        self.closed_count += 1;
        if trade.net_pnl > 0.0 {
            self.winning_count += 1;
        }
        Some(trade)
    }

    pub fn view(&self) -> LedgerView {
        LedgerView {
            agent_id: self.agent_id.clone(),
            name: self.name.clone(),
            account_value: self.account_value,
            cash_balance: self.cash_balance,
            positions: self.positions.values().cloned().collect(),
            total_pnl: self.total_pnl,
            return_percent: self.return_percent(),
            win_rate: self.win_rate(),
            trades_count: self.trades_count,
        }
    }

    pub fn performance_snapshot(&self) -> PerformanceSnapshot {
        PerformanceSnapshot {
            agent_id: self.agent_id.clone(),
            account_value: self.account_value,
            total_pnl: self.total_pnl,
            win_rate: self.win_rate(),
            trades_count: self.trades_count,
            timestamp: Utc::now(),
        }
    }
}
