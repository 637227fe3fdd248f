//! State publisher: typed events fanned out to every subscriber, plus a bounded journal of
//! recent trades and decisions for bootstrapping late joiners.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};

use crate::ledger::LedgerView;
use crate::types::decision::Decision;
use crate::types::order::{AgentId, OrderSide, Price, Qty};
use crate::types::quote::PriceQuote;
use crate::types::trade::Trade;

/// Execution notice, emitted once per successful buy or sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    pub agent_id: AgentId,
    pub side: OrderSide,
    pub symbol: String,
    pub quantity: Qty,
    pub price: Price,
}

/// Full state dump sent to a subscriber before any incremental event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    pub prices: Vec<PriceQuote>,
    pub model_states: Vec<LedgerView>,
    pub recent_trades: Vec<Trade>,
    pub recent_decisions: Vec<Decision>,
}

/// Wire envelope: `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EngineEvent {
    Init(InitPayload),
    Price(PriceQuote),
    ModelStates(Vec<LedgerView>),
    Trade(TradeEvent),
    Decision(Decision),
}

pub struct Journal {
    capacity: usize,
    trades: VecDeque<Trade>,
    decisions: VecDeque<Decision>,
}

impl Journal {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            trades: VecDeque::new(),
            decisions: VecDeque::new(),
        }
    }

    /// Append a trade, or replace it in place if the id is already journaled (e.g. on close).
    pub fn record_trade(&mut self, trade: Trade) {
        if let Some(existing) = self.trades.iter_mut().find(|t| t.id == trade.id) {
            *existing = trade;
            return;
        }
        self.trades.push_back(trade);
        while self.trades.len() > self.capacity {
            self.trades.pop_front();
        }
    }

    pub fn record_decision(&mut self, decision: Decision) {
        self.decisions.push_back(decision);
        while self.decisions.len() > self.capacity {
            self.decisions.pop_front();
        }
    }

    /// Most recent first.
    pub fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        self.trades.iter().rev().take(limit).cloned().collect()
    }

    /// Most recent first.
    pub fn recent_decisions(&self, limit: usize) -> Vec<Decision> {
        self.decisions.iter().rev().take(limit).cloned().collect()
    }

    /// Seed from storage rows given most recent first.
    pub fn hydrate(&mut self, trades: Vec<Trade>, decisions: Vec<Decision>) {
        for trade in trades.into_iter().rev() {
            self.record_trade(trade);
        }
        for decision in decisions.into_iter().rev() {
            self.record_decision(decision);
        }
    }
}

#[derive(Clone)]
pub struct Publisher {
    events: broadcast::Sender<EngineEvent>,
    journal: Arc<RwLock<Journal>>,
}

impl Publisher {
    pub fn new(buffer: usize, journal_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(buffer.max(1));
        Self {
            events,
            journal: Arc::new(RwLock::new(Journal::new(journal_capacity))),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Fire-and-forget fan-out; never waits on subscribers.
    pub fn publish(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    pub fn journal(&self) -> &Arc<RwLock<Journal>> {
        &self.journal
    }

    pub async fn record_trade(&self, trade: Trade) {
        self.journal.write().await.record_trade(trade);
    }

    pub async fn record_decision(&self, decision: Decision) {
        self.journal.write().await.record_decision(decision);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decision::{DecisionKind, PortfolioComfort};

    fn decision(symbol: &str) -> Decision {
        Decision {
            agent_id: "a".to_string(),
            decision: DecisionKind::Hold,
            symbol: symbol.to_string(),
            confidence: 60,
            reasoning: String::new(),
            portfolio_comfort: PortfolioComfort::Neutral,
            amount: None,
            executed: false,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn journal_replaces_closed_trade_in_place() {
        let mut journal = Journal::new(10);
        let mut trade = Trade::open_long("a", "BTC", 100.0, 1.0, 100.0, 0.1);
        journal.record_trade(trade.clone());
        trade.close(110.0, 110.0, 0.11, 9.89);
        journal.record_trade(trade.clone());

        let recent = journal.recent_trades(10);
        assert_eq!(recent.len(), 1);
        assert!(!recent[0].is_open());
    }

    #[test]
    fn journal_is_bounded_and_newest_first() {
        let mut journal = Journal::new(2);
        for symbol in ["BTC", "ETH", "SOL"] {
            journal.record_decision(decision(symbol));
        }
        let recent = journal.recent_decisions(10);
        let symbols: Vec<&str> = recent.iter().map(|d| d.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SOL", "ETH"]);
    }

    #[test]
    fn envelope_shape() {
        let json = serde_json::to_value(EngineEvent::Decision(decision("BTC"))).unwrap();
        assert_eq!(json["type"], "decision");
        assert_eq!(json["data"]["decision"], "HOLD");
        assert_eq!(json["data"]["portfolioComfort"], "neutral");

        let json = serde_json::to_value(EngineEvent::ModelStates(vec![])).unwrap();
        assert_eq!(json["type"], "modelStates");
    }
}
