//! The simulation engine. Owns one ledger per agent and is the single writer for each of them:
//! valuation, execution and decision evaluation all take that agent's write lock.
//! Ledgers of different agents are independent.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info, trace, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Duration, interval, sleep};

use crate::config::{AgentSpec, LedgerConfig};
use crate::error::{Error, Result};
use crate::execution::{self, Fill};
use crate::feed::{PriceFeed, normalize_symbol};
use crate::ledger::{AgentLedger, LedgerView, PerformanceSnapshot, SharedLedger};
use crate::persistence::{PersistCommand, Persister};
use crate::policy::DecisionPolicy;
use crate::publisher::{EngineEvent, InitPayload, Publisher, TradeEvent};
use crate::types::decision::{Decision, DecisionKind};
use crate::types::order::{AgentId, OrderSide};
use crate::types::quote::PriceQuote;
use crate::types::trade::Trade;

pub struct Engine {
    config: LedgerConfig,
    feed: PriceFeed,
    ledgers: BTreeMap<AgentId, SharedLedger>,
    publisher: Publisher,
    persister: Persister,
}

impl Engine {
    pub fn new(
        config: LedgerConfig,
        agents: &[AgentSpec],
        feed: PriceFeed,
        publisher: Publisher,
        persister: Persister,
    ) -> Self {
        let ledgers = agents
            .iter()
            .map(|a| {
                let ledger = AgentLedger::new(&a.id, &a.name, config.starting_capital);
                (a.id.clone(), ledger.shared())
            })
            .collect();
        info!("Engine initialised with {} agents", agents.len());
        Self {
            config,
            feed,
            ledgers,
            publisher,
            persister,
        }
    }

    pub fn feed(&self) -> &PriceFeed {
        &self.feed
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.ledgers.keys().map(String::as_str)
    }

    pub fn ledger(&self, agent_id: &str) -> Option<SharedLedger> {
        self.ledgers.get(agent_id).cloned()
    }

    fn ledger_ref(&self, agent_id: &str) -> Result<&SharedLedger> {
        self.ledgers
            .get(agent_id)
            .ok_or_else(|| Error::UnknownAgent(agent_id.to_string()))
    }

    /// Buy `notional` USD of `symbol` for `agent_id` at the current price.
    pub async fn buy(&self, agent_id: &str, symbol: &str, notional: f64) -> Result<Fill> {
        self.submit(agent_id, OrderSide::Buy, symbol, notional).await
    }

    /// Sell up to `notional` USD of `symbol` for `agent_id` at the current price.
    pub async fn sell(&self, agent_id: &str, symbol: &str, notional: f64) -> Result<Fill> {
        self.submit(agent_id, OrderSide::Sell, symbol, notional).await
    }

    async fn submit(&self, agent_id: &str, side: OrderSide, symbol: &str, notional: f64) -> Result<Fill> {
        let ledger = self.ledger_ref(agent_id)?;
        let fill = {
            let mut guard = ledger.write().await;
            self.execute(&mut guard, side, symbol, notional).await?
        };
        self.publish_states().await;
        Ok(fill)
    }

    /// Run one execution against an already-locked ledger, then revalue it and emit the
    /// trade event and persistence commands. Callers publish `modelStates` after unlocking.
    async fn execute(
        &self,
        ledger: &mut AgentLedger,
        side: OrderSide,
        symbol: &str,
        notional: f64,
    ) -> Result<Fill> {
        let symbol = normalize_symbol(symbol);
        let result = match self.feed.price(&symbol).await {
            Some(price) => match side {
                OrderSide::Buy => execution::buy(ledger, &symbol, notional, price, self.config.fee_rate),
                OrderSide::Sell => execution::sell(ledger, &symbol, notional, price, self.config.fee_rate),
            },
            None => Err(Error::PriceUnavailable(symbol.clone())),
        };
        let fill = match result {
            Ok(fill) => fill,
            Err(e) => {
                warn!("[{}] {:?} {} rejected: {}", ledger.agent_id(), side, symbol, e);
                return Err(e);
            }
        };

        let prices = self.feed.snapshot().await;
        ledger.valuate(&prices);

        if let Some(trade) = &fill.trade {
            let command = match fill.side {
                OrderSide::Buy => PersistCommand::InsertTrade(trade.clone()),
                OrderSide::Sell => PersistCommand::UpdateTrade(trade.clone()),
            };
            self.persister.submit(command);
            self.publisher.record_trade(trade.clone()).await;
        }
        for orphan in ledger.orphaned_open_trades() {
            warn!(
                "[{}] open trade {} on {} has no backing position",
                ledger.agent_id(),
                orphan.id,
                orphan.symbol
            );
        }

        self.publisher.publish(EngineEvent::Trade(TradeEvent {
            agent_id: ledger.agent_id().to_string(),
            side: fill.side,
            symbol: fill.symbol.clone(),
            quantity: fill.quantity,
            price: fill.price,
        }));
        Ok(fill)
    }

    /// Revalue every ledger against the feed and broadcast the tick plus fresh states.
    pub async fn on_price(&self, quote: PriceQuote) {
        let prices = self.feed.snapshot().await;
        for ledger in self.ledgers.values() {
            ledger.write().await.valuate(&prices);
        }
        trace!("Valuation pass for {} @ {}", quote.symbol, quote.price);
        self.publisher.publish(EngineEvent::Price(quote));
        self.publish_states().await;
    }

    /// Consume feed ticks until the feed is dropped.
    pub async fn run_valuation(self: Arc<Self>) {
        let mut ticks = self.feed.subscribe();
        loop {
            match ticks.recv().await {
                Ok(quote) => self.on_price(quote).await,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Valuation skipped {} stale ticks", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Ask the policy for one decision per agent and execute the actionable ones.
    /// Returns the decisions made this cycle (skipped agents are absent).
    pub async fn run_decision_cycle(&self, policy: &mut dyn DecisionPolicy) -> Vec<Decision> {
        let mut decisions = Vec::new();
        for (agent_id, ledger) in &self.ledgers {
            let decision = {
                let mut guard = ledger.write().await;
                let prices = self.feed.snapshot().await;
                guard.valuate(&prices);

                let mut decision = match policy.decide(agent_id, &guard, &prices) {
                    Ok(Some(decision)) => decision,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("[{}] decision skipped: {}", agent_id, e);
                        continue;
                    }
                };
                let side = match decision.decision {
                    DecisionKind::Buy => Some(OrderSide::Buy),
                    DecisionKind::Sell => Some(OrderSide::Sell),
                    DecisionKind::Hold => None,
                };
                if let (Some(side), Some(amount)) = (side, decision.amount) {
                    decision.executed = self
                        .execute(&mut guard, side, &decision.symbol, amount)
                        .await
                        .is_ok();
                }
                decision
            };

            info!(
                "[{}] {} {} (confidence {}, executed {})",
                agent_id,
                decision.decision.as_str(),
                decision.symbol,
                decision.confidence,
                decision.executed
            );
            self.persister
                .submit(PersistCommand::InsertDecision(decision.clone()));
            self.publisher.record_decision(decision.clone()).await;
            self.publisher.publish(EngineEvent::Decision(decision.clone()));
            if decision.executed {
                self.publish_states().await;
            }
            decisions.push(decision);
        }
        decisions
    }

    /// First cycle after `warmup`, then every `period`.
    pub async fn run_decisions(
        self: Arc<Self>,
        mut policy: Box<dyn DecisionPolicy>,
        warmup: Duration,
        period: Duration,
    ) {
        sleep(warmup).await;
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            let made = self.run_decision_cycle(policy.as_mut()).await;
            debug!("Decision cycle produced {} decisions", made.len());
        }
    }

    /// Queue one performance snapshot per agent for storage.
    pub async fn take_snapshots(&self) -> Vec<PerformanceSnapshot> {
        let mut snapshots = Vec::with_capacity(self.ledgers.len());
        for ledger in self.ledgers.values() {
            let snapshot = ledger.read().await.performance_snapshot();
            self.persister
                .submit(PersistCommand::InsertSnapshot(snapshot.clone()));
            snapshots.push(snapshot);
        }
        snapshots
    }

    pub async fn run_snapshots(self: Arc<Self>, period: Duration) {
        let mut ticker = interval(period);
        // interval fires immediately; the first snapshot is due one period after start
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let taken = self.take_snapshots().await;
            debug!("Queued {} performance snapshots", taken.len());
        }
    }

    pub async fn states(&self) -> Vec<LedgerView> {
        let mut views = Vec::with_capacity(self.ledgers.len());
        for ledger in self.ledgers.values() {
            views.push(ledger.read().await.view());
        }
        views
    }

    async fn publish_states(&self) {
        let states = self.states().await;
        self.publisher.publish(EngineEvent::ModelStates(states));
    }

    /// In-memory open trades, oldest first, optionally for one agent.
    pub async fn open_trades(&self, agent_id: Option<&str>) -> Vec<Trade> {
        let mut trades = Vec::new();
        for (id, ledger) in &self.ledgers {
            if agent_id.is_some_and(|a| a != id.as_str()) {
                continue;
            }
            trades.extend(ledger.read().await.open_trades().iter().cloned());
        }
        trades
    }

    pub async fn init_payload(&self) -> InitPayload {
        let (recent_trades, recent_decisions) = {
            let journal = self.publisher.journal().read().await;
            (
                journal.recent_trades(usize::MAX),
                journal.recent_decisions(usize::MAX),
            )
        };
        InitPayload {
            prices: self.feed.all().await,
            model_states: self.states().await,
            recent_trades,
            recent_decisions,
        }
    }
}
