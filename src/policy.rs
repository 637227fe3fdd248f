//! Decision policy: proposes BUY / SELL / HOLD for one agent per cycle.
//!
//! `RuleBasedPolicy` is a stochastic, rule-driven stand-in for a real model. All randomness
//! comes from one seedable `StdRng`, so a fixed seed replays the same decision sequence.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::feed::PriceSnapshot;
use crate::ledger::AgentLedger;
use crate::types::decision::{Decision, DecisionKind, PortfolioComfort};

/// Anything that can turn (agent, ledger, prices) into a decision.
/// `Ok(None)` means the agent sits this cycle out entirely.
pub trait DecisionPolicy: Send {
    fn decide(
        &mut self,
        agent_id: &str,
        ledger: &AgentLedger,
        prices: &PriceSnapshot,
    ) -> Result<Option<Decision>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyParams {
    /// Chance an agent skips a cycle.
    pub skip_probability: f64,
    /// A held symbol is sold only when a uniform draw exceeds this.
    pub sell_threshold: f64,
    /// Minimum cash / account value before a new position is opened.
    pub min_cash_ratio: f64,
    pub max_positions: usize,
    pub max_position_fraction: f64,
    pub min_trade_size: f64,
    /// Share of cash a single buy may use before `min_trade_size` applies.
    pub buy_cash_fraction: f64,
    pub min_confidence: u8,
    pub max_confidence: u8,
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self {
            skip_probability: 0.4,
            sell_threshold: 0.65,
            min_cash_ratio: 0.2,
            max_positions: 4,
            max_position_fraction: 0.25,
            min_trade_size: 500.0,
            buy_cash_fraction: 0.3,
            min_confidence: 55,
            max_confidence: 90,
        }
    }
}

const BUY_REASONS: [&str; 4] = [
    "{symbol} is building momentum on rising volume. Entering at ${price} with a tight invalidation level below.",
    "{symbol} cleared resistance near ${price}. Structure favours continuation, opening a position.",
    "Sentiment on {symbol} is improving while price holds ${price}. Risk/reward justifies an entry here.",
    "{symbol} bounced off support after a pullback. Accumulating at ${price} for a medium-term move.",
];

const SELL_REASONS: [&str; 4] = [
    "{symbol} looks stretched at ${price}. Taking profit on a {gain}% move and waiting for a better re-entry.",
    "Momentum in {symbol} is fading near ${price}. Reducing exposure to lock in {gain}%.",
    "{symbol} no longer offers a favourable risk/reward at ${price}. Closing out at {gain}%.",
    "Reversal signals on {symbol}. Exiting around ${price} with a {gain}% result.",
];

const HOLD_REASONS: [&str; 4] = [
    "{symbol} is ranging around ${price} without a clear direction. Standing aside for now.",
    "No clean setup on {symbol} at ${price}. Keeping capital available for better opportunities.",
    "{symbol} shows mixed signals near ${price}. Allocation unchanged this cycle.",
    "Volatility is elevated and {symbol} is respecting its levels around ${price}. Holding.",
];

fn templates(kind: DecisionKind) -> &'static [&'static str] {
    match kind {
        DecisionKind::Buy => &BUY_REASONS,
        DecisionKind::Sell => &SELL_REASONS,
        DecisionKind::Hold => &HOLD_REASONS,
    }
}

pub fn render_reasoning(template: &str, symbol: &str, price: f64, gain_percent: f64) -> String {
    template
        .replace("{symbol}", symbol)
        .replace("{price}", &format!("{:.2}", price))
        .replace("{gain}", &format!("{:.1}", gain_percent))
}

pub struct RuleBasedPolicy {
    params: PolicyParams,
    universe: Vec<String>,
    rng: StdRng,
}

impl RuleBasedPolicy {
    /// `seed = None` draws from OS entropy.
    pub fn new(universe: Vec<String>, params: PolicyParams, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            params,
            universe,
            rng,
        }
    }

    pub fn params(&self) -> &PolicyParams {
        &self.params
    }

    fn size_sell(&self, position_value: f64, account_value: f64) -> f64 {
        position_value.min(account_value * self.params.max_position_fraction)
    }

    fn size_buy(&self, account_value: f64, cash: f64) -> f64 {
        let capped = (account_value * self.params.max_position_fraction)
            .min(cash * self.params.buy_cash_fraction);
        self.params.min_trade_size.max(capped)
    }
}

impl DecisionPolicy for RuleBasedPolicy {
    fn decide(
        &mut self,
        agent_id: &str,
        ledger: &AgentLedger,
        prices: &PriceSnapshot,
    ) -> Result<Option<Decision>> {
        if self
            .rng
            .gen_bool(self.params.skip_probability.clamp(0.0, 1.0))
        {
            return Ok(None);
        }
        let Some(symbol) = self.universe.choose(&mut self.rng).cloned() else {
            return Ok(None);
        };
        let price = prices
            .get(&symbol)
            .copied()
            .filter(|p| *p > 0.0)
            .ok_or_else(|| Error::PriceUnavailable(symbol.clone()))?;

        let account_value = ledger.account_value();
        let cash = ledger.cash_balance();
        let cash_ratio = if account_value > 0.0 {
            cash / account_value
        } else {
            0.0
        };
        let position = ledger.position(&symbol);

        let (kind, amount) = match position {
            Some(pos) if self.rng.r#gen::<f64>() > self.params.sell_threshold => (
                DecisionKind::Sell,
                Some(self.size_sell(pos.current_value, account_value)),
            ),
            None if cash_ratio > self.params.min_cash_ratio
                && ledger.position_count() < self.params.max_positions =>
            {
                (DecisionKind::Buy, Some(self.size_buy(account_value, cash)))
            }
            _ => (DecisionKind::Hold, None),
        };

        let gain_percent = position.map(|p| p.gain_percent()).unwrap_or(0.0);
        let template = templates(kind)
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default();
        let reasoning = render_reasoning(template, &symbol, price, gain_percent);

        let (lo, hi) = (self.params.min_confidence, self.params.max_confidence);
        let confidence = if lo < hi {
            self.rng.gen_range(lo..hi)
        } else {
            lo
        };

        Ok(Some(Decision {
            agent_id: agent_id.to_string(),
            decision: kind,
            symbol,
            confidence,
            reasoning,
            portfolio_comfort: PortfolioComfort::from_return_percent(ledger.return_percent()),
            amount,
            executed: false,
            timestamp: Utc::now(),
        }))
    }
}
