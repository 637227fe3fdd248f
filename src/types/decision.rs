use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionKind {
    Buy,
    Sell,
    Hold,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Buy => "BUY",
            DecisionKind::Sell => "SELL",
            DecisionKind::Hold => "HOLD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(DecisionKind::Buy),
            "SELL" => Some(DecisionKind::Sell),
            "HOLD" => Some(DecisionKind::Hold),
            _ => None,
        }
    }
}

/// Coarse label derived from an agent's return percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioComfort {
    Comfortable,
    Neutral,
    Concerned,
}

impl PortfolioComfort {
    pub const THRESHOLD_PERCENT: f64 = 5.0;

    pub fn from_return_percent(return_percent: f64) -> Self {
        if return_percent > Self::THRESHOLD_PERCENT {
            PortfolioComfort::Comfortable
        } else if return_percent < -Self::THRESHOLD_PERCENT {
            PortfolioComfort::Concerned
        } else {
            PortfolioComfort::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PortfolioComfort::Comfortable => "comfortable",
            PortfolioComfort::Neutral => "neutral",
            PortfolioComfort::Concerned => "concerned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "comfortable" => Some(PortfolioComfort::Comfortable),
            "neutral" => Some(PortfolioComfort::Neutral),
            "concerned" => Some(PortfolioComfort::Concerned),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub agent_id: String,
    pub decision: DecisionKind,
    pub symbol: String,
    pub confidence: u8,
    pub reasoning: String,
    pub portfolio_comfort: PortfolioComfort,
    /// Sized notional for BUY/SELL; absent on HOLD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub executed: bool,
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    pub fn is_actionable(&self) -> bool {
        self.decision != DecisionKind::Hold && self.amount.is_some()
    }
}
