//! Decision log persistence.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::types::decision::{Decision, DecisionKind, PortfolioComfort};

#[derive(Debug, FromRow)]
pub struct DecisionRow {
    pub agent_id: String,
    pub decision: String,
    pub symbol: String,
    pub confidence: i16,
    pub reasoning: String,
    pub portfolio_comfort: String,
    pub amount: Option<f64>,
    pub executed: bool,
    pub created_at: DateTime<Utc>,
}

impl DecisionRow {
    pub fn into_decision(self) -> Option<Decision> {
        Some(Decision {
            decision: DecisionKind::parse(&self.decision)?,
            portfolio_comfort: PortfolioComfort::parse(&self.portfolio_comfort)?,
            confidence: u8::try_from(self.confidence).ok()?,
            agent_id: self.agent_id,
            symbol: self.symbol,
            reasoning: self.reasoning,
            amount: self.amount,
            executed: self.executed,
            timestamp: self.created_at,
        })
    }
}

pub async fn insert_decision(pool: &PgPool, decision: &Decision) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO decisions (agent_id, decision, symbol, confidence, reasoning, portfolio_comfort, \
         amount, executed, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(&decision.agent_id)
    .bind(decision.decision.as_str())
    .bind(&decision.symbol)
    .bind(decision.confidence as i16)
    .bind(&decision.reasoning)
    .bind(decision.portfolio_comfort.as_str())
    .bind(decision.amount)
    .bind(decision.executed)
    .bind(decision.timestamp)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent first.
pub async fn list_recent_decisions(pool: &PgPool, limit: usize) -> Result<Vec<Decision>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DecisionRow>(
        "SELECT agent_id, decision, symbol, confidence, reasoning, portfolio_comfort, amount, executed, created_at \
         FROM decisions ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().filter_map(DecisionRow::into_decision).collect())
}
