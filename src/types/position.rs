use serde::{Deserialize, Serialize};

use crate::types::order::{Price, Qty};

/// Holding of one symbol inside one agent's ledger. Always long; quantity > 0.
/// `current_value` and `unrealized_pnl` are derived on every valuation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub quantity: Qty,
    pub average_entry_price: Price,
    pub current_value: f64,
    #[serde(rename = "unrealizedPnL")]
    pub unrealized_pnl: f64,
}

impl Position {
    pub fn open(symbol: &str, quantity: Qty, price: Price) -> Self {
        Self {
            symbol: symbol.to_string(),
            quantity,
            average_entry_price: price,
            current_value: quantity * price,
            unrealized_pnl: 0.0,
        }
    }

    /// Capital committed at entry: quantity × average entry price.
    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.average_entry_price
    }

    /// Merge an additional fill using the quantity-weighted average entry price.
    pub fn add(&mut self, quantity: Qty, price: Price) {
        let total_qty = self.quantity + quantity;
        self.average_entry_price = (self.cost_basis() + price * quantity) / total_qty;
        self.quantity = total_qty;
    }

    pub fn mark(&mut self, price: Price) {
        self.current_value = self.quantity * price;
        self.unrealized_pnl = self.current_value - self.cost_basis();
    }

    /// Unrealized gain relative to cost basis, in percent.
    pub fn gain_percent(&self) -> f64 {
        let basis = self.cost_basis();
        if basis > 0.0 {
            self.unrealized_pnl / basis * 100.0
        } else {
            0.0
        }
    }
}
