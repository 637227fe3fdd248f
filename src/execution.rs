//! Trade execution: the only path that mutates a ledger's cash and positions.
//! Both operations are all-or-nothing; a rejected request leaves the ledger untouched.

use log::{info, warn};

use crate::error::{Error, Result};
use crate::ledger::{AgentLedger, QUANTITY_EPSILON};
use crate::types::order::{OrderSide, Price, Qty};
use crate::types::position::Position;
use crate::types::trade::Trade;

/// Outcome of one executed buy or sell.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub side: OrderSide,
    pub symbol: String,
    pub quantity: Qty,
    pub price: Price,
    pub fee: f64,
    /// Sells only: (price − average entry) × quantity − fee.
    pub realized_pnl: Option<f64>,
    /// The trade opened (buy) or closed (sell). `None` on a sell that found no open record.
    pub trade: Option<Trade>,
}

fn check_inputs(notional: f64, symbol: &str, price: Price) -> Result<()> {
    if !notional.is_finite() || notional <= 0.0 {
        return Err(Error::InvalidNotional(notional));
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::PriceUnavailable(symbol.to_string()));
    }
    Ok(())
}

/// Buy `notional` USD of `symbol` at `price`, paying `notional × fee_rate` on top.
/// Rejected outright with `InsufficientFunds` when notional + fee exceeds cash.
pub fn buy(
    ledger: &mut AgentLedger,
    symbol: &str,
    notional: f64,
    price: Price,
    fee_rate: f64,
) -> Result<Fill> {
    check_inputs(notional, symbol, price)?;

    let fee = notional * fee_rate;
    let required = notional + fee;
    if required > ledger.cash_balance {
        return Err(Error::InsufficientFunds {
            agent_id: ledger.agent_id.clone(),
            required,
            available: ledger.cash_balance,
        });
    }

    let quantity = notional / price;
    ledger.cash_balance -= required;

    match ledger.positions.get_mut(symbol) {
        Some(position) => position.add(quantity, price),
        None => {
            ledger
                .positions
                .insert(symbol.to_string(), Position::open(symbol, quantity, price));
        }
    }

    let trade = Trade::open_long(&ledger.agent_id, symbol, price, quantity, notional, fee);
    ledger.open_trades.push(trade.clone());
    ledger.trades_count += 1;

    info!(
        "[{}] BUY {:.4} {} @ ${:.2} (fee ${:.2})",
        ledger.agent_id, quantity, symbol, price, fee
    );

    Ok(Fill {
        side: OrderSide::Buy,
        symbol: symbol.to_string(),
        quantity,
        price,
        fee,
        realized_pnl: None,
        trade: Some(trade),
    })
}

/// Sell up to `notional` USD of `symbol` at `price`, capped at the held quantity.
/// Closes the oldest open trade for the symbol (one record per sell).
pub fn sell(
    ledger: &mut AgentLedger,
    symbol: &str,
    notional: f64,
    price: Price,
    fee_rate: f64,
) -> Result<Fill> {
    check_inputs(notional, symbol, price)?;

    let Some(position) = ledger.positions.get_mut(symbol) else {
        return Err(Error::NoPosition {
            agent_id: ledger.agent_id.clone(),
            symbol: symbol.to_string(),
        });
    };

    let quantity = (notional / price).min(position.quantity);
    let proceeds = quantity * price;
    let fee = proceeds * fee_rate;
    let realized_pnl = (price - position.average_entry_price) * quantity - fee;

    position.quantity -= quantity;
    if position.quantity < QUANTITY_EPSILON {
        ledger.positions.remove(symbol);
    } else {
        position.mark(price);
    }
    ledger.cash_balance += proceeds - fee;

    let trade = ledger.close_oldest_open(symbol, price, proceeds, fee, realized_pnl);
    if trade.is_none() {
        warn!(
            "[{}] sold {:.4} {} with no open trade on record; ledger and trade records disagree",
            ledger.agent_id, quantity, symbol
        );
    }

    info!(
        "[{}] SELL {:.4} {} @ ${:.2} | PnL {:+.2}",
        ledger.agent_id, quantity, symbol, price, realized_pnl
    );

    Ok(Fill {
        side: OrderSide::Sell,
        symbol: symbol.to_string(),
        quantity,
        price,
        fee,
        realized_pnl: Some(realized_pnl),
        trade,
    })
}
