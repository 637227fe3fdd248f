use serde::{Deserialize, Serialize};

pub type Price = f64;
pub type Qty = f64;
pub type AgentId = String;

/// Direction of an executed order, as reported on the `trade` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}
