use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::order::Price;

/// Latest market observation for one canonical symbol. Replaced wholesale on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub symbol: String,
    pub price: Price,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
    #[serde(rename = "volume24h")]
    pub volume_24h: f64,
    pub observed_at: DateTime<Utc>,
}
