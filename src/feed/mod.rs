//! Price feed: latest quote per canonical symbol, plus a broadcast of every accepted tick.

pub mod binance;

use std::collections::HashMap;
use std::sync::Arc;

use log::trace;
use tokio::sync::{RwLock, broadcast};

use crate::types::order::Price;
use crate::types::quote::PriceQuote;

/// Symbol → last price, taken atomically from the feed.
pub type PriceSnapshot = HashMap<String, Price>;

const QUOTE_SUFFIXES: [&str; 4] = ["USDT", "BUSD", "USDC", "USD"];

/// Canonical symbol: uppercase with any quote-currency suffix removed (`btcusdt` → `BTC`).
pub fn normalize_symbol(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if QUOTE_SUFFIXES.contains(&upper.as_str()) {
        return upper;
    }
    for suffix in QUOTE_SUFFIXES {
        if let Some(base) = upper.strip_suffix(suffix) {
            if !base.is_empty() {
                return base.to_string();
            }
        }
    }
    upper
}

/// Cheap-to-clone handle; all clones share the same quote table and broadcast channel.
#[derive(Clone)]
pub struct PriceFeed {
    quotes: Arc<RwLock<HashMap<String, PriceQuote>>>,
    ticks: broadcast::Sender<PriceQuote>,
}

impl PriceFeed {
    pub fn new(buffer: usize) -> Self {
        let (ticks, _) = broadcast::channel(buffer.max(1));
        Self {
            quotes: Arc::new(RwLock::new(HashMap::new())),
            ticks,
        }
    }

    /// Record a quote (last write wins) and broadcast it. Returns false if it was rejected.
    pub async fn publish(&self, mut quote: PriceQuote) -> bool {
        if !quote.price.is_finite() || quote.price <= 0.0 {
            trace!("dropping non-positive quote for {}", quote.symbol);
            return false;
        }
        quote.symbol = normalize_symbol(&quote.symbol);
        self.quotes
            .write()
            .await
            .insert(quote.symbol.clone(), quote.clone());
        // No subscribers is fine; the table above still serves `latest`.
        let _ = self.ticks.send(quote);
        true
    }

    pub async fn latest(&self, symbol: &str) -> Option<PriceQuote> {
        self.quotes.read().await.get(&normalize_symbol(symbol)).cloned()
    }

    pub async fn price(&self, symbol: &str) -> Option<Price> {
        self.latest(symbol).await.map(|q| q.price)
    }

    /// All known quotes, ordered by symbol.
    pub async fn all(&self) -> Vec<PriceQuote> {
        let guard = self.quotes.read().await;
        let mut quotes: Vec<PriceQuote> = guard.values().cloned().collect();
        quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        quotes
    }

    pub async fn snapshot(&self) -> PriceSnapshot {
        self.quotes
            .read()
            .await
            .iter()
            .map(|(symbol, quote)| (symbol.clone(), quote.price))
            .collect()
    }

    /// Ticks published after this call. A receiver that falls behind skips ahead (`Lagged`).
    pub fn subscribe(&self) -> broadcast::Receiver<PriceQuote> {
        self.ticks.subscribe()
    }
}
