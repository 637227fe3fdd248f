//! Runtime configuration read from the environment (and `.env` via dotenvy).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::feed::normalize_symbol;

/// One simulated participant: stable id plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub id: String,
    pub name: String,
}

impl AgentSpec {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

pub fn default_roster() -> Vec<AgentSpec> {
    vec![
        AgentSpec::new("gpt4o", "GPT-4o"),
        AgentSpec::new("claude-sonnet", "Claude 3.5 Sonnet"),
        AgentSpec::new("gemini-pro", "Gemini Pro 1.5"),
        AgentSpec::new("o1-mini", "o1-mini"),
    ]
}

/// Accounting parameters shared by every ledger in one engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerConfig {
    pub starting_capital: f64,
    pub fee_rate: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_capital: 10_000.0,
            fee_rate: 0.001,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub price_stream_url: String,
    pub symbols: Vec<String>,
    pub quote_asset: String,
    pub ledger: LedgerConfig,
    pub decision_interval: Duration,
    pub decision_warmup: Duration,
    pub snapshot_interval: Duration,
    pub reconnect_delay: Duration,
    pub policy_seed: Option<u64>,
    pub event_buffer: usize,
    pub journal_capacity: usize,
    pub agents: Vec<AgentSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: None,
            price_stream_url: "wss://stream.binance.com:9443/stream".to_string(),
            symbols: ["BTC", "ETH", "SOL", "BNB", "DOGE", "XRP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            quote_asset: "USDT".to_string(),
            ledger: LedgerConfig::default(),
            decision_interval: Duration::from_secs(300),
            decision_warmup: Duration::from_secs(30),
            snapshot_interval: Duration::from_secs(300),
            reconnect_delay: Duration::from_secs(5),
            policy_seed: None,
            event_buffer: 1024,
            journal_capacity: 50,
            agents: default_roster(),
        }
    }
}

impl Config {
    /// Build from environment variables, falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let symbols = match env::var("SYMBOLS") {
            Ok(raw) => parse_symbols(&raw),
            Err(_) => defaults.symbols,
        };

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            price_stream_url: env::var("PRICE_STREAM_URL").unwrap_or(defaults.price_stream_url),
            symbols,
            quote_asset: env::var("QUOTE_ASSET")
                .map(|s| s.to_uppercase())
                .unwrap_or(defaults.quote_asset),
            ledger: LedgerConfig {
                starting_capital: parse_var("STARTING_CAPITAL", defaults.ledger.starting_capital)?,
                fee_rate: parse_var("FEE_RATE", defaults.ledger.fee_rate)?,
            },
            decision_interval: secs_var("DECISION_INTERVAL_SECS", defaults.decision_interval)?,
            decision_warmup: secs_var("DECISION_WARMUP_SECS", defaults.decision_warmup)?,
            snapshot_interval: secs_var("SNAPSHOT_INTERVAL_SECS", defaults.snapshot_interval)?,
            reconnect_delay: secs_var("RECONNECT_DELAY_SECS", defaults.reconnect_delay)?,
            policy_seed: match env::var("POLICY_SEED") {
                Ok(raw) => Some(parse_value("POLICY_SEED", &raw)?),
                Err(_) => None,
            },
            event_buffer: parse_var("EVENT_BUFFER", defaults.event_buffer)?,
            journal_capacity: parse_var("JOURNAL_CAPACITY", defaults.journal_capacity)?,
            agents: defaults.agents,
        })
    }
}

/// Comma-separated symbols in canonical form (`btcusdt` → `BTC`), duplicates dropped.
fn parse_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(normalize_symbol) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| Error::Config {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn secs_var(key: &str, default: Duration) -> Result<Duration> {
    parse_var(key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_rejects_garbage() {
        let err = parse_value::<f64>("FEE_RATE", "ten").unwrap_err();
        assert!(matches!(err, Error::Config { ref key, .. } if key == "FEE_RATE"));
    }

    #[test]
    fn symbols_are_canonicalised() {
        assert_eq!(parse_symbols("btcusdt, ETH,,sol"), vec!["BTC", "ETH", "SOL"]);
        assert_eq!(parse_symbols("BTC,btcusdt"), vec!["BTC"]);
        assert!(parse_symbols(" , ").is_empty());
    }

    #[test]
    fn canonical_symbols_build_valid_stream_names() {
        let symbols = parse_symbols("btcusdt,ethusdt");
        let url = crate::feed::binance::stream_url("wss://host/stream", &symbols, "USDT");
        assert_eq!(url, "wss://host/stream?streams=btcusdt@ticker/ethusdt@ticker");
    }

    #[test]
    fn defaults_match_simulation_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.ledger.starting_capital, 10_000.0);
        assert_eq!(cfg.ledger.fee_rate, 0.001);
        assert_eq!(cfg.reconnect_delay, Duration::from_secs(5));
        assert_eq!(cfg.agents.len(), 4);
    }
}
