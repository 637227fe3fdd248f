//! Binance combined-stream ticker client. Reconnects forever with a fixed delay;
//! the feed keeps serving the last known quotes while disconnected.

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::time::{Duration, sleep};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::Result;
use crate::feed::PriceFeed;
use crate::types::quote::PriceQuote;

#[derive(Debug, Deserialize)]
struct CombinedFrame {
    data: Option<TickerData>,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "c")]
    last_price: String,
    #[serde(rename = "P")]
    change_percent: String,
    #[serde(rename = "v")]
    volume: String,
    #[serde(rename = "E")]
    event_time_ms: Option<i64>,
}

/// `wss://.../stream?streams=btcusdt@ticker/ethusdt@ticker`
pub fn stream_url(base: &str, symbols: &[String], quote_asset: &str) -> String {
    let quote = quote_asset.to_lowercase();
    let streams: Vec<String> = symbols
        .iter()
        .map(|s| format!("{}{}@ticker", s.to_lowercase(), quote))
        .collect();
    format!("{}?streams={}", base, streams.join("/"))
}

/// Parse one combined-stream frame into a quote. Symbol is left raw; the feed normalizes it.
pub fn parse_ticker(text: &str) -> Option<PriceQuote> {
    let frame: CombinedFrame = serde_json::from_str(text).ok()?;
    let data = frame.data?;
    let price: f64 = data.last_price.parse().ok()?;
    let observed_at = data
        .event_time_ms
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now);
    Some(PriceQuote {
        symbol: data.symbol,
        price,
        change_24h: data.change_percent.parse().unwrap_or(0.0),
        volume_24h: data.volume.parse().unwrap_or(0.0),
        observed_at,
    })
}

/// Connect, pump ticks into `feed`, and reconnect after `reconnect_delay` whenever the
/// connection drops. Never returns.
pub async fn run(feed: PriceFeed, url: String, reconnect_delay: Duration) {
    loop {
        match stream_once(&feed, &url).await {
            Ok(()) => warn!(
                "Price stream closed, reconnecting in {}s",
                reconnect_delay.as_secs()
            ),
            Err(e) => warn!("{}; reconnecting in {}s", e, reconnect_delay.as_secs()),
        }
        sleep(reconnect_delay).await;
    }
}

async fn stream_once(feed: &PriceFeed, url: &str) -> Result<()> {
    info!("Connecting to price stream {}", url);
    let (mut ws, _) = connect_async(url).await?;
    info!("Connected to price stream");

    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => match parse_ticker(text.as_str()) {
                Some(quote) => {
                    feed.publish(quote).await;
                }
                None => debug!("Skipping unrecognised frame: {}", text.as_str()),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_combined_stream_url() {
        let url = stream_url(
            "wss://stream.binance.com:9443/stream",
            &["BTC".to_string(), "ETH".to_string()],
            "USDT",
        );
        assert_eq!(
            url,
            "wss://stream.binance.com:9443/stream?streams=btcusdt@ticker/ethusdt@ticker"
        );
    }

    #[test]
    fn parses_ticker_frame() {
        let text = r#"{"stream":"btcusdt@ticker","data":{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","c":"50123.45","P":"-1.25","v":"12345.6"}}"#;
        let quote = parse_ticker(text).unwrap();
        assert_eq!(quote.symbol, "BTCUSDT");
        assert_eq!(quote.price, 50123.45);
        assert_eq!(quote.change_24h, -1.25);
        assert_eq!(quote.volume_24h, 12345.6);
        assert_eq!(quote.observed_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn rejects_frames_without_ticker_data() {
        assert!(parse_ticker(r#"{"result":null,"id":1}"#).is_none());
        assert!(parse_ticker("not json").is_none());
        assert!(parse_ticker(r#"{"data":{"s":"BTCUSDT","c":"abc","P":"0","v":"0"}}"#).is_none());
    }
}
