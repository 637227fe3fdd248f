//! HTTP and WebSocket integration tests against an app spawned on an ephemeral port.

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use paper_arena::api::routes::{AppState, app_router};
use paper_arena::config::{AgentSpec, LedgerConfig};
use paper_arena::engine::Engine;
use paper_arena::feed::PriceFeed;
use paper_arena::persistence::{PgPool, Persister};
use paper_arena::publisher::{EngineEvent, Publisher};
use paper_arena::types::quote::PriceQuote;
use paper_arena::types::trade::Trade;
use tokio_tungstenite::tungstenite::Message;

fn test_engine() -> Arc<Engine> {
    let feed = PriceFeed::new(64);
    let publisher = Publisher::new(256, 20);
    let (persister, _rx) = Persister::channel();
    let agents = vec![
        AgentSpec::new("gpt4o", "GPT-4o"),
        AgentSpec::new("o1-mini", "o1-mini"),
    ];
    Arc::new(Engine::new(LedgerConfig::default(), &agents, feed, publisher, persister))
}

/// Spawn app on a random port and return (address, guard that keeps server running).
async fn spawn_app(engine: Arc<Engine>) -> (String, tokio::task::JoinHandle<()>) {
    spawn_app_with_db(engine, None).await
}

async fn spawn_app_with_db(
    engine: Arc<Engine>,
    db: Option<PgPool>,
) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let app = app_router(AppState { engine, db });
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn quote(symbol: &str, price: f64) -> PriceQuote {
    PriceQuote {
        symbol: symbol.to_string(),
        price,
        change_24h: 2.0,
        volume_24h: 10.0,
        observed_at: Utc::now(),
    }
}

async fn next_event<S>(stream: &mut S) -> EngineEvent
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match stream.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn health_returns_healthy() {
    let (addr, _handle) = spawn_app(test_engine()).await;

    let body = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(body, "healthy");
}

#[tokio::test]
async fn models_and_trades_served_from_memory() {
    let engine = test_engine();
    engine.feed().publish(quote("BTCUSDT", 50_000.0)).await;
    engine.buy("gpt4o", "BTC", 500.0).await.unwrap();
    let (addr, _handle) = spawn_app(engine).await;
    let client = reqwest::Client::new();

    let models: serde_json::Value = client
        .get(format!("http://{}/api/models", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let models = models.as_array().unwrap();
    assert_eq!(models.len(), 2);
    let gpt = models.iter().find(|m| m["agentId"] == "gpt4o").unwrap();
    assert_eq!(gpt["tradesCount"], 1);
    assert_eq!(gpt["cashBalance"], 9_499.5);

    let trades: serde_json::Value = client
        .get(format!("http://{}/api/trades?limit=5", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(trades.as_array().unwrap().len(), 1);
    assert_eq!(trades[0]["status"], "OPEN");

    let open: serde_json::Value = client
        .get(format!("http://{}/api/trades/open?agent=o1-mini", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(open.as_array().unwrap().is_empty());

    let prices: serde_json::Value = client
        .get(format!("http://{}/api/prices", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(prices[0]["symbol"], "BTC");
}

#[tokio::test]
async fn open_trades_come_from_ledgers_even_with_storage() {
    let engine = test_engine();
    engine.feed().publish(quote("BTCUSDT", 50_000.0)).await;
    engine.feed().publish(quote("ETHUSDT", 2_000.0)).await;
    let first = engine.buy("gpt4o", "BTC", 500.0).await.unwrap().trade.unwrap();
    let second = engine.buy("gpt4o", "ETH", 500.0).await.unwrap().trade.unwrap();
    // never connects; any read through it would fail
    let db = PgPool::connect_lazy("postgres://arena@127.0.0.1:1/arena").unwrap();
    let (addr, _handle) = spawn_app_with_db(engine, Some(db)).await;

    let open: Vec<Trade> = reqwest::get(format!("http://{}/api/trades/open?agent=gpt4o", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let ids: Vec<_> = open.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn history_for_unknown_agent_is_404() {
    let (addr, _handle) = spawn_app(test_engine()).await;

    let res = reqwest::get(format!("http://{}/api/models/nobody/history", addr))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    let res = reqwest::get(format!("http://{}/api/models/gpt4o/history", addr))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn websocket_sends_init_then_incremental_events() {
    let engine = test_engine();
    engine.feed().publish(quote("ETHUSDT", 2_000.0)).await;
    let (addr, _handle) = spawn_app(engine.clone()).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();

    match next_event(&mut ws).await {
        EngineEvent::Init(init) => {
            assert_eq!(init.prices.len(), 1);
            assert_eq!(init.model_states.len(), 2);
            assert!(init.recent_trades.is_empty());
        }
        other => panic!("expected init, got {other:?}"),
    }

    engine.buy("o1-mini", "ETH", 1_000.0).await.unwrap();

    match next_event(&mut ws).await {
        EngineEvent::Trade(trade) => {
            assert_eq!(trade.agent_id, "o1-mini");
            assert_eq!(trade.symbol, "ETH");
            assert_eq!(trade.price, 2_000.0);
        }
        other => panic!("expected trade, got {other:?}"),
    }
    match next_event(&mut ws).await {
        EngineEvent::ModelStates(states) => assert_eq!(states.len(), 2),
        other => panic!("expected modelStates, got {other:?}"),
    }
}
