use std::sync::Arc;

use log::{error, info, warn};
use paper_arena::api::routes::{AppState, app_router};
use paper_arena::config::Config;
use paper_arena::engine::Engine;
use paper_arena::error::Result;
use paper_arena::feed::{PriceFeed, binance};
use paper_arena::persistence::{self, PgPool, Persister};
use paper_arena::policy::{PolicyParams, RuleBasedPolicy};
use paper_arena::publisher::Publisher;

async fn connect_db(config: &Config) -> Option<PgPool> {
    let url = config.database_url.as_deref()?;
    match persistence::create_pool_and_migrate(url).await {
        Ok(pool) => Some(pool),
        Err(e) => {
            error!("Database unavailable, running without persistence: {}", e);
            None
        }
    }
}

async fn hydrate_journal(pool: &PgPool, publisher: &Publisher, limit: usize) {
    let trades = persistence::list_recent_trades(pool, limit).await;
    let decisions = persistence::list_recent_decisions(pool, limit).await;
    match (trades, decisions) {
        (Ok(trades), Ok(decisions)) => {
            info!(
                "Hydrated journal with {} trades and {} decisions",
                trades.len(),
                decisions.len()
            );
            publisher.journal().write().await.hydrate(trades, decisions);
        }
        (Err(e), _) | (_, Err(e)) => warn!("Journal hydration skipped: {}", e),
    }
}

/// Ledgers start flat, so OPEN rows left by an earlier run have no live position.
async fn report_stale_open_trades(pool: &PgPool) {
    match persistence::list_open_trades(pool, None).await {
        Ok(stale) if !stale.is_empty() => warn!(
            "{} OPEN trades in storage predate this run (oldest {}); they are not backed by live ledgers",
            stale.len(),
            stale[0].entry_time
        ),
        Ok(_) => {}
        Err(e) => warn!("Stale trade check skipped: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::from_env()?;

    let db = connect_db(&config).await;
    let (persister, persist_rx) = Persister::channel();
    persistence::spawn_writer(db.clone(), persist_rx);

    let feed = PriceFeed::new(config.event_buffer);
    let publisher = Publisher::new(config.event_buffer, config.journal_capacity);
    if let Some(pool) = &db {
        hydrate_journal(pool, &publisher, config.journal_capacity).await;
        report_stale_open_trades(pool).await;
    }

    let engine = Arc::new(Engine::new(
        config.ledger,
        &config.agents,
        feed.clone(),
        publisher,
        persister,
    ));

    let url = binance::stream_url(&config.price_stream_url, &config.symbols, &config.quote_asset);
    tokio::spawn(binance::run(feed, url, config.reconnect_delay));
    tokio::spawn(engine.clone().run_valuation());

    let policy = RuleBasedPolicy::new(config.symbols.clone(), PolicyParams::default(), config.policy_seed);
    tokio::spawn(engine.clone().run_decisions(
        Box::new(policy),
        config.decision_warmup,
        config.decision_interval,
    ));
    tokio::spawn(engine.clone().run_snapshots(config.snapshot_interval));

    let app = app_router(AppState { engine, db });
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
