//! Background writer: the engine queues commands without waiting, a single task drains
//! them into storage. Failed writes are logged and dropped, never retried.

use log::{debug, error};
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::ledger::PerformanceSnapshot;
use crate::persistence::{decisions, snapshots, trades};
use crate::types::decision::Decision;
use crate::types::trade::Trade;

#[derive(Debug, Clone, PartialEq)]
pub enum PersistCommand {
    InsertTrade(Trade),
    UpdateTrade(Trade),
    InsertSnapshot(PerformanceSnapshot),
    InsertDecision(Decision),
}

impl PersistCommand {
    fn label(&self) -> &'static str {
        match self {
            PersistCommand::InsertTrade(_) => "insert_trade",
            PersistCommand::UpdateTrade(_) => "update_trade",
            PersistCommand::InsertSnapshot(_) => "insert_snapshot",
            PersistCommand::InsertDecision(_) => "insert_decision",
        }
    }
}

/// Sending half of the persistence queue. Submitting never blocks.
#[derive(Clone)]
pub struct Persister {
    tx: mpsc::UnboundedSender<PersistCommand>,
}

impl Persister {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PersistCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn submit(&self, command: PersistCommand) {
        if let Err(e) = self.tx.send(command) {
            debug!("Persistence queue closed, dropping {}", e.0.label());
        }
    }
}

pub async fn apply(pool: &PgPool, command: &PersistCommand) -> Result<()> {
    match command {
        PersistCommand::InsertTrade(trade) => trades::insert_trade(pool, trade).await?,
        PersistCommand::UpdateTrade(trade) => trades::update_trade(pool, trade).await?,
        PersistCommand::InsertSnapshot(snapshot) => snapshots::insert_snapshot(pool, snapshot).await?,
        PersistCommand::InsertDecision(decision) => decisions::insert_decision(pool, decision).await?,
    }
    Ok(())
}

/// Drain the queue until every `Persister` is dropped. Without a pool, commands are discarded.
pub async fn run_writer(pool: Option<PgPool>, mut rx: mpsc::UnboundedReceiver<PersistCommand>) {
    while let Some(command) = rx.recv().await {
        match &pool {
            Some(pool) => {
                if let Err(e) = apply(pool, &command).await {
                    error!("{} failed: {}", command.label(), e);
                }
            }
            None => debug!("No database configured, dropping {}", command.label()),
        }
    }
}

pub fn spawn_writer(
    pool: Option<PgPool>,
    rx: mpsc::UnboundedReceiver<PersistCommand>,
) -> JoinHandle<()> {
    tokio::spawn(run_writer(pool, rx))
}
