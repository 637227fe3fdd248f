//! Database layer: pool, migrations, and durable mirrors of trades, snapshots and decisions.
//! Nothing here is required for the in-memory ledgers to be correct.

mod decisions;
mod pool;
mod snapshots;
mod trades;
mod writer;

pub use decisions::{DecisionRow, insert_decision, list_recent_decisions};
pub use pool::{create_pool_and_migrate, run_migrations};
pub use snapshots::{SnapshotRow, insert_snapshot, list_snapshots_since};
pub use sqlx::PgPool;
pub use trades::{TradeRow, insert_trade, list_open_trades, list_recent_trades, update_trade};
pub use writer::{PersistCommand, Persister, apply, run_writer, spawn_writer};
