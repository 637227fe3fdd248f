//! Error taxonomy for the arena. Every public operation returns one of these
//! instead of panicking; none of them is fatal to the process.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient funds for {agent_id}: required={required:.2}, available={available:.2}")]
    InsufficientFunds {
        agent_id: String,
        required: f64,
        available: f64,
    },

    #[error("No position in {symbol} for {agent_id}")]
    NoPosition { agent_id: String, symbol: String },

    #[error("Price unavailable for {0}")]
    PriceUnavailable(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Invalid notional: {0}")]
    InvalidNotional(f64),

    #[error("Price stream connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid config value for {key}: {value}")]
    Config { key: String, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
