//! Multi-agent paper-trading arena: live prices in, per-agent ledgers, rule-driven
//! decisions, and an event stream out.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod feed;
pub mod ledger;
pub mod persistence;
pub mod policy;
pub mod publisher;
pub mod types;
