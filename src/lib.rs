//! Append-only, hash-linked ledger of opaque payloads with optional
//! proof-of-work, served over a small actix-web API.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;

pub use blockchain::{Block, Ledger, LedgerConfig, LedgerError};
pub use config::Config;
