use crate::blockchain::{Block, Ledger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared application state: the one ledger every handler works on.
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Deserialize)]
pub struct WriteRequest {
    #[serde(alias = "PII")]
    pub payload: String,
}

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub difficulty: u32,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: usize,
    pub difficulty: u32,
    pub attempt_delay_ms: u128,
    pub tail_index: u64,
    pub tail_hash: String,
    pub tail_timestamp: String,
}
