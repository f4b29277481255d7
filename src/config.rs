use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::{DEFAULT_DIFFICULTY, DEFAULT_MINING_DELAY_MS, LedgerConfig};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub ledger: LedgerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ledger: LedgerConfig::default(),
        }
    }
}

impl Config {
    /// Read the process environment. Callers load `.env` first.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    ///
    /// - `HOST`, `PORT`
    /// - `LEDGER_DIFFICULTY`: leading zeros required, 0 disables proof-of-work
    /// - `LEDGER_MINING_DELAY_MS`: pause after each failed nonce
    /// - `LEDGER_MAX_APPEND_RETRIES`: unset retries stale appends forever
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);
        let difficulty = parse_or(&lookup, "LEDGER_DIFFICULTY", DEFAULT_DIFFICULTY);
        let delay_ms = parse_or(&lookup, "LEDGER_MINING_DELAY_MS", DEFAULT_MINING_DELAY_MS);
        let max_append_retries = parse_opt(&lookup, "LEDGER_MAX_APPEND_RETRIES");

        Self {
            host,
            port,
            ledger: LedgerConfig {
                difficulty,
                attempt_delay: Duration::from_millis(delay_ms),
                max_append_retries,
            },
        }
    }
}

fn parse_opt<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("CONFIG - ignoring invalid {key}={raw:?}");
            None
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    parse_opt(lookup, key).unwrap_or(default)
}
