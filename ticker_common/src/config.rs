//! User configuration persisted by the host.
use serde::{Deserialize, Serialize};

use crate::error::TickerError;
use crate::symbol::Symbol;

/// Shortest refresh interval accepted through `SET_CONFIG`.
pub const MIN_REFRESH_INTERVAL_MS: u64 = 1_000;

/// Persisted configuration read by the refresh scheduler.
///
/// Unset fields fall back to per-mode defaults chosen by the host at startup, so a store
/// written in one refresh mode does not pin the cadence of the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Symbol tracked in single-symbol mode.
    #[serde(default)]
    pub active_symbol: Option<Symbol>,
    /// Timer cadence applied the next time the scheduler starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval_ms: Option<u64>,
}

/// Checks a refresh interval against `MIN_REFRESH_INTERVAL_MS`.
pub fn validate_interval(interval_ms: u64) -> Result<u64, TickerError> {
    if interval_ms < MIN_REFRESH_INTERVAL_MS {
        return Err(TickerError::InvalidCommandParams(format!(
            "refreshIntervalMs must be at least {} (got {})",
            MIN_REFRESH_INTERVAL_MS, interval_ms
        )));
    }
    Ok(interval_ms)
}

/// Partial update carried by a `SET_CONFIG` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    /// New active symbol in raw (not yet normalized) form.
    #[serde(default, alias = "symbol")]
    pub active_symbol: Option<String>,
    /// New refresh interval.
    #[serde(default)]
    pub refresh_interval_ms: Option<u64>,
}

impl ConfigPatch {
    /// Validates the patch and applies it on top of `current`.
    ///
    /// Empty or malformed symbols and intervals below `MIN_REFRESH_INTERVAL_MS` are
    /// rejected; an empty patch is rejected as well.
    pub fn apply(&self, current: &Configuration, suffix: &str) -> Result<Configuration, TickerError> {
        if self.active_symbol.is_none() && self.refresh_interval_ms.is_none() {
            return Err(TickerError::InvalidCommandParams(
                "SET_CONFIG needs activeSymbol or refreshIntervalMs".to_string(),
            ));
        }
        let mut next = current.clone();
        if let Some(raw) = &self.active_symbol {
            next.active_symbol = Some(Symbol::normalize(raw, suffix)?);
        }
        if let Some(interval) = self.refresh_interval_ms {
            next.refresh_interval_ms = Some(validate_interval(interval)?);
        }
        Ok(next)
    }
}
