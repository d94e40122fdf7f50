//! Quote data model.
//!
//! A `Quote` only ever comes out of a successful fetch. A symbol that could not be
//! resolved in a cycle is carried as `QuoteResult::Unavailable` instead of a half-filled
//! quote.
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

/// Market quote for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Normalized symbol.
    pub symbol: Symbol,
    /// Last traded price, 2 decimals.
    pub last_price: f64,
    /// Change against the previous close, 2 decimals.
    pub change_absolute: f64,
    /// Change against the previous close in percent, 2 decimals.
    pub change_percent: f64,
    /// UTC timestamp in milliseconds since Unix epoch.
    pub fetched_at: i64,
}

impl Quote {
    /// Builds a quote from raw provider floats, rounding at the boundary.
    ///
    /// `change_percent` falls back to a value derived from `previous_close`, and to zero
    /// when neither is usable.
    pub fn from_raw(
        symbol: Symbol,
        price: f64,
        previous_close: Option<f64>,
        change_percent: Option<f64>,
    ) -> Self {
        let previous_close = previous_close.filter(|close| close.is_finite() && *close > 0.0);
        let change_absolute = previous_close.map(|close| price - close).unwrap_or(0.0);
        let change_percent = change_percent
            .filter(|pct| pct.is_finite())
            .or_else(|| previous_close.map(|close| (price - close) / close * 100.0))
            .unwrap_or(0.0);

        Quote {
            symbol,
            last_price: round2(price),
            change_absolute: round2(change_absolute),
            change_percent: round2(change_percent),
            fetched_at: Utc::now().timestamp_millis(),
        }
    }
}

/// Outcome of fetching one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum QuoteResult {
    /// A usable quote.
    Available(Quote),
    /// No usable quote for this symbol this cycle.
    Unavailable {
        /// Symbol that could not be resolved.
        symbol: Symbol,
    },
}

impl QuoteResult {
    /// Symbol this result belongs to.
    pub fn symbol(&self) -> &Symbol {
        match self {
            QuoteResult::Available(quote) => &quote.symbol,
            QuoteResult::Unavailable { symbol } => symbol,
        }
    }

    /// Returns the quote, dropping the `Unavailable` marker.
    pub fn into_quote(self) -> Option<Quote> {
        match self {
            QuoteResult::Available(quote) => Some(quote),
            QuoteResult::Unavailable { .. } => None,
        }
    }
}

/// Rounds to 2 decimal places; negative zero collapses to `0.0`.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}
