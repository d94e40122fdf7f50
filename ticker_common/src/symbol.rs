//! Instrument symbols.
//!
//! A `Symbol` is always stored in normalized form: trimmed, uppercased and carrying the
//! provider's exchange suffix exactly once (`tcs` becomes `TCS.NS`). Normalization is
//! idempotent, so symbols read back from the store can be normalized again safely.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TickerError;

/// Exchange suffix used by the default provider (NSE listings on Yahoo).
pub const DEFAULT_SUFFIX: &str = ".NS";

/// Normalized instrument identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Normalizes `raw` with the given exchange `suffix`.
    ///
    /// Fails with `InvalidCommandParams` when nothing but whitespace (or only the suffix)
    /// is left.
    pub fn normalize(raw: &str, suffix: &str) -> Result<Self, TickerError> {
        let clean = raw.trim().to_uppercase();
        let suffix = suffix.trim().to_uppercase();
        let base = if suffix.is_empty() {
            clean.as_str()
        } else {
            clean.strip_suffix(suffix.as_str()).unwrap_or(&clean)
        };
        if base.is_empty() {
            return Err(TickerError::InvalidCommandParams(format!(
                "symbol must not be empty: {:?}",
                raw
            )));
        }
        if base.chars().any(char::is_whitespace) {
            return Err(TickerError::InvalidCommandParams(format!(
                "symbol must not contain whitespace: {:?}",
                raw
            )));
        }
        Ok(Symbol(format!("{}{}", base, suffix)))
    }

    /// Full provider form, e.g. `TCS.NS`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbol without its exchange suffix, e.g. `TCS`.
    pub fn display_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(pos) if pos > 0 => &self.0[..pos],
            _ => &self.0,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
