//! Formatting of host state into display pushes.
//!
//! Legacy displays only understand a bare list of lines that replaces the screen, so
//! one-off spot and batch fetches are pushed to typed displays only.

use clap::ValueEnum;
use ticker_common::{PushUpdate, Quote, Symbol};

/// Which push form the connected displays understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PushFormat {
    /// Bare list of display lines.
    Legacy,
    /// `{kind, payload}` envelopes.
    Typed,
}

/// Builds the push for each kind of state change in the configured form.
pub struct PushFormatter {
    format: PushFormat,
    currency: String,
}

impl PushFormatter {
    pub fn new(format: PushFormat, currency: &str) -> Self {
        PushFormatter {
            format,
            currency: currency.to_string(),
        }
    }

    /// Push for a finished refresh cycle. An empty slice is still a valid update.
    pub fn quotes(&self, quotes: &[Quote], last_update: i64) -> PushUpdate {
        match self.format {
            PushFormat::Legacy => {
                PushUpdate::Legacy(quotes.iter().map(|q| self.display_line(q)).collect())
            }
            PushFormat::Typed => PushUpdate::quotes(quotes, last_update),
        }
    }

    /// Push for a watchlist mutation.
    pub fn watchlist(&self, symbols: &[Symbol]) -> PushUpdate {
        match self.format {
            PushFormat::Legacy => PushUpdate::Legacy(
                symbols.iter().map(|s| s.display_name().to_string()).collect(),
            ),
            PushFormat::Typed => PushUpdate::watchlist(symbols),
        }
    }

    /// Push for a one-off single symbol fetch; `None` for legacy displays.
    pub fn spot(&self, symbol: &Symbol, quote: Option<&Quote>) -> Option<PushUpdate> {
        match self.format {
            PushFormat::Legacy => None,
            PushFormat::Typed => Some(PushUpdate::spot(symbol, quote)),
        }
    }

    /// Push for a one-off multi symbol fetch; `None` for legacy displays.
    pub fn batch(&self, quotes: &[Quote], last_update: i64) -> Option<PushUpdate> {
        match self.format {
            PushFormat::Legacy => None,
            PushFormat::Typed => Some(PushUpdate::batch(quotes, last_update)),
        }
    }

    /// `RELIANCE: ₹2500.00 (+1.23%)`
    pub fn display_line(&self, quote: &Quote) -> String {
        format!(
            "{}: {}{:.2} ({:+.2}%)",
            quote.symbol.display_name(),
            self.currency,
            quote.last_price,
            quote.change_percent
        )
    }
}
