//! Fetch client: turns symbols into per-symbol results without ever failing as a whole.
//!
//! `fetch_one` collapses every provider error into `QuoteResult::Unavailable`, so one bad
//! symbol never aborts a cycle. `fetch_many` keeps the output aligned 1:1 with its input,
//! whichever fan-out strategy is configured:
//!
//! - `FetchMode::Paced`: one request at a time with a fixed pause between requests, for
//!   providers with informal rate limits.
//! - `FetchMode::Parallel`: one scoped thread per symbol, joined back in input order.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, warn};
use ticker_common::{QuoteResult, Symbol};

use crate::model::provider::QuoteProvider;

/// Default pause between paced requests.
pub const DEFAULT_PACING: Duration = Duration::from_secs(5);

/// Fan-out strategy, fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Every symbol at once.
    Parallel,
    /// One symbol at a time, `delay` apart.
    Paced {
        /// Pause between two requests; none after the last.
        delay: Duration,
    },
}

/// Cheap to clone; each refresh cycle takes its own copy onto the worker thread.
#[derive(Clone)]
pub struct FetchClient {
    provider: Arc<dyn QuoteProvider>,
    mode: FetchMode,
}

impl FetchClient {
    pub fn new(provider: Arc<dyn QuoteProvider>, mode: FetchMode) -> Self {
        FetchClient { provider, mode }
    }

    /// Fan-out strategy this client was built with.
    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Fetches one symbol. Provider errors are logged and returned as `Unavailable`.
    pub fn fetch_one(&self, symbol: &Symbol) -> QuoteResult {
        match self.provider.fetch_quote(symbol) {
            Ok(quote) => {
                debug!("{}: {:.2} ({:+.2}%)", symbol, quote.last_price, quote.change_percent);
                QuoteResult::Available(quote)
            }
            Err(e) => {
                warn!("{} unavailable: {}", symbol, e);
                QuoteResult::Unavailable {
                    symbol: symbol.clone(),
                }
            }
        }
    }

    /// Fetches every symbol; the result has one entry per input, in input order.
    pub fn fetch_many(&self, symbols: &[Symbol]) -> Vec<(Symbol, QuoteResult)> {
        match self.mode {
            FetchMode::Paced { delay } => {
                let mut results = Vec::with_capacity(symbols.len());
                for (i, symbol) in symbols.iter().enumerate() {
                    if i > 0 && !delay.is_zero() {
                        debug!("Waiting {:?} before {}", delay, symbol);
                        thread::sleep(delay);
                    }
                    results.push((symbol.clone(), self.fetch_one(symbol)));
                }
                results
            }
            FetchMode::Parallel => thread::scope(|scope| {
                let handles: Vec<_> = symbols
                    .iter()
                    .map(|symbol| scope.spawn(move || self.fetch_one(symbol)))
                    .collect();
                handles
                    .into_iter()
                    .zip(symbols)
                    .map(|(handle, symbol)| {
                        let result = handle.join().unwrap_or_else(|_| {
                            error!("Fetch worker for {} panicked", symbol);
                            QuoteResult::Unavailable {
                                symbol: symbol.clone(),
                            }
                        });
                        (symbol.clone(), result)
                    })
                    .collect()
            }),
        }
    }
}
