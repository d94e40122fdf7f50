//! Command-line arguments for the ticker host.
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ticker_common::config::MIN_REFRESH_INTERVAL_MS;
use ticker_common::net::HOST_PORT;
use ticker_common::symbol::DEFAULT_SUFFIX;

use crate::host::RefreshMode;
use crate::model::fetch::DEFAULT_PACING;
use crate::model::provider::YAHOO_CHART_URL;
use crate::model::push::PushFormat;

/// How a watchlist cycle fans out to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchStrategy {
    /// One request at a time with `--pacing-ms` between requests.
    Paced,
    /// All symbols at once.
    Parallel,
}

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Interface to accept display connections on.
    #[clap(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// TCP port for display connections.
    #[clap(long, default_value_t = HOST_PORT)]
    pub port: u16,

    /// JSON file holding the watchlist, configuration and last quotes.
    #[clap(long, default_value = "ticker-state.json")]
    pub store: PathBuf,

    /// Refresh the whole watchlist or only the configured active symbol.
    #[clap(long, value_enum, default_value_t = RefreshMode::Watchlist)]
    pub mode: RefreshMode,

    /// Timer cadence, at least 1000 ms. Defaults to the persisted configuration, else 30 s
    /// in single mode and 120 s in watchlist mode.
    #[clap(long, value_parser = clap::value_parser!(u64).range(MIN_REFRESH_INTERVAL_MS..))]
    pub interval_ms: Option<u64>,

    /// Fan-out strategy for watchlist cycles.
    #[clap(long, value_enum, default_value_t = FetchStrategy::Paced)]
    pub fetch: FetchStrategy,

    /// Pause between paced requests.
    #[clap(long, default_value_t = DEFAULT_PACING.as_millis() as u64)]
    pub pacing_ms: u64,

    /// Chart API endpoint; the symbol is appended as a path segment.
    #[clap(long, default_value = YAHOO_CHART_URL)]
    pub endpoint: String,

    /// Exchange suffix applied to every symbol (empty for none).
    #[clap(long, default_value = DEFAULT_SUFFIX, allow_hyphen_values = true)]
    pub suffix: String,

    /// Symbol tracked in single mode until one is configured.
    #[clap(long, default_value = "RELIANCE")]
    pub default_symbol: String,

    /// Currency sign used in legacy push lines.
    #[clap(long, default_value = "₹")]
    pub currency: String,

    /// Push form sent to displays.
    #[clap(long, value_enum, default_value_t = PushFormat::Legacy)]
    pub push_format: PushFormat,

    /// HTTP timeout per provider request, in seconds.
    #[clap(long, default_value_t = 10)]
    pub http_timeout_secs: u64,
}
