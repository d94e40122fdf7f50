//! Command-line arguments for the ticker display.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;
use ticker_common::Method;
use ticker_common::net::HOST_PORT;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Host address (IPv4 or IPv6) where the ticker host is running.
    #[clap(long, default_value = "127.0.0.1")]
    pub host_ip: String,

    /// Host TCP port.
    #[clap(long, default_value_t = HOST_PORT)]
    pub port: u16,

    /// Commands to send after the initial `get-list`, in order (e.g. `--send refresh-now`).
    #[clap(long, value_enum)]
    pub send: Vec<Method>,

    /// Symbol parameter for `add`, `fetch-symbol` and `set-config`.
    #[clap(long)]
    pub symbol: Option<String>,

    /// Symbols parameter for `fetch-many`, comma separated.
    #[clap(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

        /// Index parameter for `delete`.
    #[clap(long)]
    pub index: Option<usize>,

    /// Refresh interval parameter for `set-config`.
    #[clap(long)]
    pub interval_ms: Option<u64>,

    /// Exit after all responses arrived instead of following pushes.
    #[clap(long)]
    pub once: bool,
}
