//! Ticker host service.
//!
//! The host owns network access, persistence and the refresh cadence for a small display
//! that shows a list of market quotes. It wires together:
//!
//! - `Repository` over a `FileStore`: the watchlist, configuration and last quotes, read
//!   back on every command and rewritten on every mutation.
//! - `FetchClient` over `YahooChartProvider`: per-symbol quotes, failures collapsed into
//!   `Unavailable` markers; paced or parallel fan-out.
//! - `RefreshScheduler`: the timer plus the single Idle/Refreshing gate shared by every
//!   trigger (timer, manual command, configuration change).
//! - `Host`: the event loop that dispatches display commands, persists cycle results and
//!   pushes state to displays through the `MessageBus`.
//! - `LinkReceiver`: TCP transport carrying newline-delimited JSON frames.
//!
//! Concurrency and shutdown:
//! - All state mutation happens on the host loop thread; fetch cycles run on worker
//!   threads and report back over a channel.
//! - Ctrl+C stops the scheduler; a cycle still in flight finishes but is never persisted
//!   or pushed.
#![warn(missing_docs)]
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::unbounded;
use log::{error, info, warn};
use ticker_common::config::validate_interval;
use ticker_common::net::addr;
use ticker_common::{Configuration, Result, Symbol, TickerError};

use crate::args::{Args, FetchStrategy};
use crate::bus::BusEvent;
use crate::host::{Host, HostOptions, RefreshMode};
use crate::model::fetch::{FetchClient, FetchMode};
use crate::model::provider::YahooChartProvider;
use crate::model::push::PushFormatter;
use crate::model::scheduler::{
    DEFAULT_SINGLE_INTERVAL, DEFAULT_WATCHLIST_INTERVAL, RefreshScheduler,
};
use crate::model::store::{Defaults, FileStore, Repository};
use crate::receiver::LinkReceiver;

mod args;
mod bus;
mod host;
mod model;
mod receiver;

/// Watchlist seeded on first run.
const DEFAULT_WATCHLIST: [&str; 3] = ["RELIANCE", "TCS", "INFY"];

fn main() -> Result<(), TickerError> {
    init_logger();
    let args = Args::parse();

    let defaults = Defaults {
        watchlist: DEFAULT_WATCHLIST
            .iter()
            .map(|raw| Symbol::normalize(raw, &args.suffix))
            .collect::<Result<Vec<_>>>()?,
        config: Configuration::default(),
    };
    let default_symbol = Symbol::normalize(&args.default_symbol, &args.suffix)?;

    let store = FileStore::open(&args.store)?;
    let repo = Repository::new(Box::new(store), defaults, &args.suffix);
    repo.bootstrap()?;

    let interval = refresh_interval(
        args.interval_ms,
        repo.configuration().refresh_interval_ms,
        args.mode,
    );
    let fetch_mode = match args.fetch {
        FetchStrategy::Paced => FetchMode::Paced {
            delay: Duration::from_millis(args.pacing_ms),
        },
        FetchStrategy::Parallel => FetchMode::Parallel,
    };
    if args.mode == RefreshMode::Watchlist && fetch_mode == FetchMode::Parallel {
        warn!("Parallel fetching may trip provider rate limits; consider --fetch paced");
    }

    let provider = YahooChartProvider::new(
        &args.endpoint,
        Duration::from_secs(args.http_timeout_secs),
    )?;
    let fetch = FetchClient::new(Arc::new(provider), fetch_mode);
    let scheduler = RefreshScheduler::new(fetch, interval);
    let formatter = PushFormatter::new(args.push_format, &args.currency);
    let host = Host::new(
        repo,
        scheduler,
        formatter,
        HostOptions {
            mode: args.mode,
            suffix: args.suffix.clone(),
            default_symbol,
        },
    );

    let (shutdown_tx, shutdown_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down host...");
        let _ = shutdown_tx.send(());
    })
    .map_err(|e| TickerError::Io(std::io::Error::other(e.to_string())))?;

    let (events_tx, events_rx) = unbounded::<BusEvent>();
    let receiver = LinkReceiver::new(&addr(&args.bind, args.port))?;
    thread::spawn(move || {
        if let Err(e) = receiver.accept_loop(events_tx) {
            error!("Display link failed: {}", e);
        }
    });

    info!(
        "Ticker host running in {:?} mode, store {}",
        args.mode,
        args.store.display()
    );
    host.run(events_rx, shutdown_rx);
    Ok(())
}

/// Timer cadence: `--interval-ms`, else the persisted value, else the mode's default.
///
/// A persisted value below the minimum (e.g. a hand-edited store) is ignored.
fn refresh_interval(cli_ms: Option<u64>, persisted_ms: Option<u64>, mode: RefreshMode) -> Duration {
    let persisted_ms = persisted_ms.filter(|ms| match validate_interval(*ms) {
        Ok(_) => true,
        Err(e) => {
            warn!("Ignoring persisted interval: {}", e);
            false
        }
    });
    match cli_ms.or(persisted_ms) {
        Some(ms) => Duration::from_millis(ms),
        None => match mode {
            RefreshMode::Single => DEFAULT_SINGLE_INTERVAL,
            RefreshMode::Watchlist => DEFAULT_WATCHLIST_INTERVAL,
        },
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
