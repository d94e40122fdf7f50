//! Ticker display: a terminal stand-in for the wearable screen.
//!
//! Connects to the ticker host over TCP, asks for the watchlist and last known quotes,
//! sends any extra commands given on the command line, then keeps printing whatever the
//! host pushes until Ctrl+C (or, with `--once`, until every response has arrived).
//!
//! Usage example (CLI):
//! ```bash
//! ticker_display --host-ip 192.168.0.10 --send add --symbol hdfcbank --send refresh-now
//! ```
#![warn(missing_docs)]
mod args;
mod link;
mod presenter;

use std::collections::HashSet;
use std::io::ErrorKind;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use clap::Parser;
use log::{debug, error, info, warn};
use serde_json::Value;
use ticker_common::net::addr;
use ticker_common::{Frame, Method, Result, TickerError};

use crate::args::Args;
use crate::link::{FrameReader, RequestSender, params_for};
use crate::presenter::Presenter;

/// How often the read loop wakes up to check for Ctrl+C.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn main() -> Result<(), TickerError> {
    init_logger();
    let args = Args::parse();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down display...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| TickerError::Io(std::io::Error::other(e.to_string())))?;
    }

    let host_ip = args.host_ip.trim().replace('"', "");
    let mut sender = RequestSender::connect(&addr(&host_ip, args.port))?;
    let stream = sender.stream().try_clone()?;
    stream.set_read_timeout(Some(POLL_INTERVAL))?;
    let mut reader = FrameReader::new(stream);

    let mut pending = HashSet::new();
    pending.insert(sender.send(Method::GetList, Value::Null)?);
    for method in &args.send {
        let params = params_for(*method, &args)?;
        pending.insert(sender.send(*method, params)?);
    }

    info!("Display is running. Press Ctrl+C to exit.");
    let mut presenter = Presenter::new();
    while !shutdown.load(Ordering::Relaxed) {
        let frame = match reader.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(TickerError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!("Ticker host closed the link");
                break;
            }
            Err(e) => {
                error!("Receive error: {}", e);
                return Err(e);
            }
        };

        match frame {
            Frame::Response(response) => {
                pending.remove(&response.id);
                match (&response.result, &response.error) {
                    (_, Some(message)) => warn!("Response #{}: error: {}", response.id, message),
                    (Some(result), None) => info!("Response #{}: {}", response.id, result),
                    (None, None) => info!("Response #{}: ok", response.id),
                }
                presenter.apply_response(&response);
                if args.once && pending.is_empty() {
                    info!("SCREEN:\n{}", presenter.render());
                    break;
                }
            }
            Frame::Push(update) => {
                presenter.apply_push(&update);
                debug!("{} line(s) on screen", presenter.lines().len());
                info!("SCREEN:\n{}", presenter.render());
            }
        }
    }
    info!("Display loop stopping...");
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
