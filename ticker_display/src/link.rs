//! TCP link to the ticker host.
//!
//! Requests go out as one JSON object per line; the host answers with `Frame`s in the
//! same framing. `FrameReader` tolerates read timeouts so the caller can poll a shutdown
//! flag between frames without losing a partially received line.
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::TcpStream;

use log::{debug, info, warn};
use serde_json::{Value, json};
use ticker_common::{Frame, Method, Request, Result, TickerError};

use crate::args::Args;

/// Writing half of the display link.
pub struct RequestSender<W: Write> {
    writer: W,
    next_id: u64,
}

impl RequestSender<TcpStream> {
    pub fn connect(address: &str) -> Result<Self> {
        info!("Connecting to ticker host at {}", address);
        let stream = TcpStream::connect(address)?;
        Ok(RequestSender::new(stream))
    }

    pub fn stream(&self) -> &TcpStream {
        &self.writer
    }
}

impl<W: Write> RequestSender<W> {
    pub fn new(writer: W) -> Self {
        RequestSender { writer, next_id: 1 }
    }

    /// Sends one request and returns the id its response will carry.
    pub fn send(&mut self, method: Method, params: Value) -> Result<u64> {
        let id = self.next_id;
        self.next_id += 1;
        let request = Request::new(id, method, params);
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        debug!("Sent #{} {}", id, request.method);
        Ok(id)
    }
}

/// Builds the params object for `method` out of the CLI arguments.
pub fn params_for(method: Method, args: &Args) -> Result<Value> {
    match method {
        Method::Add => {
            let symbol = args.symbol.as_deref().ok_or_else(|| {
                TickerError::InvalidCommandParams("add needs --symbol".into())
            })?;
            Ok(json!({ "symbol": symbol }))
        }
        Method::Delete => {
            let index = args.index.ok_or_else(|| {
                TickerError::InvalidCommandParams("delete needs --index".into())
            })?;
            Ok(json!({ "index": index }))
        }
        Method::FetchSymbol => Ok(match &args.symbol {
            Some(symbol) => json!({ "symbol": symbol }),
            None => Value::Null,
        }),
        Method::FetchMany => {
            if args.symbols.is_empty() {
                return Err(TickerError::InvalidCommandParams(
                    "fetch-many needs --symbols".into(),
                ));
            }
            Ok(json!({ "symbols": args.symbols }))
        }
        Method::SetConfig => {
            let mut patch = serde_json::Map::new();
            if let Some(symbol) = &args.symbol {
                patch.insert("activeSymbol".into(), json!(symbol));
            }
            if let Some(ms) = args.interval_ms {
                patch.insert("refreshIntervalMs".into(), json!(ms));
            }
            Ok(Value::Object(patch))
        }
        Method::GetList | Method::GetQuotes | Method::GetConfig | Method::RefreshNow => {
            Ok(Value::Null)
        }
    }
}

/// Reading half of the display link.
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        FrameReader {
            reader: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    /// Next frame from the host.
    ///
    /// `Ok(None)` means the read timed out before a full line arrived; call again.
    /// The host closing the link is reported as `UnexpectedEof`.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    return Err(TickerError::Io(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "host closed the link",
                    )));
                }
                Ok(_) if !self.buf.ends_with(b"\n") => continue,
                Ok(_) => {
                    let line = std::mem::take(&mut self.buf);
                    let text = String::from_utf8_lossy(&line);
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Frame>(text) {
                        Ok(frame) => return Ok(Some(frame)),
                        Err(e) => warn!("Skipping malformed frame ({}): {}", e, text),
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
