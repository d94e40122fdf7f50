use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info, warn};
use ticker_common::{Frame, Request, Response, Result, TickerError};

use crate::bus::BusEvent;

/// TCP front door for displays.
///
/// Each connection carries newline-delimited JSON: `Request`s from the display, `Frame`s
/// back from the host. A connection gets a reader thread that forwards requests to the
/// host loop and a writer thread that drains the connection's frame channel. A broken or
/// misbehaving display only ever takes down its own threads.
pub struct LinkReceiver {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl LinkReceiver {
    /// Bind a new receiver to the provided `bind_addr` (e.g., `0.0.0.0:8080`).
    pub fn new(bind_addr: &str) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking accept loop. Returns once the host loop has gone away.
    pub fn accept_loop(self, events: Sender<BusEvent>) -> Result<()> {
        info!("Display link listening on {}", self.local_addr()?);

        for stream in self.socket.incoming() {
            match stream {
                Ok(stream) => {
                    let peer = match stream.peer_addr() {
                        Ok(peer) => peer,
                        Err(e) => {
                            warn!("Dropping connection without peer address: {}", e);
                            continue;
                        }
                    };
                    info!("Display connected from {}", peer);
                    if let Err(e) = Self::serve(stream, peer, &events) {
                        error!("Failed to set up link for {}: {}", peer, e);
                        if matches!(e, TickerError::ChannelSend(_)) {
                            return Err(e);
                        }
                    }
                }
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }

    fn serve(stream: TcpStream, peer: SocketAddr, events: &Sender<BusEvent>) -> Result<()> {
        let (frame_tx, frame_rx) = unbounded::<Frame>();
        let write_half = stream.try_clone()?;

        thread::Builder::new()
            .name(format!("link-writer-{}", peer))
            .spawn(move || write_frames(write_half, frame_rx, peer))?;

        events
            .send(BusEvent::Connected(frame_tx.clone()))
            .map_err(|e| TickerError::ChannelSend(e.to_string()))?;

        let events = events.clone();
        thread::Builder::new()
            .name(format!("link-reader-{}", peer))
            .spawn(move || read_requests(stream, frame_tx, events, peer))?;
        Ok(())
    }
}

fn read_requests(
    stream: TcpStream,
    frame_tx: Sender<Frame>,
    events: Sender<BusEvent>,
    peer: SocketAddr,
) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Read error from {}: {}", peer, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                debug!("{} -> #{} {}", peer, request.id, request.method);
                let event = BusEvent::Request {
                    request,
                    reply_to: frame_tx.clone(),
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Malformed request from {}: {}", peer, e);
                let reply = Response::err(0, format!("malformed request: {}", e));
                let _ = frame_tx.send(Frame::Response(reply));
            }
        }
    }
    info!("Display {} disconnected", peer);
}

fn write_frames(stream: TcpStream, frames: Receiver<Frame>, peer: SocketAddr) {
    let mut writer = BufWriter::new(stream);
    for frame in frames {
        let written = serde_json::to_writer(&mut writer, &frame)
            .map_err(TickerError::from)
            .and_then(|_| {
                writer.write_all(b"\n")?;
                writer.flush()?;
                Ok(())
            });
        if let Err(e) = written {
            warn!("Failed to write to {}: {}", peer, e);
            break;
        }
    }
    debug!("Writer for {} stopped", peer);
}
