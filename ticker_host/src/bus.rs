//! Message bus between the host and its displays.
//!
//! Inbound traffic arrives as `BusEvent`s on a single channel drained by the host loop:
//! a display connecting (its outbound frame sender) or a request together with the sender
//! its response must go to. `dispatch` turns each request into exactly one `Response`:
//! parse and handler errors become error responses, and a panicking handler is caught and
//! answered with a generic failure so no request is ever left pending.
//!
//! Pushes are broadcast best-effort to every connected display; a display whose link is
//! gone is dropped from the subscriber list.

use std::panic::{self, AssertUnwindSafe};

use crossbeam_channel::Sender;
use log::{debug, error, warn};
use serde_json::Value;
use ticker_common::{Command, Frame, PushUpdate, Request, Response, Result};

/// Something the host loop must react to.
#[derive(Debug)]
pub enum BusEvent {
    /// A display connected; pushes go to this sender.
    Connected(Sender<Frame>),
    /// A request and where to send its response.
    Request {
        /// The parsed request envelope.
        request: Request,
        /// Link of the display that sent it.
        reply_to: Sender<Frame>,
    },
}

/// Executes typed commands.
pub trait CommandHandler {
    /// Runs `command` and returns its result payload.
    fn handle(&mut self, command: Command) -> Result<Value>;
}

/// Parses `request`, runs it through `handler` and produces its one response.
pub fn dispatch<H: CommandHandler>(handler: &mut H, request: &Request) -> Response {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let command = Command::try_from(request)?;
        debug!("Dispatching #{} {:?}", request.id, command);
        handler.handle(command)
    }));

    match outcome {
        Ok(Ok(result)) => Response::ok(request.id, result),
        Ok(Err(e)) if e.is_caller_visible() => {
            warn!("Rejected #{} {}: {}", request.id, request.method, e);
            Response::err(request.id, e.to_string())
        }
        Ok(Err(e)) => {
            error!("Command #{} {} failed: {}", request.id, request.method, e);
            Response::err(request.id, format!("internal error while handling {}", request.method))
        }
        Err(_) => {
            error!("Handler panicked on #{} {}", request.id, request.method);
            Response::err(request.id, format!("internal error while handling {}", request.method))
        }
    }
}

/// Connected displays and the fan-out to them.
#[derive(Default)]
pub struct MessageBus {
    subscribers: Vec<Sender<Frame>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a display that will receive every later push.
    pub fn subscribe(&mut self, tx: Sender<Frame>) {
        self.subscribers.push(tx);
        debug!("Display subscribed. Total displays: {}", self.subscribers.len());
    }

    /// Sends `response` back to the requesting display.
    pub fn reply(&self, reply_to: &Sender<Frame>, response: Response) {
        let id = response.id;
        if reply_to.send(Frame::Response(response)).is_err() {
            warn!("Display went away before response #{} could be sent", id);
        }
    }

    /// Broadcasts `update`; returns how many displays it reached.
    pub fn push(&mut self, update: PushUpdate) -> usize {
        let before = self.subscribers.len();
        self.subscribers
            .retain(|tx| tx.send(Frame::Push(update.clone())).is_ok());
        let delivered = self.subscribers.len();
        if delivered < before {
            debug!("Dropped {} disconnected display(s)", before - delivered);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use serde_json::json;
    use ticker_common::TickerError;

    struct Echo;

    impl CommandHandler for Echo {
        fn handle(&mut self, command: Command) -> Result<Value> {
            match command {
                Command::GetList => Ok(json!(["TCS.NS"])),
                Command::RefreshNow => Err(TickerError::Io(std::io::Error::other("disk full"))),
                Command::GetConfig => panic!("boom"),
                _ => Err(TickerError::InvalidCommandParams("nope".into())),
            }
        }
    }

    fn request(id: u64, method: &str) -> Request {
        Request {
            id,
            method: method.into(),
            params: Value::Null,
        }
    }

    #[test]
    fn success_carries_result() {
        let response = dispatch(&mut Echo, &request(1, "GET_LIST"));
        assert_eq!(response, Response::ok(1, json!(["TCS.NS"])));
    }

    #[test]
    fn unknown_method_gets_error_response() {
        let response = dispatch(&mut Echo, &request(2, "SELL_EVERYTHING"));
        assert_eq!(response.id, 2);
        assert!(response.error.unwrap().contains("SELL_EVERYTHING"));
    }

    #[test]
    fn invalid_params_are_visible() {
        let response = dispatch(&mut Echo, &request(3, "ADD"));
        assert!(response.error.unwrap().contains("symbol"));
    }

    #[test]
    fn internal_failures_are_masked() {
        let response = dispatch(&mut Echo, &request(4, "REFRESH_NOW"));
        let message = response.error.unwrap();
        assert!(message.starts_with("internal error"));
        assert!(!message.contains("disk full"));
    }

    #[test]
    fn panics_still_get_a_response() {
        let response = dispatch(&mut Echo, &request(5, "GET_CONFIG"));
        assert_eq!(response.id, 5);
        assert!(response.is_error());
    }

    #[test]
    fn push_drops_disconnected_displays() {
        let mut bus = MessageBus::new();
        let (alive_tx, alive_rx) = unbounded();
        let (gone_tx, gone_rx) = unbounded();
        bus.subscribe(alive_tx);
        bus.subscribe(gone_tx);
        drop(gone_rx);

        assert_eq!(bus.push(PushUpdate::Legacy(vec!["x".into()])), 1);
        assert_eq!(bus.push(PushUpdate::Legacy(vec![])), 1);
        assert_eq!(
            alive_rx.try_recv().unwrap(),
            Frame::Push(PushUpdate::Legacy(vec!["x".into()]))
        );
        assert_eq!(alive_rx.try_iter().count(), 1);
    }
}
