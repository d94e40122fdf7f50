//! Wire messages exchanged between host and display.
//!
//! The display sends `Request`s; the host answers each one with exactly one `Response` and
//! additionally pushes `PushUpdate`s whenever its state changes. Host-to-display traffic is
//! wrapped in a `Frame` so both kinds can share one ordered link.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::Method;
use crate::quote::Quote;
use crate::symbol::Symbol;

/// Push kind carrying the result of a refresh cycle.
pub const KIND_QUOTES_UPDATE: &str = "QUOTES_UPDATE";
/// Push kind carrying the watchlist after a mutation.
pub const KIND_WATCHLIST_UPDATE: &str = "WATCHLIST_UPDATE";
/// Push kind carrying an on-demand fetch of one symbol outside the display list.
pub const KIND_STOCK_UPDATE: &str = "STOCK_UPDATE";
/// Push kind carrying an on-demand fetch of an ad-hoc symbol list.
pub const KIND_STOCKS_UPDATE: &str = "STOCKS_UPDATE";

/// Command request sent by the display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation id echoed in the response.
    pub id: u64,
    /// Method name, e.g. `GET_LIST`.
    pub method: String,
    /// Method parameters; `null` when omitted.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    /// Creates a request for a known method.
    pub fn new(id: u64, method: Method, params: Value) -> Self {
        Request {
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// Answer to a single `Request`: either `{id, result}` or `{id, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Id of the request being answered.
    pub id: u64,
    /// Success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Human-readable failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Successful response.
    pub fn ok(id: u64, result: Value) -> Self {
        Response {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Failed response.
    pub fn err(id: u64, message: impl Into<String>) -> Self {
        Response {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Whether this response carries an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Unsolicited host-to-display update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PushUpdate {
    /// Typed envelope, e.g. `{"kind":"QUOTES_UPDATE","payload":{...}}`.
    Typed {
        /// Update kind.
        kind: String,
        /// Kind-specific payload.
        payload: Value,
    },
    /// Legacy form: the ordered lines to display.
    Legacy(Vec<String>),
}

impl PushUpdate {
    /// Typed push with the quotes of a finished refresh cycle.
    pub fn quotes(quotes: &[Quote], last_update: i64) -> Self {
        PushUpdate::Typed {
            kind: KIND_QUOTES_UPDATE.to_string(),
            payload: serde_json::json!({ "quotes": quotes, "lastUpdate": last_update }),
        }
    }

    /// Typed push with the current watchlist.
    pub fn watchlist(symbols: &[Symbol]) -> Self {
        PushUpdate::Typed {
            kind: KIND_WATCHLIST_UPDATE.to_string(),
            payload: serde_json::json!(symbols),
        }
    }

    /// Typed push with the result of a one-off single symbol fetch.
    pub fn spot(symbol: &Symbol, quote: Option<&Quote>) -> Self {
        PushUpdate::Typed {
            kind: KIND_STOCK_UPDATE.to_string(),
            payload: serde_json::json!({ "symbol": symbol, "quote": quote }),
        }
    }

    /// Typed push with the results of a one-off multi symbol fetch.
    pub fn batch(quotes: &[Quote], last_update: i64) -> Self {
        PushUpdate::Typed {
            kind: KIND_STOCKS_UPDATE.to_string(),
            payload: serde_json::json!({ "quotes": quotes, "lastUpdate": last_update }),
        }
    }
}

/// Payload of a `STOCK_UPDATE` push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotPayload {
    /// Symbol that was fetched.
    pub symbol: Symbol,
    /// Its quote, or `None` when the fetch failed.
    pub quote: Option<Quote>,
}

/// Payload of `QUOTES_UPDATE` and `STOCKS_UPDATE` pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotesPayload {
    /// Quotes in watchlist order; unavailable symbols are absent.
    pub quotes: Vec<Quote>,
    /// UTC milliseconds of the refresh that produced them.
    pub last_update: i64,
}

/// Host-to-display frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "lowercase")]
pub enum Frame {
    /// Answer to a request.
    Response(Response),
    /// State push.
    Push(PushUpdate),
}
