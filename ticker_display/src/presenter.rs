//! Turns host pushes and responses into the lines a display shows.
//!
//! Both push forms are understood: the legacy list of ready-made lines, and the typed
//! `QUOTES_UPDATE` / `WATCHLIST_UPDATE` envelopes. The most recent update replaces
//! whatever was shown before; an empty update renders as "No data".
//!
//! One-off fetches (`STOCK_UPDATE`, `STOCKS_UPDATE`) go to a separate section below the
//! main list and never replace it.
use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;
use ticker_common::message::{
    KIND_QUOTES_UPDATE, KIND_STOCK_UPDATE, KIND_STOCKS_UPDATE, KIND_WATCHLIST_UPDATE,
};
use ticker_common::{PushUpdate, Quote, QuotesPayload, Response, SpotPayload, Symbol};

const NO_DATA: &str = "No data";

#[derive(Debug, Default)]
pub struct Presenter {
    lines: Vec<String>,
    aside: Vec<String>,
    last_update: Option<i64>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_push(&mut self, update: &PushUpdate) {
        match update {
            PushUpdate::Legacy(lines) => {
                self.lines = lines.clone();
            }
            PushUpdate::Typed { kind, payload } if kind == KIND_QUOTES_UPDATE => {
                match serde_json::from_value::<QuotesPayload>(payload.clone()) {
                    Ok(payload) => {
                        self.lines = payload.quotes.iter().map(quote_line).collect();
                        self.last_update = Some(payload.last_update);
                    }
                    Err(e) => debug!("Unreadable {} payload: {}", kind, e),
                }
            }
            PushUpdate::Typed { kind, payload } if kind == KIND_WATCHLIST_UPDATE => {
                match serde_json::from_value::<Vec<Symbol>>(payload.clone()) {
                    Ok(symbols) => {
                        self.lines = symbols.iter().map(|s| s.display_name().to_string()).collect();
                    }
                    Err(e) => debug!("Unreadable {} payload: {}", kind, e),
                }
            }
            PushUpdate::Typed { kind, payload } if kind == KIND_STOCK_UPDATE => {
                match serde_json::from_value::<SpotPayload>(payload.clone()) {
                    Ok(SpotPayload { quote: Some(quote), .. }) => {
                        self.aside = vec![quote_line(&quote)];
                    }
                    Ok(SpotPayload { symbol, quote: None }) => {
                        self.aside = vec![format!("{:<12} unavailable", symbol.display_name())];
                    }
                    Err(e) => debug!("Unreadable {} payload: {}", kind, e),
                }
            }
            PushUpdate::Typed { kind, payload } if kind == KIND_STOCKS_UPDATE => {
                match serde_json::from_value::<QuotesPayload>(payload.clone()) {
                    Ok(payload) => self.aside = payload.quotes.iter().map(quote_line).collect(),
                    Err(e) => debug!("Unreadable {} payload: {}", kind, e),
                }
            }
            PushUpdate::Typed { kind, .. } => debug!("Ignoring push of kind {}", kind),
        }
    }

    /// Seeds the screen from a response that carries last known quotes.
    pub fn apply_response(&mut self, response: &Response) {
        let Some(result) = &response.result else {
            return;
        };
        let quotes = result
            .get("quotes")
            .cloned()
            .map(serde_json::from_value::<Vec<Quote>>);
        if let Some(Ok(quotes)) = quotes {
            if !quotes.is_empty() {
                self.lines = quotes.iter().map(quote_line).collect();
            }
        }
        if let Some(ms) = result.get("lastUpdate").and_then(Value::as_i64) {
            self.last_update = Some(ms);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        let mut out = if self.lines.is_empty() {
            NO_DATA.to_string()
        } else {
            self.lines.join("\n")
        };
        if !self.aside.is_empty() {
            out.push_str("\n--\n");
            out.push_str(&self.aside.join("\n"));
        }
        if let Some(at) = self.last_update.and_then(DateTime::<Utc>::from_timestamp_millis) {
            out.push_str(&format!("\nUpdated {}", at.format("%H:%M:%S UTC")));
        }
        out
    }
}

fn quote_line(quote: &Quote) -> String {
    format!(
        "{:<12} {:>10.2} {:>+7.2}%",
        quote.symbol.display_name(),
        quote.last_price,
        quote.change_percent
    )
}
