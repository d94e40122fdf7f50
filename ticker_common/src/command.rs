//! Typed commands carried by `Request`s.
//!
//! `Method` is the closed set of method names the host understands (including the names
//! used by older display builds); `Command` is a request whose parameters have been
//! checked. Parsing fails with `UnknownMethod` or `InvalidCommandParams`.
use clap::ValueEnum;
use serde_json::Value;
use strum_macros::{Display, EnumString};

use crate::config::ConfigPatch;
use crate::error::TickerError;
use crate::message::Request;

/// Method names accepted by the host.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, ValueEnum)]
pub enum Method {
    #[strum(to_string = "GET_LIST", serialize = "GET_TODO_LIST")]
    GetList,
    #[strum(to_string = "GET_QUOTES", serialize = "GET_STOCK_DATA")]
    GetQuotes,
    #[strum(to_string = "GET_CONFIG")]
    GetConfig,
    #[strum(to_string = "ADD")]
    Add,
    #[strum(to_string = "DELETE")]
    Delete,
    #[strum(to_string = "REFRESH_NOW", serialize = "REFRESH_STOCKS")]
    RefreshNow,
    #[strum(to_string = "FETCH_SYMBOL", serialize = "FETCH_STOCK_NOW")]
    FetchSymbol,
    #[strum(to_string = "FETCH_MANY", serialize = "FETCH_MULTIPLE_STOCKS")]
    FetchMany,
    #[strum(to_string = "SET_CONFIG", serialize = "SET_STOCK_SYMBOL")]
    SetConfig,
}

/// A request with validated parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Current watchlist and last quotes.
    GetList,
    /// Last persisted quotes and the time of the last refresh.
    GetQuotes,
    /// Current configuration.
    GetConfig,
    /// Append a symbol (raw form) to the watchlist.
    Add {
        /// Symbol as typed by the user.
        symbol: String,
    },
    /// Remove the watchlist entry at `index`.
    Delete {
        /// Zero-based position in the watchlist.
        index: usize,
    },
    /// Refresh the whole target out of band.
    RefreshNow,
    /// Refresh one symbol out of band; `None` means the configured active symbol.
    FetchSymbol {
        /// Symbol as typed by the user.
        symbol: Option<String>,
    },
    /// Fetch an ad-hoc list of symbols out of band, outside the watchlist.
    FetchMany {
        /// Symbols as typed by the user; never empty.
        symbols: Vec<String>,
    },
    /// Validate and persist configuration fields.
    SetConfig(ConfigPatch),
}

impl TryFrom<&Request> for Command {
    type Error = TickerError;

    fn try_from(request: &Request) -> Result<Self, Self::Error> {
        let method: Method = request
            .method
            .parse()
            .map_err(|_| TickerError::UnknownMethod(request.method.clone()))?;
        let params = &request.params;

        let command = match method {
            Method::GetList => Command::GetList,
            Method::GetQuotes => Command::GetQuotes,
            Method::GetConfig => Command::GetConfig,
            Method::RefreshNow => Command::RefreshNow,
            Method::Add => Command::Add {
                symbol: required_str(params, "symbol")?,
            },
            Method::Delete => Command::Delete {
                index: required_index(params)?,
            },
            Method::FetchSymbol => Command::FetchSymbol {
                symbol: optional_str(params, "symbol")?,
            },
            Method::FetchMany => Command::FetchMany {
                symbols: required_str_list(params, "symbols")?,
            },
            Method::SetConfig => Command::SetConfig(
                serde_json::from_value(params.clone()).map_err(|e| {
                    TickerError::InvalidCommandParams(format!("SET_CONFIG params: {}", e))
                })?,
            ),
        };
        Ok(command)
    }
}

fn optional_str(params: &Value, field: &str) -> Result<Option<String>, TickerError> {
    match params.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(TickerError::InvalidCommandParams(format!(
            "`{}` must be a string, got {}",
            field, other
        ))),
    }
}

fn required_str(params: &Value, field: &str) -> Result<String, TickerError> {
    optional_str(params, field)?
        .ok_or_else(|| TickerError::InvalidCommandParams(format!("missing `{}`", field)))
}

fn required_str_list(params: &Value, field: &str) -> Result<Vec<String>, TickerError> {
    let invalid = || {
        TickerError::InvalidCommandParams(format!("`{}` must be a non-empty list of strings", field))
    };
    let items = params.get(field).and_then(Value::as_array).ok_or_else(invalid)?;
    if items.is_empty() {
        return Err(invalid());
    }
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn required_index(params: &Value) -> Result<usize, TickerError> {
    params
        .get("index")
        .and_then(Value::as_u64)
        .map(|index| index as usize)
        .ok_or_else(|| {
            TickerError::InvalidCommandParams("`index` must be a non-negative integer".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(method: &str, params: Value) -> Result<Command, TickerError> {
        Command::try_from(&Request {
            id: 1,
            method: method.to_string(),
            params,
        })
    }

    #[test]
    fn parses_known_methods() {
        assert_eq!(parse("GET_LIST", Value::Null).unwrap(), Command::GetList);
        assert_eq!(
            parse("ADD", json!({"symbol": "tcs"})).unwrap(),
            Command::Add { symbol: "tcs".into() }
        );
        assert_eq!(
            parse("DELETE", json!({"index": 2})).unwrap(),
            Command::Delete { index: 2 }
        );
        assert_eq!(
            parse("FETCH_SYMBOL", Value::Null).unwrap(),
            Command::FetchSymbol { symbol: None }
        );
    }

    #[test]
    fn accepts_legacy_method_names() {
        assert_eq!(parse("GET_TODO_LIST", Value::Null).unwrap(), Command::GetList);
        assert_eq!(parse("REFRESH_STOCKS", Value::Null).unwrap(), Command::RefreshNow);
        assert_eq!(Method::RefreshNow.to_string(), "REFRESH_NOW");
    }

    #[test]
    fn fetch_many_needs_a_non_empty_symbol_list() {
        assert_eq!(
            parse("FETCH_MULTIPLE_STOCKS", json!({"symbols": ["tcs", "infy"]})).unwrap(),
            Command::FetchMany {
                symbols: vec!["tcs".into(), "infy".into()]
            }
        );
        assert_eq!(Method::FetchMany.to_string(), "FETCH_MANY");
        for params in [Value::Null, json!({"symbols": []}), json!({"symbols": ["tcs", 1]})] {
            assert!(matches!(
                parse("FETCH_MANY", params),
                Err(TickerError::InvalidCommandParams(_))
            ));
        }
    }

    #[test]
    fn unknown_method_is_an_error() {
        assert!(matches!(
            parse("LAUNCH_ROCKET", Value::Null),
            Err(TickerError::UnknownMethod(m)) if m == "LAUNCH_ROCKET"
        ));
    }

    #[test]
    fn bad_params_are_rejected() {
        assert!(matches!(
            parse("ADD", Value::Null),
            Err(TickerError::InvalidCommandParams(_))
        ));
        assert!(parse("ADD", json!({"symbol": 5})).is_err());
        assert!(parse("DELETE", json!({"index": -1})).is_err());
        assert!(parse("DELETE", json!({"index": "0"})).is_err());
        assert!(parse("SET_CONFIG", json!({"refreshIntervalMs": "fast"})).is_err());
    }
}
