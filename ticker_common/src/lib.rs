//!
//! Common types and utilities shared by the ticker host and display.
//!
//! This crate aggregates:
//! - `error`: unified error type `TickerError` used across the workspace.
//! - `result`: handy `Result<T, TickerError>` alias.
//! - `symbol`: normalized instrument identifiers.
//! - `quote`: quotes and the `Unavailable` marker produced by a refresh cycle.
//! - `config`: user configuration persisted by the host.
//! - `message`: request/response/push frames exchanged over the link.
//! - `command`: typed commands parsed from requests.
//! - `net`: networking constants and small helpers.
#![warn(missing_docs)]
pub mod command;
pub mod config;
pub mod error;
pub mod message;
pub mod net;
pub mod quote;
pub mod result;
pub mod symbol;

pub use command::{Command, Method};
pub use config::Configuration;
pub use error::TickerError;
pub use message::{Frame, PushUpdate, QuotesPayload, Request, Response, SpotPayload};
pub use quote::{Quote, QuoteResult};
pub use result::Result;
pub use symbol::Symbol;
