//! Persisted key/value state.
//!
//! `StateStore` is the raw string store (a JSON file on disk, or memory in tests). Every
//! `set` is durable before it returns. `Repository` layers the typed values on top of it:
//! the watchlist, the configuration and the last quotes. Reads never fail: absent or
//! corrupt values are logged and replaced by the documented defaults.
//!
//! Persisted keys:
//! - `watchlist`: JSON array of symbols.
//! - `config`: JSON object (`Configuration`).
//! - `lastQuotes`: JSON array of quote results from the last cycle.
//! - `lastUpdate`: UTC milliseconds of the last cycle.
//! - `stockData`: quote of the last one-off single symbol fetch (`null` when it failed).
//! - `stocksData`: quotes of the last one-off multi symbol fetch.

use std::collections::BTreeMap;
#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use ticker_common::{Configuration, Quote, QuoteResult, Result, Symbol, TickerError};

pub const KEY_WATCHLIST: &str = "watchlist";
pub const KEY_CONFIG: &str = "config";
pub const KEY_LAST_QUOTES: &str = "lastQuotes";
pub const KEY_LAST_UPDATE: &str = "lastUpdate";
pub const KEY_STOCK_DATA: &str = "stockData";
pub const KEY_STOCKS_DATA: &str = "stocksData";

/// Raw string store. Implementations must persist synchronously in `set`.
pub trait StateStore: Send {
    /// Raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Stores `value` under `key`. On error the previous value stays visible.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Store backed by a single JSON object file.
///
/// Writes go to a sibling temp file which is then renamed over the original, so a crash
/// mid-write leaves the previous state intact.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A file that is not a JSON object of strings is logged and treated as empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    let err = TickerError::PersistedDataCorrupt {
                        key: path.display().to_string(),
                        reason: e.to_string(),
                    };
                    warn!("{}; starting from an empty store", err);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No state file at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(FileStore {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock()?;
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        debug!("Persisted `{}` to {}", key, self.path.display());
        Ok(())
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one raw value.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }
}

#[cfg(test)]
impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Values used when the store has nothing usable.
#[derive(Debug, Clone)]
pub struct Defaults {
    /// Watchlist seeded on first run.
    pub watchlist: Vec<Symbol>,
    /// Configuration seeded on first run.
    pub config: Configuration,
}

/// Typed access to the persisted state.
///
/// Nothing is cached: every accessor reads the store, so the store stays the single
/// source of truth.
pub struct Repository {
    store: Box<dyn StateStore>,
    defaults: Defaults,
    suffix: String,
}

impl Repository {
    /// Wraps `store`; `suffix` is re-applied to every symbol read back.
    pub fn new(store: Box<dyn StateStore>, defaults: Defaults, suffix: &str) -> Self {
        Repository {
            store,
            defaults,
            suffix: suffix.to_string(),
        }
    }

    /// Persists the defaults for keys that are absent or unreadable.
    pub fn bootstrap(&self) -> Result<()> {
        if self.read::<Vec<String>>(KEY_WATCHLIST).ok().flatten().is_none() {
            info!("Seeding default watchlist");
            self.save_watchlist(&self.defaults.watchlist)?;
        }
        if self.read::<Configuration>(KEY_CONFIG).ok().flatten().is_none() {
            info!("Seeding default configuration");
            self.save_configuration(&self.defaults.config)?;
        }
        Ok(())
    }

    /// Current watchlist in display order.
    ///
    /// Entries that no longer normalize are dropped; an absent or unparsable value yields
    /// the default list.
    pub fn watchlist(&self) -> Vec<Symbol> {
        match self.read::<Vec<String>>(KEY_WATCHLIST) {
            Ok(Some(raw)) => raw
                .iter()
                .filter_map(|entry| match Symbol::normalize(entry, &self.suffix) {
                    Ok(symbol) => Some(symbol),
                    Err(e) => {
                        warn!("Dropping persisted watchlist entry {:?}: {}", entry, e);
                        None
                    }
                })
                .collect(),
            Ok(None) => self.defaults.watchlist.clone(),
            Err(e) => {
                warn!("{}; using default watchlist", e);
                self.defaults.watchlist.clone()
            }
        }
    }

    /// Replaces the watchlist.
    pub fn save_watchlist(&self, symbols: &[Symbol]) -> Result<()> {
        self.write(KEY_WATCHLIST, symbols)
    }

    /// Current configuration, or the defaults when absent or unreadable.
    pub fn configuration(&self) -> Configuration {
        match self.read::<Configuration>(KEY_CONFIG) {
            Ok(Some(config)) => {
                // Re-normalize in case the suffix convention changed between runs.
                let active_symbol = config.active_symbol.and_then(|symbol| {
                    Symbol::normalize(symbol.as_str(), &self.suffix).ok()
                });
                Configuration {
                    active_symbol,
                    ..config
                }
            }
            Ok(None) => self.defaults.config.clone(),
            Err(e) => {
                warn!("{}; using default configuration", e);
                self.defaults.config.clone()
            }
        }
    }

    /// Replaces the configuration.
    pub fn save_configuration(&self, config: &Configuration) -> Result<()> {
        self.write(KEY_CONFIG, config)
    }

    /// Quotes stored by the last refresh cycle; empty when none are usable.
    pub fn last_quotes(&self) -> Vec<Quote> {
        match self.read::<Vec<QuoteResult>>(KEY_LAST_QUOTES) {
            Ok(Some(results)) => results.into_iter().filter_map(QuoteResult::into_quote).collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("{}; no last quotes", e);
                Vec::new()
            }
        }
    }

    /// UTC milliseconds of the last display refresh.
    pub fn last_update(&self) -> Option<i64> {
        self.read::<i64>(KEY_LAST_UPDATE).unwrap_or_else(|e| {
            warn!("{}", e);
            None
        })
    }

    /// Replaces the stored quotes wholesale and records the refresh time.
    pub fn save_last_quotes(&self, quotes: &[Quote], fetched_at: i64) -> Result<()> {
        let results: Vec<QuoteResult> = quotes.iter().cloned().map(QuoteResult::Available).collect();
        self.write(KEY_LAST_QUOTES, &results)?;
        self.write(KEY_LAST_UPDATE, &fetched_at)
    }

    /// Result of the last one-off single symbol fetch.
    pub fn spot_quote(&self) -> Option<Quote> {
        self.read::<Option<Quote>>(KEY_STOCK_DATA)
            .unwrap_or_else(|e| {
                warn!("{}; no spot quote", e);
                None
            })
            .flatten()
    }

    /// Replaces the spot quote; `None` records a failed fetch.
    pub fn save_spot_quote(&self, quote: Option<&Quote>) -> Result<()> {
        self.write(KEY_STOCK_DATA, &quote)
    }

    /// Quotes of the last one-off multi symbol fetch.
    pub fn batch_quotes(&self) -> Vec<Quote> {
        self.read::<Vec<Quote>>(KEY_STOCKS_DATA)
            .unwrap_or_else(|e| {
                warn!("{}; no batch quotes", e);
                None
            })
            .unwrap_or_default()
    }

    /// Replaces the batch quotes wholesale.
    pub fn save_batch_quotes(&self, quotes: &[Quote]) -> Result<()> {
        self.write(KEY_STOCKS_DATA, quotes)
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.store.set(key, &text)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        decode(key, &raw).map(Some)
    }
}

/// Parses a stored value, unwrapping one level of JSON-in-a-string encoding.
fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    let corrupt = |e: serde_json::Error| TickerError::PersistedDataCorrupt {
        key: key.to_string(),
        reason: e.to_string(),
    };
    let value: Value = serde_json::from_str(raw).map_err(corrupt)?;
    let value = match value {
        Value::String(inner) => serde_json::from_str(&inner).map_err(corrupt)?,
        other => other,
    };
    serde_json::from_value(value).map_err(corrupt)
}
