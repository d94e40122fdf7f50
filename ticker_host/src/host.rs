//! Host event loop.
//!
//! `Host` owns the repository, the refresh scheduler and the message bus, and is the only
//! place where state is mutated. Its `run` loop multiplexes four sources with crossbeam
//! `select!`:
//!
//! - bus events (display connections and command requests),
//! - the scheduler's timer,
//! - completed refresh cycles,
//! - the shutdown signal.
//!
//! Every mutation follows mutate → persist → respond → push, and every refresh, whatever
//! triggered it, goes through the scheduler's single gate.
//!
//! Cycle results are routed by their target: display cycles replace `lastQuotes` and the
//! screen, while on-demand spot and batch fetches are stored under their own keys. A
//! display cycle is checked against the display list as it is when the cycle completes,
//! so symbols removed mid-cycle are never persisted or pushed.

use clap::ValueEnum;
use chrono::Utc;
use crossbeam_channel::{Receiver, select};
use log::{debug, error, info};
use serde_json::{Value, json};
use ticker_common::{Command, PushUpdate, Quote, Result, Symbol, TickerError};

use crate::bus::{BusEvent, CommandHandler, MessageBus, dispatch};
use crate::model::push::PushFormatter;
use crate::model::scheduler::{
    CycleOutcome, RefreshScheduler, RefreshState, RefreshTarget, Trigger,
};
use crate::model::store::Repository;

/// What the timer refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RefreshMode {
    /// The whole watchlist.
    Watchlist,
    /// Only the configured active symbol.
    Single,
}

/// Deployment settings the host needs beyond its collaborators.
pub struct HostOptions {
    /// What the timer refreshes.
    pub mode: RefreshMode,
    /// Exchange suffix applied to every symbol.
    pub suffix: String,
    /// Single-mode symbol until one is configured.
    pub default_symbol: Symbol,
}

/// Owns all mutable host state; driven by `run`.
pub struct Host {
    repo: Repository,
    scheduler: RefreshScheduler,
    bus: MessageBus,
    formatter: PushFormatter,
    options: HostOptions,
    pending: Vec<PushUpdate>,
}

impl Host {
    pub fn new(
        repo: Repository,
        scheduler: RefreshScheduler,
        formatter: PushFormatter,
        options: HostOptions,
    ) -> Self {
        Host {
            repo,
            scheduler,
            bus: MessageBus::new(),
            formatter,
            options,
            pending: Vec::new(),
        }
    }

    /// Starts the scheduler and kicks off the first cycle.
    pub fn start(&mut self) {
        self.scheduler.start();
        self.refresh(Trigger::Startup);
    }

    /// Stops the scheduler; an in-flight cycle is discarded when it completes.
    pub fn stop(&mut self) {
        if self.scheduler.state() == RefreshState::Refreshing {
            info!("Stopping with a cycle in flight; its result will be discarded");
        }
        self.scheduler.stop();
    }

    /// Runs until `shutdown` fires or every event sender is gone.
    pub fn run(mut self, events: Receiver<BusEvent>, shutdown: Receiver<()>) {
        self.start();
        loop {
            let timer = self.scheduler.timer().clone();
            let completions = self.scheduler.completions().clone();
            select! {
                recv(events) -> msg => match msg {
                    Ok(event) => self.on_event(event),
                    Err(_) => {
                        info!("Event channel closed");
                        break;
                    }
                },
                recv(timer) -> _ => self.on_tick(),
                recv(completions) -> msg => {
                    if let Ok(outcome) = msg {
                        self.on_cycle_complete(outcome);
                    }
                }
                recv(shutdown) -> _ => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }
        self.stop();
        info!("Host stopped");
    }

    /// Registers a display or answers a request, then flushes queued pushes.
    pub fn on_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::Connected(tx) => self.bus.subscribe(tx),
            BusEvent::Request { request, reply_to } => {
                let response = dispatch(self, &request);
                self.bus.reply(&reply_to, response);
                self.flush_pushes();
            }
        }
    }

    /// Timer tick: refresh the display list.
    pub fn on_tick(&mut self) {
        debug!("Timer fired");
        self.refresh(Trigger::Timer);
    }

    /// Persists and pushes the outcome of a cycle, unless the scheduler discards it.
    pub fn on_cycle_complete(&mut self, outcome: CycleOutcome) {
        let Some(outcome) = self.scheduler.complete(outcome) else {
            return;
        };
        let CycleOutcome {
            generation,
            trigger,
            target,
            results,
        } = outcome;
        let total = results.len();
        let quotes: Vec<Quote> = results
            .into_iter()
            .filter_map(|(_, result)| result.into_quote())
            .collect();
        let now = Utc::now().timestamp_millis();
        info!(
            "Cycle #{} done ({}): {}/{} symbols available",
            generation,
            trigger,
            quotes.len(),
            total
        );

        let update = match target {
            RefreshTarget::Display(fetched) => {
                let current = self.display_symbols();
                if current != fetched {
                    debug!("Display list changed while cycle #{} was running", generation);
                }
                let quotes: Vec<Quote> = quotes
                    .into_iter()
                    .filter(|quote| current.contains(&quote.symbol))
                    .collect();
                if let Err(e) = self.repo.save_last_quotes(&quotes, now) {
                    error!("Failed to persist quotes: {}", e);
                }
                Some(self.formatter.quotes(&quotes, now))
            }
            RefreshTarget::Spot(symbol) => {
                let quote = quotes.first();
                if let Err(e) = self.repo.save_spot_quote(quote) {
                    error!("Failed to persist spot quote for {}: {}", symbol, e);
                }
                self.formatter.spot(&symbol, quote)
            }
            RefreshTarget::Batch(_) => {
                if let Err(e) = self.repo.save_batch_quotes(&quotes) {
                    error!("Failed to persist batch quotes: {}", e);
                }
                self.formatter.batch(&quotes, now)
            }
        };
        match update {
            Some(update) => {
                let delivered = self.bus.push(update);
                debug!("Cycle #{} pushed to {} display(s)", generation, delivered);
            }
            None => debug!("Cycle #{} has no push for this display format", generation),
        }
    }

    /// Requests a cycle for the display list; dropped if one is already running.
    fn refresh(&mut self, trigger: Trigger) -> bool {
        let target = RefreshTarget::Display(self.display_symbols());
        self.scheduler.trigger(target, trigger)
    }

    fn display_symbols(&self) -> Vec<Symbol> {
        match self.options.mode {
            RefreshMode::Watchlist => self.repo.watchlist(),
            RefreshMode::Single => vec![self.active_symbol()],
        }
    }

    fn active_symbol(&self) -> Symbol {
        self.repo
            .configuration()
            .active_symbol
            .unwrap_or_else(|| self.options.default_symbol.clone())
    }

    fn flush_pushes(&mut self) {
        for update in std::mem::take(&mut self.pending) {
            self.bus.push(update);
        }
    }

    fn watchlist_changed(&mut self, symbols: &[Symbol]) {
        self.pending.push(self.formatter.watchlist(symbols));
        if self.options.mode == RefreshMode::Watchlist {
            self.refresh(Trigger::ConfigChange);
        }
    }
}

impl CommandHandler for Host {
    fn handle(&mut self, command: Command) -> Result<Value> {
        match command {
            Command::GetList => Ok(json!({
                "watchlist": self.repo.watchlist(),
                "quotes": self.repo.last_quotes(),
            })),
            Command::GetQuotes => Ok(json!({
                "quotes": self.repo.last_quotes(),
                "lastUpdate": self.repo.last_update(),
                "stockData": self.repo.spot_quote(),
                "stocksData": self.repo.batch_quotes(),
            })),
            Command::GetConfig => {
                let mut config = self.repo.configuration();
                config
                    .refresh_interval_ms
                    .get_or_insert(self.scheduler.interval().as_millis() as u64);
                Ok(serde_json::to_value(config)?)
            }
            Command::Add { symbol } => {
                let symbol = Symbol::normalize(&symbol, &self.options.suffix)?;
                let mut list = self.repo.watchlist();
                list.push(symbol);
                self.repo.save_watchlist(&list)?;
                info!("Watchlist: {} symbol(s) after ADD", list.len());
                self.watchlist_changed(&list);
                Ok(json!(list))
            }
            Command::Delete { index } => {
                let mut list = self.repo.watchlist();
                if index >= list.len() {
                    return Err(TickerError::InvalidCommandParams(format!(
                        "index {} out of range for {} symbol(s)",
                        index,
                        list.len()
                    )));
                }
                let removed = list.remove(index);
                self.repo.save_watchlist(&list)?;
                info!("Removed {} from watchlist", removed);
                self.watchlist_changed(&list);
                Ok(json!(list))
            }
            Command::RefreshNow => {
                self.refresh(Trigger::Manual);
                Ok(json!("accepted"))
            }
            Command::FetchSymbol { symbol } => {
                let symbol = match symbol {
                    Some(raw) => Symbol::normalize(&raw, &self.options.suffix)?,
                    None => self.active_symbol(),
                };
                let target = if self.display_symbols() == [symbol.clone()] {
                    RefreshTarget::Display(vec![symbol])
                } else {
                    RefreshTarget::Spot(symbol)
                };
                self.scheduler.trigger(target, Trigger::Manual);
                Ok(json!("accepted"))
            }
            Command::FetchMany { symbols } => {
                let symbols = symbols
                    .iter()
                    .map(|raw| Symbol::normalize(raw, &self.options.suffix))
                    .collect::<Result<Vec<_>>>()?;
                self.scheduler
                    .trigger(RefreshTarget::Batch(symbols), Trigger::Manual);
                Ok(json!("accepted"))
            }
            Command::SetConfig(patch) => {
                let current = self.repo.configuration();
                let next = patch.apply(&current, &self.options.suffix)?;
                self.repo.save_configuration(&next)?;
                if next.refresh_interval_ms != current.refresh_interval_ms {
                    if let Some(ms) = next.refresh_interval_ms {
                        info!(
                            "Refresh interval set to {} ms; applies after restart (running at {:?})",
                            ms,
                            self.scheduler.interval()
                        );
                    }
                }
                if self.options.mode == RefreshMode::Single
                    && next.active_symbol != current.active_symbol
                {
                    self.refresh(Trigger::ConfigChange);
                }
                Ok(serde_json::to_value(next)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fetch::tests::{TableProvider, sym};
    use crate::model::fetch::{FetchClient, FetchMode};
    use crate::model::push::PushFormat;
    use crate::model::scheduler::tests::GatedProvider;
    use crate::model::provider::QuoteProvider;
    use crate::model::store::{Defaults, KEY_WATCHLIST, MemoryStore, StateStore};
    use crossbeam_channel::{Sender, unbounded};
    use std::sync::Arc;
    use std::time::Duration;
    use ticker_common::symbol::DEFAULT_SUFFIX;
    use ticker_common::message::{KIND_STOCK_UPDATE, KIND_STOCKS_UPDATE};
    use ticker_common::{Configuration, Frame, Request, Response};

    struct Harness {
        host: Host,
        display: Receiver<Frame>,
        reply_tx: Sender<Frame>,
        inbox: Vec<Frame>,
        next_id: u64,
    }

    impl Harness {
        fn new(provider: Arc<dyn QuoteProvider>, store: MemoryStore, mode: RefreshMode) -> Self {
            Self::with_format(provider, store, mode, PushFormat::Legacy)
        }

        fn with_format(
            provider: Arc<dyn QuoteProvider>,
            store: MemoryStore,
            mode: RefreshMode,
            format: PushFormat,
        ) -> Self {
            let defaults = Defaults {
                watchlist: vec![sym("a"), sym("b"), sym("c")],
                config: Configuration::default(),
            };
            let repo = Repository::new(Box::new(store), defaults, DEFAULT_SUFFIX);
            let fetch = FetchClient::new(provider, FetchMode::Parallel);
            let scheduler = RefreshScheduler::new(fetch, Duration::from_secs(3600));
            let options = HostOptions {
                mode,
                suffix: DEFAULT_SUFFIX.to_string(),
                default_symbol: sym("reliance"),
            };
            let mut host = Host::new(
                repo,
                scheduler,
                PushFormatter::new(format, "₹"),
                options,
            );
            let (display_tx, display) = unbounded();
            host.on_event(BusEvent::Connected(display_tx.clone()));
            Harness {
                host,
                display,
                reply_tx: display_tx,
                inbox: Vec::new(),
                next_id: 0,
            }
        }

        fn request(&mut self, method: &str, params: Value) -> Response {
            self.next_id += 1;
            let request = Request {
                id: self.next_id,
                method: method.into(),
                params,
            };
            self.host.on_event(BusEvent::Request {
                request,
                reply_to: self.reply_tx.clone(),
            });
            self.inbox.extend(self.display.try_iter());
            let position = self
                .inbox
                .iter()
                .position(|frame| matches!(frame, Frame::Response(r) if r.id == self.next_id))
                .expect("no response");
            match self.inbox.remove(position) {
                Frame::Response(response) => response,
                Frame::Push(_) => unreachable!(),
            }
        }

        /// Everything received since the last call, responses already claimed excluded.
        fn frames(&mut self) -> Vec<Frame> {
            self.inbox.extend(self.display.try_iter());
            std::mem::take(&mut self.inbox)
        }

        fn finish_cycle(&mut self) {
            let outcome = self
                .host
                .scheduler
                .completions()
                .recv_timeout(Duration::from_secs(5))
                .expect("cycle did not finish");
            self.host.on_cycle_complete(outcome);
        }
    }

    fn pushes(frames: Vec<Frame>) -> Vec<PushUpdate> {
        frames
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Push(update) => Some(update),
                Frame::Response(_) => None,
            })
            .collect()
    }

    fn push_kind(update: &PushUpdate) -> &str {
        match update {
            PushUpdate::Typed { kind, .. } => kind,
            PushUpdate::Legacy(_) => "legacy",
        }
    }

    #[test]
    fn symbol_deleted_mid_cycle_is_neither_stored_nor_pushed() {
        let (provider, release) = GatedProvider::new();
        let mut h = Harness::new(provider.clone(), MemoryStore::new(), RefreshMode::Watchlist);
        h.host.start();
        assert_eq!(h.host.scheduler.state(), RefreshState::Refreshing);

        let response = h.request("DELETE", json!({"index": 1}));
        assert_eq!(response.result, Some(json!(["A.NS", "C.NS"])));
        assert_eq!(
            pushes(h.frames()),
            vec![PushUpdate::Legacy(vec!["A".into(), "C".into()])]
        );

        for _ in 0..3 {
            release.send(()).unwrap();
        }
        h.finish_cycle();

        assert_eq!(provider.calls(), 3);
        assert_eq!(
            pushes(h.frames()),
            vec![PushUpdate::Legacy(vec![
                "A: ₹10.00 (+11.11%)".into(),
                "C: ₹10.00 (+11.11%)".into(),
            ])]
        );
        let stored: Vec<Symbol> = h.host.repo.last_quotes().into_iter().map(|q| q.symbol).collect();
        assert_eq!(stored, vec![sym("a"), sym("c")]);
    }

    #[test]
    fn active_symbol_changed_mid_cycle_shows_no_data() {
        let (provider, release) = GatedProvider::new();
        let mut h = Harness::new(provider, MemoryStore::new(), RefreshMode::Single);
        h.host.start();

        assert!(!h.request("SET_CONFIG", json!({"activeSymbol": "infy"})).is_error());
        release.send(()).unwrap();
        h.finish_cycle();

        assert_eq!(pushes(h.frames()), vec![PushUpdate::Legacy(vec![])]);
        assert!(h.host.repo.last_quotes().is_empty());
    }

    #[test]
    fn spot_fetch_in_watchlist_mode_keeps_the_list() {
        let provider = TableProvider::with_prices(&[("a", 1.0), ("b", 2.0), ("c", 3.0), ("z", 9.0)]);
        let mut h = Harness::with_format(
            Arc::new(provider),
            MemoryStore::new(),
            RefreshMode::Watchlist,
            PushFormat::Typed,
        );
        h.host.start();
        h.finish_cycle();
        h.frames();

        let response = h.request("FETCH_SYMBOL", json!({"symbol": "z"}));
        assert_eq!(response.result, Some(json!("accepted")));
        h.finish_cycle();

        let stored: Vec<Symbol> = h.host.repo.last_quotes().into_iter().map(|q| q.symbol).collect();
        assert_eq!(stored, vec![sym("a"), sym("b"), sym("c")]);
        assert_eq!(h.host.repo.spot_quote().map(|q| q.symbol), Some(sym("z")));
        let kinds: Vec<String> = pushes(h.frames()).iter().map(|p| push_kind(p).to_string()).collect();
        assert_eq!(kinds, vec![KIND_STOCK_UPDATE.to_string()]);

        let quotes = h.request("GET_QUOTES", Value::Null).result.unwrap();
        assert_eq!(quotes["stockData"]["symbol"], "Z.NS");
        assert_eq!(quotes["quotes"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn spot_fetch_is_not_pushed_to_legacy_displays() {
        let provider = TableProvider::with_prices(&[("z", 9.0)]);
        let mut h = Harness::new(Arc::new(provider), MemoryStore::new(), RefreshMode::Watchlist);
        h.host.scheduler.start();

        h.request("FETCH_SYMBOL", json!({"symbol": "z"}));
        h.finish_cycle();

        assert!(pushes(h.frames()).is_empty());
        assert!(h.host.repo.last_update().is_none());
    }

    #[test]
    fn fetch_many_stores_a_separate_batch() {
        let provider = Arc::new(TableProvider::with_prices(&[("z", 9.0)]));
        let mut h = Harness::with_format(
            provider.clone(),
            MemoryStore::new(),
            RefreshMode::Watchlist,
            PushFormat::Typed,
        );
        h.host.scheduler.start();

        assert!(h.request("FETCH_MANY", json!({"symbols": []})).is_error());
        assert!(h.request("FETCH_MANY", json!({"symbols": ["z", " "]})).is_error());
        let response = h.request("FETCH_MULTIPLE_STOCKS", json!({"symbols": ["z", "nope"]}));
        assert_eq!(response.result, Some(json!("accepted")));
        h.finish_cycle();

        assert_eq!(provider.call_count(), 2);
        let batch: Vec<Symbol> = h.host.repo.batch_quotes().into_iter().map(|q| q.symbol).collect();
        assert_eq!(batch, vec![sym("z")]);
        assert!(h.host.repo.last_quotes().is_empty());
        let kinds: Vec<String> = pushes(h.frames()).iter().map(|p| push_kind(p).to_string()).collect();
        assert_eq!(kinds, vec![KIND_STOCKS_UPDATE.to_string()]);
    }

    #[test]
    fn get_config_reports_running_interval_when_unset() {
        let mut h = Harness::new(
            Arc::new(TableProvider::default()),
            MemoryStore::new(),
            RefreshMode::Single,
        );
        let config = h.request("GET_CONFIG", Value::Null).result.unwrap();
        assert_eq!(config["refreshIntervalMs"], 3_600_000);
        assert!(h.host.repo.configuration().refresh_interval_ms.is_none());
    }

    #[test]
    fn partial_failure_pushes_available_quotes_in_order() {
        let provider = TableProvider::with_prices(&[("a", 101.0), ("c", 103.0)]);
        let mut h = Harness::new(Arc::new(provider), MemoryStore::new(), RefreshMode::Watchlist);

        h.host.start();
        h.finish_cycle();

        assert_eq!(
            pushes(h.frames()),
            vec![PushUpdate::Legacy(vec![
                "A: ₹101.00 (+1.00%)".to_string(),
                "C: ₹103.00 (+3.00%)".to_string(),
            ])]
        );
        let stored: Vec<Symbol> = h.host.repo.last_quotes().into_iter().map(|q| q.symbol).collect();
        assert_eq!(stored, vec![sym("a"), sym("c")]);
    }

    #[test]
    fn all_unavailable_still_pushes_empty_list() {
        let mut h = Harness::new(
            Arc::new(TableProvider::default()),
            MemoryStore::new(),
            RefreshMode::Watchlist,
        );
        h.host.start();
        h.finish_cycle();
        assert_eq!(pushes(h.frames()), vec![PushUpdate::Legacy(vec![])]);
        assert!(h.host.repo.last_update().is_some());
    }

    #[test]
    fn refresh_now_while_refreshing_has_no_effect() {
        let (provider, release) = GatedProvider::new();
        let mut h = Harness::new(provider.clone(), MemoryStore::new(), RefreshMode::Single);
        h.host.start();
        assert_eq!(h.host.scheduler.state(), RefreshState::Refreshing);

        let response = h.request("REFRESH_NOW", Value::Null);
        assert_eq!(response.result, Some(json!("accepted")));

        release.send(()).unwrap();
        h.finish_cycle();
        assert_eq!(provider.calls(), 1);
        assert_eq!(pushes(h.frames()).len(), 1);
        assert!(
            h.host
                .scheduler
                .completions()
                .recv_timeout(Duration::from_millis(100))
                .is_err()
        );
    }

    #[test]
    fn add_normalizes_and_get_list_returns_it() {
        let provider = TableProvider::with_prices(&[("tcs", 3500.0)]);
        let mut h = Harness::new(
            Arc::new(provider),
            MemoryStore::with_entry(KEY_WATCHLIST, "[]"),
            RefreshMode::Watchlist,
        );
        h.host.start();
        h.finish_cycle();
        h.frames();

        let added = h.request("ADD", json!({"symbol": "tcs"}));
        assert_eq!(added.result, Some(json!(["TCS.NS"])));
        assert!(pushes(h.frames()).contains(&PushUpdate::Legacy(vec!["TCS".into()])));

        let list = h.request("GET_LIST", Value::Null);
        assert_eq!(list.result.unwrap()["watchlist"], json!(["TCS.NS"]));

        // The mutation also triggered a refresh of the new list.
        h.finish_cycle();
        assert_eq!(
            pushes(h.frames()),
            vec![PushUpdate::Legacy(vec!["TCS: ₹3500.00 (+3400.00%)".into()])]
        );
    }

    #[test]
    fn delete_out_of_range_is_rejected_without_push() {
        let mut h = Harness::new(
            Arc::new(TableProvider::default()),
            MemoryStore::new(),
            RefreshMode::Single,
        );
        let response = h.request("DELETE", json!({"index": 9}));
        assert!(response.error.unwrap().contains("out of range"));
        assert!(pushes(h.frames()).is_empty());

        let response = h.request("DELETE", json!({"index": 1}));
        assert_eq!(response.result, Some(json!(["A.NS", "C.NS"])));
        assert_eq!(pushes(h.frames()), vec![PushUpdate::Legacy(vec!["A".into(), "C".into()])]);
    }

    #[test]
    fn set_config_rejects_empty_symbol() {
        let store = MemoryStore::new();
        let mut h = Harness::new(Arc::new(TableProvider::default()), store, RefreshMode::Single);
        let response = h.request("SET_CONFIG", json!({"activeSymbol": ""}));
        assert!(response.is_error());
        assert_eq!(h.host.repo.configuration().active_symbol, None);
    }

    #[test]
    fn set_config_in_single_mode_refreshes_new_symbol() {
        let provider = Arc::new(TableProvider::with_prices(&[("infy", 1500.0)]));
        let mut h = Harness::new(provider.clone(), MemoryStore::new(), RefreshMode::Single);
        h.host.scheduler.start();

        let response = h.request("SET_CONFIG", json!({"activeSymbol": "infy"}));
        assert_eq!(response.result.unwrap()["activeSymbol"], "INFY.NS");
        h.finish_cycle();

        assert_eq!(*provider.calls.lock().unwrap(), vec![sym("infy")]);
        let get = h.request("GET_CONFIG", Value::Null);
        assert_eq!(get.result.unwrap()["activeSymbol"], "INFY.NS");
    }

    #[test]
    fn fetch_symbol_goes_through_the_gate() {
        let (provider, release) = GatedProvider::new();
        let mut h = Harness::new(provider.clone(), MemoryStore::new(), RefreshMode::Watchlist);
        h.host.scheduler.start();

        assert_eq!(h.request("FETCH_SYMBOL", json!({"symbol": "wipro"})).result, Some(json!("accepted")));
        assert_eq!(h.request("FETCH_SYMBOL", Value::Null).result, Some(json!("accepted")));
        assert!(h.request("FETCH_SYMBOL", json!({"symbol": " "})).is_error());

        release.send(()).unwrap();
        h.finish_cycle();
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn no_push_after_stop() {
        let (provider, release) = GatedProvider::new();
        let mut h = Harness::new(provider, MemoryStore::new(), RefreshMode::Single);
        h.host.start();
        h.host.stop();

        release.send(()).unwrap();
        h.finish_cycle();

        assert!(pushes(h.frames()).is_empty());
        assert!(h.host.repo.last_update().is_none());
    }

    #[test]
    fn corrupt_watchlist_restarts_with_defaults() {
        let store = MemoryStore::with_entry(KEY_WATCHLIST, "{not json");
        let mut h = Harness::new(Arc::new(TableProvider::default()), store, RefreshMode::Watchlist);
        let list = h.request("GET_LIST", Value::Null);
        assert_eq!(list.result.unwrap()["watchlist"], json!(["A.NS", "B.NS", "C.NS"]));
    }

    #[test]
    fn run_loop_answers_and_shuts_down() {
        let provider = TableProvider::with_prices(&[("reliance", 2500.0)]);
        let h = Harness::new(Arc::new(provider), MemoryStore::new(), RefreshMode::Single);
        let display = h.display.clone();
        let reply_tx = h.reply_tx.clone();
        let (events_tx, events_rx) = unbounded();
        let (shutdown_tx, shutdown_rx) = unbounded();
        let worker = std::thread::spawn(move || h.host.run(events_rx, shutdown_rx));

        let push = display.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            push,
            Frame::Push(PushUpdate::Legacy(vec!["RELIANCE: ₹2500.00 (+2400.00%)".into()]))
        );

        events_tx
            .send(BusEvent::Request {
                request: Request::new(1, ticker_common::Method::GetQuotes, Value::Null),
                reply_to: reply_tx,
            })
            .unwrap();
        match display.recv_timeout(Duration::from_secs(5)).unwrap() {
            Frame::Response(response) => assert_eq!(response.id, 1),
            other => panic!("unexpected frame {:?}", other),
        }

        shutdown_tx.send(()).unwrap();
        worker.join().unwrap();
    }

    #[test]
    fn store_is_reread_for_every_command() {
        let store = MemoryStore::new();
        store.set(KEY_WATCHLIST, r#"["ITC.NS"]"#).unwrap();
        let mut h = Harness::new(Arc::new(TableProvider::default()), store, RefreshMode::Single);
        let list = h.request("GET_LIST", Value::Null);
        assert_eq!(list.result.unwrap()["watchlist"], json!(["ITC.NS"]));
    }
}
