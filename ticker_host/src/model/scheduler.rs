//! Refresh scheduler.
//!
//! The scheduler owns the refresh timer and the single `Idle`/`Refreshing` gate that every
//! trigger path goes through (timer, manual commands, configuration changes). A trigger
//! that arrives while a cycle is in flight is dropped, not queued, so cycles never overlap.
//!
//! A cycle runs on its own worker thread and reports back through `completions()`; the
//! host loop hands the outcome to `complete`, which reopens the gate. Outcomes are tagged
//! with a generation number, and once `stop` has been called they are discarded so nothing
//! is persisted or pushed after shutdown.
//!
//! Default cadences: 30 s when tracking a single symbol, 120 s for a whole watchlist.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, never, tick, unbounded};
use log::{debug, error, info};
use ticker_common::{QuoteResult, Symbol};

use crate::model::fetch::FetchClient;

/// Timer cadence when only the active symbol is tracked.
pub const DEFAULT_SINGLE_INTERVAL: Duration = Duration::from_secs(30);
/// Timer cadence when the whole watchlist is tracked.
pub const DEFAULT_WATCHLIST_INTERVAL: Duration = Duration::from_secs(120);

/// The gate shared by every trigger path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No cycle in flight; the next trigger starts one.
    Idle,
    /// A cycle is in flight; triggers are dropped.
    Refreshing,
}

/// What set a cycle off.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Timer,
    Manual,
    ConfigChange,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Startup => "startup",
            Trigger::Timer => "timer",
            Trigger::Manual => "manual",
            Trigger::ConfigChange => "config change",
        };
        f.write_str(name)
    }
}

/// Symbols a cycle fetches, resolved when the cycle is triggered, and where its results
/// belong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTarget {
    /// The symbols on the display: the watchlist, or the active symbol in single mode.
    Display(Vec<Symbol>),
    /// One symbol fetched on demand, kept apart from the display list.
    Spot(Symbol),
    /// An ad-hoc list fetched on demand, kept apart from the display list.
    Batch(Vec<Symbol>),
}

impl RefreshTarget {
    /// Symbols to fetch, in display order.
    pub fn symbols(&self) -> Vec<Symbol> {
        match self {
            RefreshTarget::Display(symbols) | RefreshTarget::Batch(symbols) => symbols.clone(),
            RefreshTarget::Spot(symbol) => vec![symbol.clone()],
        }
    }
}

/// Result of one cycle, sent from the worker back to the host loop.
#[derive(Debug)]
pub struct CycleOutcome {
    /// Number the scheduler gave the cycle when it started.
    pub generation: u64,
    /// What started the cycle.
    pub trigger: Trigger,
    /// What the cycle fetched, as resolved at trigger time.
    pub target: RefreshTarget,
    /// One entry per fetched symbol, in target order.
    pub results: Vec<(Symbol, QuoteResult)>,
}

/// Owns the refresh timer and the Idle/Refreshing gate.
pub struct RefreshScheduler {
    fetch: FetchClient,
    interval: Duration,
    timer: Receiver<Instant>,
    running: bool,
    generation: u64,
    in_flight: Option<u64>,
    done_tx: Sender<CycleOutcome>,
    done_rx: Receiver<CycleOutcome>,
}

impl RefreshScheduler {
    /// Creates a stopped scheduler; `interval` is fixed until the scheduler is rebuilt.
    pub fn new(fetch: FetchClient, interval: Duration) -> Self {
        let (done_tx, done_rx) = unbounded();
        RefreshScheduler {
            fetch,
            interval,
            timer: never(),
            running: false,
            generation: 0,
            in_flight: None,
            done_tx,
            done_rx,
        }
    }

    /// Arms the recurring timer.
    pub fn start(&mut self) {
        self.timer = tick(self.interval);
        self.running = true;
        info!(
            "Refresh scheduler started: every {:?}, fetch mode {:?}",
            self.interval,
            self.fetch.mode()
        );
    }

    /// Disarms the timer. A cycle still in flight runs to completion but its outcome is
    /// discarded.
    pub fn stop(&mut self) {
        self.timer = never();
        self.running = false;
        info!("Refresh scheduler stopped");
    }

    /// `Refreshing` while a cycle is in flight.
    pub fn state(&self) -> RefreshState {
        if self.in_flight.is_some() {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Cadence the timer was built with.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks while running; never fires once stopped.
    pub fn timer(&self) -> &Receiver<Instant> {
        &self.timer
    }

    /// Outcomes of finished cycles, to be handed back to `complete`.
    pub fn completions(&self) -> &Receiver<CycleOutcome> {
        &self.done_rx
    }

    /// Starts a cycle for `target` if the gate is open. Returns whether a cycle started.
    pub fn trigger(&mut self, target: RefreshTarget, trigger: Trigger) -> bool {
        if !self.running {
            debug!("Ignoring {} trigger: scheduler stopped", trigger);
            return false;
        }
        if let Some(generation) = self.in_flight {
            debug!(
                "Dropping {} trigger: cycle #{} still refreshing",
                trigger, generation
            );
            return false;
        }

        self.generation += 1;
        let generation = self.generation;
        let symbols = target.symbols();
        let fetch = self.fetch.clone();
        let done_tx = self.done_tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("refresh-{}", generation))
            .spawn(move || {
                let results = fetch.fetch_many(&symbols);
                let outcome = CycleOutcome {
                    generation,
                    trigger,
                    target,
                    results,
                };
                if done_tx.send(outcome).is_err() {
                    debug!("Cycle #{} finished after host shut down", generation);
                }
            });

        match spawned {
            Ok(_) => {
                info!("Refresh cycle #{} started ({})", generation, trigger);
                self.in_flight = Some(generation);
                true
            }
            Err(e) => {
                error!("Failed to spawn refresh cycle: {}", e);
                false
            }
        }
    }

    /// Closes out a cycle and reopens the gate.
    ///
    /// Returns the outcome only if it belongs to the cycle in flight and the scheduler is
    /// still running.
    pub fn complete(&mut self, outcome: CycleOutcome) -> Option<CycleOutcome> {
        if self.in_flight != Some(outcome.generation) {
            debug!("Ignoring stale outcome of cycle #{}", outcome.generation);
            return None;
        }
        self.in_flight = None;
        if !self.running {
            info!(
                "Discarding outcome of cycle #{}: scheduler stopped",
                outcome.generation
            );
            return None;
        }
        Some(outcome)
    }
}
