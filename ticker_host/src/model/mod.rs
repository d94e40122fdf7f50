//! Domain models and the refresh machinery of the host.
//!
//! - `store`: persisted key/value state and its typed `Repository`.
//! - `provider`: quote providers (the Yahoo chart API and the provider trait).
//! - `fetch`: fetch client with paced or parallel fan-out.
//! - `scheduler`: refresh timer and the single Idle/Refreshing gate.
//! - `push`: formatting of host state into display pushes.

pub mod fetch;
pub mod provider;
pub mod push;
pub mod scheduler;
pub mod store;
