//! Recurring refresh of every query.
//!
//! One task per query fetches the full result set and merges it into the
//! query's state. A failed fetch leaves the previous available set in place
//! and waits for the next tick.

mod config;
mod runner;

pub use config::PollerConfig;
pub use runner::{poll_once, Poller};
