//! Scheduled batch jobs: monthly credit activation and challenge prize
//! distribution.
//!
//! The jobs are plain async functions over injected store/ledger seams
//! so the API server can trigger them from its cron endpoints and the
//! worker binary can run them on an interval, while tests drive them
//! against in-memory fakes.

pub mod jobs;
pub mod store;
