//! Monitoring server for the claims assistant.
//!
//! [`monitor::SystemMonitor`] is the public monitoring API; the rest of the
//! crate wires it to configuration, interval timers, health probes, the
//! regional emergency feed and the HTTP dashboard.

pub mod api;
pub mod app;
pub mod config;
pub mod emergency;
pub mod health;
pub mod logging;
pub mod monitor;
pub mod probes;
pub mod rule_builder;
mod scheduler;
pub mod state;
