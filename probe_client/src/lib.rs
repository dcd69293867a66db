//! Market-data front latency probe
//!
//! Connects to one market-data front, times the login round trip, subscribes to a
//! fixed set of instruments and prints every quote that arrives.
//!
//! # Modules
//!
//! - `api`: session and observer traits, request handle, status and reason codes
//! - `transport`: WebSocket session running callbacks on a dedicated dispatch thread
//! - `protocol`: front message construction and parsing
//! - `probe`: the observer that prints status, login latency and quotes
//! - `runner`: probe lifecycle from connect to the manual exit trigger
//! - `tracker`: login timing and quote arrival statistics
//! - `endpoint`, `config`, `console`, `cli`: startup plumbing

pub mod api;
pub mod cli;
pub mod config;
pub mod console;
pub mod endpoint;
pub mod probe;
pub mod protocol;
pub mod runner;
pub mod tracker;
pub mod transport;

// Re-export main types for convenience
pub use api::{MdApi, MdSpi, RequestHandle};
pub use config::Config;
pub use console::Console;
pub use endpoint::Endpoint;
pub use probe::LatencyProbe;
pub use runner::{Keypress, LatencyProbeClient, ShutdownSignal};
pub use transport::WsMdApi;
