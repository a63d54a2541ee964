//! Connection monitoring module
//!
//! This module provides the background poll loop that keeps every
//! pseudonym connected to its mixnet client.
//!
//! # Overview
//!
//! The connection monitor provides:
//! - **Background polling** at the configured interval (1 second by default)
//! - **Parallel ticks**: every pseudonym is checked concurrently and the tick
//!   waits for all of them before sleeping
//! - **Prompt shutdown**: `stop()` is honoured within a fraction of the interval
//!
//! # Example Usage
//!
//! ```no_run
//! use nymgraph::monitor::ConnectionMonitor;
//! # fn run(controller: std::sync::Arc<nymgraph::controller::AppController>) {
//! let monitor = ConnectionMonitor::new(controller);
//! let handle = monitor.start();
//! // ...
//! monitor.stop();
//! handle.join().ok();
//! # }
//! ```

pub mod connection_monitor;

pub use connection_monitor::ConnectionMonitor;
