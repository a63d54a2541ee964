//! `Nymgraph` - Desktop chat client for the Nym mixnet
//!
//! Each pseudonym talks to its own local nym-client over a websocket. A
//! `ConnectionMonitor` polls once a second so every pseudonym gets connected,
//! `AppController` keeps the tray menu and chat windows in step with the
//! connections, and `Service` persists pseudonyms, contacts and history as
//! JSON files in the data directory.

// Module declarations
pub mod config;
pub mod controller;
pub mod entity;
pub mod error;
pub mod monitor;
pub mod nym;
pub mod service;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use error::{NymgraphError, Result};
