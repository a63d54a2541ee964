//! Persistent stores
//!
//! Pseudonyms, contacts and message history are kept in separate JSON files
//! inside the data directory. [`JsonStore`] does the file handling; the typed
//! stores add validation and the queries the controller needs.

pub mod contacts;
pub mod history;
pub mod json_store;
pub mod pseudonyms;

pub use contacts::ContactStore;
pub use history::{ReceivedStore, SentStore};
pub use json_store::{JsonStore, Record};
pub use pseudonyms::PseudonymStore;
