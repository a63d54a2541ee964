//! Mixnet client connections
//!
//! Every pseudonym talks to its own `nym-client` process over a websocket.
//! The controller only sees the [`MixnetConnection`] trait, created through a
//! [`ConnectionFactory`], so the poll loop can be driven without a running
//! mixnet client.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► dial ──► listen_and_serve ──► (online) ──► socket closed ──► on_close
//!              ▲                                                            │
//!              └──────────────── next poll tick ◄───────────────────────────┘
//! ```

pub mod client;
pub mod protocol;

pub use client::{NymClient, NymClientFactory, NymClientOptions};
pub use protocol::{ChatEnvelope, ClientRequest, ServerResponse};

use crate::entity::Pseudonym;
use crate::error::Result;
use std::sync::Arc;
use uuid::Uuid;

/// Callback fired once when an online connection goes away
pub type CloseCallback = Box<dyn Fn() + Send + Sync>;

/// A connection to one mixnet client
pub trait MixnetConnection: Send + Sync {
    /// Whether the websocket is currently open
    fn is_online(&self) -> bool;

    /// Open the websocket. A no-op when already online.
    fn dial(&self) -> Result<()>;

    /// Start delivering incoming frames. Requires an online connection;
    /// calling it again while listening is a no-op.
    fn listen_and_serve(&self) -> Result<()>;

    /// Our own Nym address, once the mixnet client has reported it
    fn self_address(&self) -> Option<String>;

    /// Send `text` to a recipient address
    fn send(&self, recipient: &str, text: &str) -> Result<()>;

    /// Answer an anonymous sender through its sender tag
    fn reply(&self, sender_tag: &str, text: &str) -> Result<()>;

    /// Install the close callback, replacing any previous one
    fn set_on_close(&self, callback: CloseCallback);

    /// Close the websocket without firing the close callback
    fn close(&self);
}

/// Creates connections for pseudonyms
pub trait ConnectionFactory: Send + Sync {
    /// New, not yet dialled, connection for `pseudonym`
    fn create(&self, pseudonym: &Pseudonym) -> Arc<dyn MixnetConnection>;
}

/// Events raised by listener threads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The mixnet client reported our address
    SelfAddress {
        /// Pseudonym owning the connection
        pseudonym_id: Uuid,
        /// Reported address
        address: String,
    },
    /// A message arrived
    Received {
        /// Pseudonym owning the connection
        pseudonym_id: Uuid,
        /// Decoded message body
        text: String,
        /// Reply handle, if any
        sender_tag: Option<String>,
    },
    /// The mixnet client rejected a request
    Error {
        /// Pseudonym owning the connection
        pseudonym_id: Uuid,
        /// Reason given by the mixnet client
        message: String,
    },
}
