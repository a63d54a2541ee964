//! Error types for `Nymgraph`
//!
//! This module defines all error types used throughout the application,
//! providing clear error messages and proper error propagation.
//!
//! Variants that wrap a lower-level failure use `#[source]` so the full
//! error chain shows up in logs.

use thiserror::Error;
use uuid::Uuid;

/// Simple error type for wrapping string messages while implementing `std::error::Error`
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StringError(pub String);

impl StringError {
    /// Create a new `StringError` from a string message
    pub fn new(msg: impl Into<String>) -> Box<Self> {
        Box::new(Self(msg.into()))
    }
}

/// Main error type for `Nymgraph`
#[derive(Debug, Error)]
pub enum NymgraphError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Failure reading or writing one of the on-disk stores
    #[error("Storage error: {0}")]
    StorageError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Pseudonym fields failed validation
    #[error("Invalid pseudonym: {0}")]
    InvalidPseudonym(String),

    /// Another pseudonym already uses this name
    #[error("Pseudonym already exists: {0}")]
    DuplicatePseudonym(String),

    /// No pseudonym with this id
    #[error("Pseudonym not found: {0}")]
    PseudonymNotFound(Uuid),

    /// Contact fields failed validation
    #[error("Invalid contact: {0}")]
    InvalidContact(String),

    /// No contact with this id
    #[error("Contact not found: {0}")]
    ContactNotFound(Uuid),

    /// No stored message with this id
    #[error("Message not found: {0}")]
    MessageNotFound(Uuid),

    /// Refused to send an empty message
    #[error("Message is empty")]
    EmptyMessage,

    /// The message was received without a sender tag
    #[error("Message {0} cannot be replied to")]
    NoReplyHandle(Uuid),

    /// Could not reach the mixnet client
    #[error("Failed to connect to the mixnet client: {0}")]
    ConnectionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Operation needs an online connection
    #[error("Not connected to the mixnet client at {0}")]
    NotConnected(String),

    /// The mixnet client sent something we could not understand
    #[error("Mixnet client protocol error: {0}")]
    ProtocolError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for `Nymgraph` operations
pub type Result<T> = std::result::Result<T, NymgraphError>;

/// Convert an error to a user-friendly message
///
/// Returns text suitable for the error window, with a short hint on what
/// the user can do about it.
pub fn get_user_friendly_error(error: &NymgraphError) -> String {
    match error {
        NymgraphError::ConfigError(_) => "Failed to load or save configuration.\n\n\
             Your settings may not persist.\n\
             Check that the Nymgraph data directory is writable."
            .to_string(),
        NymgraphError::StorageError(e) => {
            format!(
                "Failed to read or write chat data:\n\n{e}\n\n\
                 Check file permissions and disk space."
            )
        }
        NymgraphError::InvalidPseudonym(reason) => format!("Invalid pseudonym: {reason}"),
        NymgraphError::DuplicatePseudonym(name) => {
            format!("A pseudonym named \"{name}\" already exists.\n\nPlease choose another name.")
        }
        NymgraphError::PseudonymNotFound(_) => "This pseudonym no longer exists.\n\n\
             It may have been deleted from the settings."
            .to_string(),
        NymgraphError::InvalidContact(reason) => format!("Invalid contact: {reason}"),
        NymgraphError::ContactNotFound(_) => "This contact no longer exists.".to_string(),
        NymgraphError::MessageNotFound(_) => {
            "The message you are replying to no longer exists.".to_string()
        }
        NymgraphError::EmptyMessage => "Type a message before sending.".to_string(),
        NymgraphError::NoReplyHandle(_) => "The sender of this message did not attach \
             reply SURBs.\n\nIt cannot be answered anonymously."
            .to_string(),
        NymgraphError::ConnectionFailed(e) => {
            format!(
                "Unable to reach the mixnet client:\n\n{e}\n\n\
                 Please ensure:\n\
                 - nym-client is running\n\
                 - The server address in the pseudonym settings is correct"
            )
        }
        NymgraphError::NotConnected(server) => {
            format!(
                "Not connected to the mixnet client at {server}.\n\n\
                 Nymgraph retries automatically every few seconds."
            )
        }
        NymgraphError::ProtocolError(msg) => {
            format!(
                "The mixnet client reported an error:\n\n{msg}\n\n\
                 Check that nym-client is up to date."
            )
        }
        NymgraphError::IoError(e) => {
            format!(
                "A file system error occurred:\n\n{e}\n\n\
                 Please check file permissions and disk space."
            )
        }
        NymgraphError::JsonError(e) => {
            format!(
                "A data file is corrupted:\n\n{e}\n\n\
                 The application will use default settings."
            )
        }
    }
}
