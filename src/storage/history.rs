//! Sent and received message history

use crate::entity::{ReceivedMessage, SentMessage};
use crate::error::Result;
use crate::storage::json_store::{JsonStore, Record};
use chrono::Utc;
use uuid::Uuid;

/// Outgoing messages
pub type SentStore = JsonStore<SentMessage>;

/// Incoming messages and replies
pub type ReceivedStore = JsonStore<ReceivedMessage>;

impl Record for SentMessage {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for ReceivedMessage {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl JsonStore<SentMessage> {
    /// Persist a message that was just handed to the mixnet client
    pub fn record(
        &self,
        pseudonym_id: Uuid,
        contact_id: Option<Uuid>,
        recipient: &str,
        text: &str,
    ) -> Result<SentMessage> {
        let message = SentMessage {
            id: Uuid::new_v4(),
            pseudonym_id,
            contact_id,
            recipient: recipient.to_string(),
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        self.insert(message.clone())?;
        Ok(message)
    }

    /// Messages sent by one pseudonym
    pub fn for_pseudonym(&self, pseudonym_id: Uuid) -> Vec<SentMessage> {
        self.filter(|m| m.pseudonym_id == pseudonym_id)
    }

    /// Drop every message sent by one pseudonym
    pub fn delete_for_pseudonym(&self, pseudonym_id: Uuid) -> Result<usize> {
        self.retain(|m| m.pseudonym_id != pseudonym_id)
    }
}

impl JsonStore<ReceivedMessage> {
    /// Persist an incoming message
    pub fn record(
        &self,
        pseudonym_id: Uuid,
        sender_tag: Option<String>,
        text: &str,
    ) -> Result<ReceivedMessage> {
        let message = ReceivedMessage {
            id: Uuid::new_v4(),
            pseudonym_id,
            sender_tag,
            text: text.to_string(),
            received_at: Utc::now(),
        };
        self.insert(message.clone())?;
        Ok(message)
    }

    /// Messages received by one pseudonym
    pub fn for_pseudonym(&self, pseudonym_id: Uuid) -> Vec<ReceivedMessage> {
        self.filter(|m| m.pseudonym_id == pseudonym_id)
    }

    /// Drop every message received by one pseudonym
    pub fn delete_for_pseudonym(&self, pseudonym_id: Uuid) -> Result<usize> {
        self.retain(|m| m.pseudonym_id != pseudonym_id)
    }
}
