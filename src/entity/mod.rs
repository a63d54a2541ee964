//! Domain records
//!
//! Plain serde records persisted by [`crate::storage`] and passed between the
//! controller and the GUI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named identity pointing at a mixnet client websocket endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pseudonym {
    /// Unique identifier
    pub id: Uuid,
    /// Display name, unique across pseudonyms
    pub name: String,
    /// Websocket URL of the mixnet client, e.g. `ws://127.0.0.1:1977`
    pub server: String,
}

impl Pseudonym {
    /// Create a pseudonym with a fresh id
    pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            server: server.into(),
        }
    }

    /// Title of the chat window opened for this pseudonym
    pub fn window_title(&self) -> String {
        format!("Connected - {} ({})", self.name, self.server)
    }
}

/// A recipient known to one pseudonym
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Unique identifier
    pub id: Uuid,
    /// Owning pseudonym
    pub pseudonym_id: Uuid,
    /// Local display name
    pub alias: String,
    /// Nym recipient address
    pub address: String,
}

/// A message handed to the mixnet client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    /// Unique identifier
    pub id: Uuid,
    /// Sending pseudonym
    pub pseudonym_id: Uuid,
    /// Contact the message went to, `None` for replies via sender tag
    pub contact_id: Option<Uuid>,
    /// Recipient address, or the sender tag for replies
    pub recipient: String,
    /// Message body
    pub text: String,
    /// When the message was sent
    pub sent_at: DateTime<Utc>,
}

/// A message delivered by the mixnet client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    /// Unique identifier
    pub id: Uuid,
    /// Receiving pseudonym
    pub pseudonym_id: Uuid,
    /// Anonymous reply handle, when the sender attached reply SURBs
    pub sender_tag: Option<String>,
    /// Message body
    pub text: String,
    /// When the message arrived
    pub received_at: DateTime<Utc>,
}

/// Direction of a [`HistoryEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Outgoing
    Sent,
    /// Incoming
    Received,
}

/// One line of a chat window's timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Id of the underlying sent or received message
    pub id: Uuid,
    /// Outgoing or incoming
    pub direction: Direction,
    /// Contact alias, recipient address or "anonymous"
    pub peer: String,
    /// Message body
    pub text: String,
    /// Timestamp
    pub at: DateTime<Utc>,
    /// Whether this entry can be answered with a reply
    pub can_reply: bool,
}

/// Merge sent and received messages into a single timeline, oldest first
pub fn build_history(
    sent: &[SentMessage],
    received: &[ReceivedMessage],
    contacts: &[Contact],
) -> Vec<HistoryEntry> {
    let alias_of = |contact_id: Option<Uuid>, fallback: &str| {
        contact_id
            .and_then(|id| contacts.iter().find(|c| c.id == id))
            .map_or_else(|| fallback.to_string(), |c| c.alias.clone())
    };

    let mut history: Vec<HistoryEntry> = sent
        .iter()
        .map(|m| HistoryEntry {
            id: m.id,
            direction: Direction::Sent,
            peer: alias_of(m.contact_id, "anonymous"),
            text: m.text.clone(),
            at: m.sent_at,
            can_reply: false,
        })
        .chain(received.iter().map(|m| HistoryEntry {
            id: m.id,
            direction: Direction::Received,
            peer: "anonymous".to_string(),
            text: m.text.clone(),
            at: m.received_at,
            can_reply: m.sender_tag.is_some(),
        }))
        .collect();

    history.sort_by_key(|entry| entry.at);
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_title() {
        let pseudonym = Pseudonym::new("alice", "ws://127.0.0.1:1977");
        assert_eq!(
            pseudonym.window_title(),
            "Connected - alice (ws://127.0.0.1:1977)"
        );
    }

    #[test]
    fn test_build_history_orders_and_labels_entries() {
        let pseudonym_id = Uuid::new_v4();
        let contact = Contact {
            id: Uuid::new_v4(),
            pseudonym_id,
            alias: "bob".to_string(),
            address: "bob.addr@gateway".to_string(),
        };
        let sent = vec![SentMessage {
            id: Uuid::new_v4(),
            pseudonym_id,
            contact_id: Some(contact.id),
            recipient: contact.address.clone(),
            text: "second".to_string(),
            sent_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }];
        let received = vec![
            ReceivedMessage {
                id: Uuid::new_v4(),
                pseudonym_id,
                sender_tag: Some("tag".to_string()),
                text: "first".to_string(),
                received_at: Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap(),
            },
            ReceivedMessage {
                id: Uuid::new_v4(),
                pseudonym_id,
                sender_tag: None,
                text: "third".to_string(),
                received_at: Utc.with_ymd_and_hms(2024, 1, 1, 13, 0, 0).unwrap(),
            },
        ];

        let history = build_history(&sent, &received, &[contact]);
        let texts: Vec<&str> = history.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(history[1].peer, "bob");
        assert_eq!(history[1].direction, Direction::Sent);
        assert!(history[0].can_reply);
        assert!(!history[2].can_reply);
    }
}
