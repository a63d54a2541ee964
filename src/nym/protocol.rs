//! Mixnet client websocket protocol
//!
//! `nym-client` exchanges JSON text frames tagged by a `type` field. Only the
//! requests and responses Nymgraph needs are modelled; anything else coming
//! from the client is reported as [`ServerResponse::Unknown`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Frames sent to the mixnet client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientRequest {
    /// Ask for our own Nym address
    SelfAddress,
    /// Send a message to a recipient address, attaching reply SURBs
    #[serde(rename_all = "camelCase")]
    SendAnonymous {
        /// Payload, an encoded [`ChatEnvelope`]
        message: String,
        /// Nym address of the recipient
        recipient: String,
        /// Number of reply SURBs to attach
        reply_surbs: u32,
    },
    /// Answer an anonymous sender through its sender tag
    #[serde(rename_all = "camelCase")]
    Reply {
        /// Payload, an encoded [`ChatEnvelope`]
        message: String,
        /// Tag received with the original message
        sender_tag: String,
    },
}

/// Frames received from the mixnet client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerResponse {
    /// Our own Nym address
    SelfAddress {
        /// Address other clients use to reach us
        address: String,
    },
    /// A message from the mixnet
    #[serde(rename_all = "camelCase")]
    Received {
        /// Raw payload
        message: String,
        /// Present when the sender attached reply SURBs
        #[serde(default)]
        sender_tag: Option<String>,
    },
    /// The client rejected a request
    Error {
        /// Human-readable reason
        message: String,
    },
    /// Any other frame type
    #[serde(other)]
    Unknown,
}

impl ClientRequest {
    /// Serialize to a text frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ServerResponse {
    /// Parse a text frame
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Chat payload carried inside a mixnet message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    /// Message body
    pub text: String,
    /// Sender's clock when the message was written
    pub sent_at: DateTime<Utc>,
}

impl ChatEnvelope {
    /// Envelope stamped with the current time
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    /// Encode as the payload of a `sendAnonymous` or `reply` request
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Extract the message body from a received payload
    ///
    /// Payloads from other clients are not necessarily envelopes; those are
    /// shown as-is.
    pub fn decode_text(payload: &str) -> String {
        serde_json::from_str::<Self>(payload).map_or_else(|_| payload.to_string(), |e| e.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn as_value(request: &ClientRequest) -> Value {
        serde_json::from_str(&request.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_self_address_request_shape() {
        assert_eq!(
            as_value(&ClientRequest::SelfAddress),
            json!({"type": "selfAddress"})
        );
    }

    #[test]
    fn test_send_anonymous_request_shape() {
        let request = ClientRequest::SendAnonymous {
            message: "payload".to_string(),
            recipient: "bob.addr@gateway".to_string(),
            reply_surbs: 10,
        };
        assert_eq!(
            as_value(&request),
            json!({
                "type": "sendAnonymous",
                "message": "payload",
                "recipient": "bob.addr@gateway",
                "replySurbs": 10
            })
        );
    }

    #[test]
    fn test_reply_request_shape() {
        let request = ClientRequest::Reply {
            message: "payload".to_string(),
            sender_tag: "tag123".to_string(),
        };
        assert_eq!(
            as_value(&request),
            json!({"type": "reply", "message": "payload", "senderTag": "tag123"})
        );
    }

    #[test]
    fn test_parse_responses() {
        assert_eq!(
            ServerResponse::from_json(r#"{"type":"selfAddress","address":"me@gw"}"#).unwrap(),
            ServerResponse::SelfAddress {
                address: "me@gw".to_string()
            }
        );
        assert_eq!(
            ServerResponse::from_json(r#"{"type":"received","message":"hi","senderTag":"t"}"#)
                .unwrap(),
            ServerResponse::Received {
                message: "hi".to_string(),
                sender_tag: Some("t".to_string())
            }
        );
        assert_eq!(
            ServerResponse::from_json(r#"{"type":"received","message":"hi"}"#).unwrap(),
            ServerResponse::Received {
                message: "hi".to_string(),
                sender_tag: None
            }
        );
        assert_eq!(
            ServerResponse::from_json(r#"{"type":"error","message":"bad recipient"}"#).unwrap(),
            ServerResponse::Error {
                message: "bad recipient".to_string()
            }
        );
        assert_eq!(
            ServerResponse::from_json(r#"{"type":"lane_queue_length","lane":1,"queueLength":0}"#)
                .unwrap(),
            ServerResponse::Unknown
        );
        assert!(ServerResponse::from_json("not json").is_err());
    }

    #[test]
    fn test_envelope_decode() {
        let encoded = ChatEnvelope::new("hello").encode().unwrap();
        assert_eq!(ChatEnvelope::decode_text(&encoded), "hello");
        assert_eq!(ChatEnvelope::decode_text("plain text"), "plain text");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: decoding never fails and returns raw text for non-envelopes
            #[test]
            fn decode_text_falls_back_to_payload(s in "[^{\\[]\\PC*") {
                prop_assert_eq!(ChatEnvelope::decode_text(&s), s);
            }

            /// Property: arbitrary input never panics the response parser
            #[test]
            fn response_parser_never_panics(s in "\\PC*") {
                let _ = ServerResponse::from_json(&s);
            }
        }
    }
}
