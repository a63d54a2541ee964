#![no_main]

use libfuzzer_sys::fuzz_target;
use nymgraph::nym::{ChatEnvelope, ServerResponse};

fuzz_target!(|data: &[u8]| {
    // Frames from the mixnet client and the payloads inside them are untrusted
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(ServerResponse::Received { message, .. }) = ServerResponse::from_json(text) {
            let _ = ChatEnvelope::decode_text(&message);
        }
        let _ = ChatEnvelope::decode_text(text);
    }
});
