#![no_main]

use libfuzzer_sys::fuzz_target;
use nymgraph::config::AppConfig;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as config.json must either parse or fail cleanly
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(config) = serde_json::from_str::<AppConfig>(s)
    {
        let _ = config.preferences.poll_interval();
        let _ = config.preferences.connect_timeout();
    }
});
