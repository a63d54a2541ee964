//! Configuration data models
//!
//! This module defines the data structures used for application configuration.
//! Pseudonyms and chat history are not part of the configuration; they live in
//! the stores under [`crate::storage`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lower bound for the connection poll interval
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
/// Upper bound for the connection poll interval
pub const MAX_POLL_INTERVAL_MS: u64 = 10_000;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// User preferences
    pub preferences: UserPreferences,
    /// Window state for persistence
    pub window_state: WindowState,
}

/// User preferences and settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Wipe sent and received messages when the application quits
    pub delete_history_after_quit: bool,
    /// How often every pseudonym's connection is checked, in milliseconds (250-10000)
    pub poll_interval_ms: u64,
    /// TCP connect and websocket handshake timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Reply SURBs attached to each anonymous message
    pub reply_surbs: u32,
}

/// Window state for position and size persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowState {
    /// X position
    pub x: i32,
    /// Y position
    pub y: i32,
    /// Window width
    pub width: u32,
    /// Window height
    pub height: u32,
}

impl UserPreferences {
    /// Poll interval clamped to the supported range
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        )
    }

    /// Connect timeout, never zero
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            delete_history_after_quit: false,
            poll_interval_ms: 1000,
            connect_timeout_ms: 3000,
            reply_surbs: 10,
        }
    }
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 480,
            height: 600,
        }
    }
}
