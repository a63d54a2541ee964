//! Application logic controller module
//!
//! This module holds the application object of the chat shell.
//!
//! # Overview
//!
//! The application controller is the central coordinator that:
//! - **Tracks pseudonyms** loaded from the pseudonym store
//! - **Keeps one chat session per pseudonym**, each with its own mixnet client connection
//! - **Owns the tray menu model** and publishes it to the GUI when it changes
//! - **Handles GUI callbacks** for chat windows and the settings window
//! - **Persists incoming messages** reported by listener threads
//!
//! # Architecture
//!
//! - `AppController`: Main controller, shared as `Arc<AppController>`
//! - `ChatSession`: Connection and window state of one pseudonym
//! - `TrayMenu`: Chat items followed by a separator and "Settings"
//! - `GuiEvent`: Requests sent to the GUI thread
//!
//! # Event Flow
//!
//! ```text
//! ConnectionMonitor ── update() ──► AppController ──► dial / listen_and_serve
//!                                        ▲   │
//!           NymClient listener ──────────┘   └──► GuiEvent → GUI
//!           (ConnectionEvent)
//! ```
//!
//! # Menu Item Rules
//!
//! 1. A pseudonym seen for the first time gets a session and a disabled item
//!    at the top of the menu.
//! 2. The item is enabled once dial and listen succeed, and disabled again
//!    whenever either fails.
//! 3. Clicking a disabled item does nothing; clicking a checked item focuses
//!    its window.

pub mod app_controller;
pub mod events;
pub mod menu;
pub mod session;

pub use app_controller::AppController;
pub use events::{ChatView, GuiEvent, SettingsView};
pub use menu::{ChatMenuItem, MenuEntry, TrayMenu};
pub use session::ChatSession;
