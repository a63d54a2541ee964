//! GUI module
//!
//! Slint windows (main, chat, settings, error) and, on Windows and macOS,
//! the system tray icon.

pub mod gui_controller;
#[cfg(any(windows, target_os = "macos"))]
pub mod tray;

pub use gui_controller::GuiController;
