//! Messages from the controller to the GUI thread

use super::menu::TrayMenu;
use crate::config::UserPreferences;
use crate::entity::{Contact, HistoryEntry, Pseudonym};
use uuid::Uuid;

/// Everything a chat window displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatView {
    /// Pseudonym the window belongs to
    pub pseudonym_id: Uuid,
    /// Window title
    pub title: String,
    /// Our Nym address, once known
    pub self_address: Option<String>,
    /// Connection state
    pub online: bool,
    /// Address book of the pseudonym, sorted by alias
    pub contacts: Vec<Contact>,
    /// Sent and received messages, oldest first
    pub history: Vec<HistoryEntry>,
}

/// Everything the settings window displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsView {
    /// Configured pseudonyms
    pub pseudonyms: Vec<Pseudonym>,
    /// Current preferences
    pub preferences: UserPreferences,
}

/// Requests for the GUI thread
#[derive(Debug, Clone)]
pub enum GuiEvent {
    /// Render this menu
    MenuChanged(TrayMenu),
    /// Show a chat window with this content
    ShowChat(ChatView),
    /// Bring an already showing chat window to the front
    FocusChat(Uuid),
    /// Hide a chat window
    HideChat(Uuid),
    /// Refresh a showing chat window
    ChatUpdated(ChatView),
    /// Show the settings window
    ShowSettings(SettingsView),
    /// Refresh the settings window if it is showing
    SettingsUpdated(SettingsView),
    /// Show an error window with this text
    Error(String),
}
