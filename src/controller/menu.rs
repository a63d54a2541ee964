//! Tray menu model
//!
//! The controller owns a [`TrayMenu`] and publishes a copy to the GUI every
//! time it changes. The GUI renders it as a native tray menu where one is
//! available and as a list in the main window otherwise.

use crate::entity::Pseudonym;
use uuid::Uuid;

/// One chat entry of the tray menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMenuItem {
    /// Pseudonym whose chat window this item opens
    pub pseudonym_id: Uuid,
    /// Pseudonym name
    pub label: String,
    /// Clickable only once the connection is up
    pub enabled: bool,
    /// The chat window is showing
    pub checked: bool,
    /// Messages received while the chat window was closed
    pub unread: usize,
}

impl ChatMenuItem {
    /// Disabled, unchecked item for a pseudonym
    pub fn new(pseudonym: &Pseudonym) -> Self {
        Self {
            pseudonym_id: pseudonym.id,
            label: pseudonym.name.clone(),
            enabled: false,
            checked: false,
            unread: 0,
        }
    }

    /// Text shown in the menu, with the unread count when there is one
    pub fn display_label(&self) -> String {
        if self.unread == 0 {
            self.label.clone()
        } else {
            format!("{} ({})", self.label, self.unread)
        }
    }
}

/// An entry of the tray menu, in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    /// Opens a chat window
    Chat(ChatMenuItem),
    /// Visual separator
    Separator,
    /// Opens the settings window
    Settings,
}

/// Tray menu: chat items first, newest on top, then separator and "Settings"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrayMenu {
    entries: Vec<MenuEntry>,
}

impl TrayMenu {
    /// Empty menu
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the separator and the "Settings" item, once
    pub fn append_settings(&mut self) {
        if self.entries.contains(&MenuEntry::Settings) {
            return;
        }
        self.entries.push(MenuEntry::Separator);
        self.entries.push(MenuEntry::Settings);
    }

    /// Insert a chat item at the top, replacing any item for the same pseudonym
    pub fn prepend_chat(&mut self, item: ChatMenuItem) {
        self.remove_chat(item.pseudonym_id);
        self.entries.insert(0, MenuEntry::Chat(item));
    }

    /// Remove the item of a pseudonym. Returns whether one was present.
    pub fn remove_chat(&mut self, pseudonym_id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(
            |entry| !matches!(entry, MenuEntry::Chat(item) if item.pseudonym_id == pseudonym_id),
        );
        self.entries.len() != before
    }

    /// Item of a pseudonym
    pub fn chat(&self, pseudonym_id: Uuid) -> Option<&ChatMenuItem> {
        self.chats().find(|item| item.pseudonym_id == pseudonym_id)
    }

    /// Mutable item of a pseudonym
    pub fn chat_mut(&mut self, pseudonym_id: Uuid) -> Option<&mut ChatMenuItem> {
        self.entries.iter_mut().find_map(|entry| match entry {
            MenuEntry::Chat(item) if item.pseudonym_id == pseudonym_id => Some(item),
            _ => None,
        })
    }

    /// Chat items in display order
    pub fn chats(&self) -> impl Iterator<Item = &ChatMenuItem> {
        self.entries.iter().filter_map(|entry| match entry {
            MenuEntry::Chat(item) => Some(item),
            _ => None,
        })
    }

    /// All entries in display order
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }
}
