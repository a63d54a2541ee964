//! Application controller implementation
//!
//! This module implements the application object that owns the tray menu,
//! the open chat sessions and the service layer. The poll loop drives
//! [`AppController::update`], GUI callbacks call the chat and settings
//! operations, and listener threads feed [`ConnectionEvent`]s through
//! [`AppController::spawn_event_loop`].
//!
//! # Lock order
//!
//! `open_chats` may be held while taking `pseudonyms` or `menu`, and
//! `published_menu` while taking `menu`. No lock is held across a dial or a
//! websocket write.

use super::events::{ChatView, GuiEvent, SettingsView};
use super::menu::{ChatMenuItem, TrayMenu};
use super::session::ChatSession;
use crate::config::UserPreferences;
use crate::entity::{Contact, Pseudonym, SentMessage, build_history};
use crate::error::{NymgraphError, Result, get_user_friendly_error};
use crate::nym::ConnectionEvent;
use crate::service::Service;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use uuid::Uuid;

/// Application logic controller
pub struct AppController {
    /// Stores, configuration and connection factory
    service: Arc<Service>,
    /// Pseudonyms as last loaded from the store
    pseudonyms: Mutex<Vec<Pseudonym>>,
    /// One session per pseudonym id
    open_chats: Mutex<HashMap<Uuid, Arc<ChatSession>>>,
    /// Current tray menu
    menu: Mutex<TrayMenu>,
    /// Menu as last sent to the GUI
    published_menu: Mutex<Option<TrayMenu>>,
    /// Settings window is showing
    settings_open: AtomicBool,
    /// Set by `close()`, stops the event loop
    shutting_down: AtomicBool,
    /// Event receiver from listener threads (taken when the event loop starts)
    event_receiver: Mutex<Option<mpsc::Receiver<ConnectionEvent>>>,
    /// Requests to the GUI thread
    gui_sender: mpsc::Sender<GuiEvent>,
}

impl AppController {
    /// Create a controller with an empty menu and no open chats
    pub fn new(
        service: Arc<Service>,
        event_receiver: mpsc::Receiver<ConnectionEvent>,
        gui_sender: mpsc::Sender<GuiEvent>,
    ) -> Self {
        Self {
            service,
            pseudonyms: Mutex::new(Vec::new()),
            open_chats: Mutex::new(HashMap::new()),
            menu: Mutex::new(TrayMenu::new()),
            published_menu: Mutex::new(None),
            settings_open: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            event_receiver: Mutex::new(Some(event_receiver)),
            gui_sender,
        }
    }

    /// Service layer
    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    /// Build the static part of the menu and load the pseudonyms
    pub fn load(&self) {
        use tracing::info;

        info!("Loading controller");
        self.menu.lock().append_settings();
        self.reload();
        self.publish_menu();
    }

    /// Re-read the pseudonym list
    ///
    /// On failure the error is logged and the previous list stays in use.
    pub fn reload(&self) {
        use tracing::{error, info};

        let list = match self.service.pseudonyms.get_all() {
            Ok(list) => list,
            Err(e) => {
                error!("controller.Pseudonyms.GetAll: {e}");
                return;
            }
        };
        info!("Loaded {} pseudonym(s)", list.len());
        *self.pseudonyms.lock() = list.clone();

        let stale: Vec<Uuid> = self
            .open_chats
            .lock()
            .values()
            .filter(|session| !list.contains(session.pseudonym()))
            .map(|session| session.id())
            .collect();
        for id in stale {
            self.drop_session(id);
        }
    }

    /// Pseudonyms currently known to the controller
    pub fn pseudonyms(&self) -> Vec<Pseudonym> {
        self.pseudonyms.lock().clone()
    }

    /// Copy of the current tray menu
    pub fn menu(&self) -> TrayMenu {
        self.menu.lock().clone()
    }

    /// One poll tick: make sure every pseudonym has a live connection
    ///
    /// Pseudonyms are processed in parallel; the call returns once all of
    /// them are done.
    pub fn update(&self) {
        use rayon::prelude::*;

        let pseudonyms = self.pseudonyms.lock().clone();
        pseudonyms.par_iter().for_each(|pseudonym| {
            self.update_one(pseudonym);
            self.publish_menu();
        });
    }

    fn update_one(&self, pseudonym: &Pseudonym) {
        use tracing::info;

        let Some(session) = self.session_or_create(pseudonym) else {
            return;
        };
        let connection = session.connection();

        if connection.is_online() {
            if let Some(address) = connection.self_address() {
                self.apply_self_address(&session, address);
            }
            return;
        }

        if let Err(e) = connection.dial() {
            self.connection_failed(&session, "dial", &e);
            return;
        }
        if let Err(e) = connection.listen_and_serve() {
            self.connection_failed(&session, "listen on", &e);
            return;
        }

        if session.record_success() {
            info!("Pseudonym '{}' is reachable again", pseudonym.name);
        }
        info!("Connected pseudonym '{}' to {}", pseudonym.name, pseudonym.server);
        self.set_item_enabled(&session, true);
    }

    fn session_or_create(&self, pseudonym: &Pseudonym) -> Option<Arc<ChatSession>> {
        use tracing::info;

        let mut chats = self.open_chats.lock();
        if let Some(session) = chats.get(&pseudonym.id) {
            return Some(Arc::clone(session));
        }
        // Settings may have edited or removed the pseudonym since the tick started
        if !self.pseudonyms.lock().contains(pseudonym) {
            return None;
        }

        let connection = self.service.nym_client.create(pseudonym);
        let name = pseudonym.name.clone();
        connection.set_on_close(Box::new(move || {
            info!("Connection closed for pseudonym '{name}'");
        }));

        let session = Arc::new(ChatSession::new(pseudonym.clone(), connection));
        chats.insert(pseudonym.id, Arc::clone(&session));
        self.menu.lock().prepend_chat(ChatMenuItem::new(pseudonym));
        info!("Created chat session \"{}\"", session.title());
        Some(session)
    }

    fn connection_failed(&self, session: &Arc<ChatSession>, stage: &str, e: &NymgraphError) {
        use tracing::{debug, warn};

        let pseudonym = session.pseudonym();
        if session.record_failure() {
            warn!(
                "Failed to {stage} {} for pseudonym '{}': {e}",
                pseudonym.server, pseudonym.name
            );
        } else {
            debug!("Still unable to {stage} {}: {e}", pseudonym.server);
        }
        self.set_item_enabled(session, false);
    }

    /// Enable or disable the menu item of `session`, unless it was replaced
    fn set_item_enabled(&self, session: &Arc<ChatSession>, enabled: bool) {
        let chats = self.open_chats.lock();
        let current = chats
            .get(&session.id())
            .is_some_and(|open| Arc::ptr_eq(open, session));
        if current && let Some(item) = self.menu.lock().chat_mut(session.id()) {
            item.enabled = enabled;
        }
    }

    fn apply_self_address(&self, session: &ChatSession, address: String) {
        use tracing::info;

        if session.set_self_address(address) {
            info!(
                "Pseudonym '{}' is reachable at {}",
                session.pseudonym().name,
                session.self_address().unwrap_or_default()
            );
            if session.is_loaded() {
                self.emit(GuiEvent::ChatUpdated(self.chat_view(session)));
            }
        }
    }

    /// Open session of a pseudonym
    fn session(&self, pseudonym_id: Uuid) -> Option<Arc<ChatSession>> {
        self.open_chats.lock().get(&pseudonym_id).cloned()
    }

    /// Close and forget the session of a pseudonym
    fn drop_session(&self, pseudonym_id: Uuid) {
        use tracing::info;

        let removed = {
            let mut chats = self.open_chats.lock();
            let removed = chats.remove(&pseudonym_id);
            if removed.is_some() {
                self.menu.lock().remove_chat(pseudonym_id);
            }
            removed
        };

        if let Some(session) = removed {
            session.connection().close();
            if session.is_loaded() {
                self.emit(GuiEvent::HideChat(pseudonym_id));
            }
            info!("Closed chat session \"{}\"", session.title());
        }
        self.publish_menu();
    }

    /// Send the menu to the GUI if it differs from the last one sent
    fn publish_menu(&self) {
        let mut published = self.published_menu.lock();
        let menu = self.menu.lock().clone();
        if published.as_ref() == Some(&menu) {
            return;
        }
        self.emit(GuiEvent::MenuChanged(menu.clone()));
        *published = Some(menu);
    }

    fn emit(&self, event: GuiEvent) {
        use tracing::debug;

        if self.gui_sender.send(event).is_err() {
            debug!("GUI event receiver dropped; event discarded");
        }
    }

    /// Menu item action: show the chat window of a pseudonym
    ///
    /// Disabled items do nothing. A checked item only brings its window to
    /// the front.
    pub fn open_chat(&self, pseudonym_id: Uuid) {
        use tracing::{debug, info};

        let Some(item) = self.menu.lock().chat(pseudonym_id).cloned() else {
            debug!("No menu item for pseudonym {pseudonym_id}");
            return;
        };
        if !item.enabled {
            debug!("Ignoring click on disabled chat item '{}'", item.label);
            return;
        }
        if item.checked {
            self.emit(GuiEvent::FocusChat(pseudonym_id));
            return;
        }
        let Some(session) = self.session(pseudonym_id) else {
            return;
        };

        session.load();
        self.emit(GuiEvent::ShowChat(self.chat_view(&session)));
        if let Some(item) = self.menu.lock().chat_mut(pseudonym_id) {
            item.checked = true;
            item.unread = 0;
        }
        self.publish_menu();
        info!("Opened chat window \"{}\"", session.title());
    }

    /// Close intercept of a chat window: hide it and uncheck its item
    pub fn close_chat_window(&self, pseudonym_id: Uuid) {
        self.emit(GuiEvent::HideChat(pseudonym_id));
        if let Some(item) = self.menu.lock().chat_mut(pseudonym_id) {
            item.checked = false;
        }
        self.publish_menu();
        if let Some(session) = self.session(pseudonym_id) {
            session.unload();
        }
    }

    /// Content of the chat window of a pseudonym
    pub fn chat_snapshot(&self, pseudonym_id: Uuid) -> Result<ChatView> {
        let session = self
            .session(pseudonym_id)
            .ok_or(NymgraphError::PseudonymNotFound(pseudonym_id))?;
        Ok(self.chat_view(&session))
    }

    fn chat_view(&self, session: &ChatSession) -> ChatView {
        let id = session.id();
        let contacts = self.service.contacts.for_pseudonym(id);
        let history = build_history(
            &self.service.sent.for_pseudonym(id),
            &self.service.received.for_pseudonym(id),
            &contacts,
        );
        ChatView {
            pseudonym_id: id,
            title: session.title().to_string(),
            self_address: session
                .self_address()
                .or_else(|| session.connection().self_address()),
            online: session.connection().is_online(),
            contacts,
            history,
        }
    }

    /// Refresh the chat window of a pseudonym if it is showing
    fn push_chat_update(&self, pseudonym_id: Uuid) {
        if let Some(session) = self.session(pseudonym_id)
            && session.is_loaded()
        {
            self.emit(GuiEvent::ChatUpdated(self.chat_view(&session)));
        }
    }

    fn ensure_pseudonym(&self, pseudonym_id: Uuid) -> Result<()> {
        if self.pseudonyms.lock().iter().any(|p| p.id == pseudonym_id) {
            Ok(())
        } else {
            Err(NymgraphError::PseudonymNotFound(pseudonym_id))
        }
    }

    /// Add a contact to the address book of a pseudonym
    pub fn add_contact(&self, pseudonym_id: Uuid, alias: &str, address: &str) -> Result<Contact> {
        self.ensure_pseudonym(pseudonym_id)?;
        let contact = self.service.contacts.create(pseudonym_id, alias, address)?;
        self.push_chat_update(pseudonym_id);
        Ok(contact)
    }

    /// Remove a contact from the address book of a pseudonym
    pub fn delete_contact(&self, pseudonym_id: Uuid, contact_id: Uuid) -> Result<()> {
        let contact = self.service.contacts.get(contact_id)?;
        if contact.pseudonym_id != pseudonym_id {
            return Err(NymgraphError::ContactNotFound(contact_id));
        }
        self.service.contacts.delete(contact_id)?;
        self.push_chat_update(pseudonym_id);
        Ok(())
    }

    /// Send `text` to a contact and record it in the history
    pub fn send_message(
        &self,
        pseudonym_id: Uuid,
        contact_id: Uuid,
        text: &str,
    ) -> Result<SentMessage> {
        use tracing::debug;

        let text = text.trim();
        if text.is_empty() {
            return Err(NymgraphError::EmptyMessage);
        }
        let session = self
            .session(pseudonym_id)
            .ok_or(NymgraphError::PseudonymNotFound(pseudonym_id))?;
        let contact = self.service.contacts.get(contact_id)?;
        if contact.pseudonym_id != pseudonym_id {
            return Err(NymgraphError::ContactNotFound(contact_id));
        }

        session.connection().send(&contact.address, text)?;
        let sent = self
            .service
            .sent
            .record(pseudonym_id, Some(contact.id), &contact.address, text)?;
        debug!("Sent message to '{}'", contact.alias);
        self.push_chat_update(pseudonym_id);
        Ok(sent)
    }

    /// Answer a received message through its sender tag
    pub fn reply_message(
        &self,
        pseudonym_id: Uuid,
        message_id: Uuid,
        text: &str,
    ) -> Result<SentMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NymgraphError::EmptyMessage);
        }
        let session = self
            .session(pseudonym_id)
            .ok_or(NymgraphError::PseudonymNotFound(pseudonym_id))?;
        let received = self
            .service
            .received
            .find(message_id)
            .filter(|m| m.pseudonym_id == pseudonym_id)
            .ok_or(NymgraphError::MessageNotFound(message_id))?;
        let sender_tag = received
            .sender_tag
            .ok_or(NymgraphError::NoReplyHandle(message_id))?;

        session.connection().reply(&sender_tag, text)?;
        let sent = self
            .service
            .sent
            .record(pseudonym_id, None, &sender_tag, text)?;
        self.push_chat_update(pseudonym_id);
        Ok(sent)
    }

    /// Show the settings window
    pub fn open_settings(&self) {
        self.settings_open.store(true, Ordering::SeqCst);
        self.emit(GuiEvent::ShowSettings(self.settings_view()));
    }

    /// The settings window was closed
    pub fn close_settings(&self) {
        self.settings_open.store(false, Ordering::SeqCst);
    }

    /// Content of the settings window
    pub fn settings_view(&self) -> SettingsView {
        SettingsView {
            pseudonyms: self.pseudonyms(),
            preferences: self.service.preferences(),
        }
    }

    fn push_settings_update(&self) {
        if self.settings_open.load(Ordering::SeqCst) {
            self.emit(GuiEvent::SettingsUpdated(self.settings_view()));
        }
    }

    /// Create a pseudonym; the next poll tick connects it
    pub fn create_pseudonym(&self, name: &str, server: &str) -> Result<Pseudonym> {
        let pseudonym = self.service.pseudonyms.create(name, server)?;
        self.on_create(pseudonym.clone());
        self.push_settings_update();
        Ok(pseudonym)
    }

    /// Rename a pseudonym or point it at another server
    ///
    /// The old session is closed; the next poll tick reconnects with the new
    /// settings.
    pub fn update_pseudonym(&self, id: Uuid, name: &str, server: &str) -> Result<Pseudonym> {
        let updated = self.service.pseudonyms.update(id, name, server)?;
        self.on_update(&updated);
        self.drop_session(id);
        self.push_settings_update();
        Ok(updated)
    }

    /// Delete a pseudonym with its contacts and history
    pub fn delete_pseudonym(&self, id: Uuid) -> Result<()> {
        use tracing::warn;

        self.service.pseudonyms.delete(id)?;
        self.on_delete(id);
        self.drop_session(id);

        if let Err(e) = self.service.contacts.delete_for_pseudonym(id) {
            warn!("Failed to delete contacts of pseudonym {id}: {e}");
        }
        if let Err(e) = self.service.sent.delete_for_pseudonym(id) {
            warn!("Failed to delete sent messages of pseudonym {id}: {e}");
        }
        if let Err(e) = self.service.received.delete_for_pseudonym(id) {
            warn!("Failed to delete received messages of pseudonym {id}: {e}");
        }
        self.push_settings_update();
        Ok(())
    }

    fn on_create(&self, pseudonym: Pseudonym) {
        let mut list = self.pseudonyms.lock();
        if !list.iter().any(|p| p.id == pseudonym.id) {
            list.push(pseudonym);
        }
    }

    fn on_update(&self, pseudonym: &Pseudonym) {
        if let Some(existing) = self
            .pseudonyms
            .lock()
            .iter_mut()
            .find(|p| p.id == pseudonym.id)
        {
            existing.name.clone_from(&pseudonym.name);
            existing.server.clone_from(&pseudonym.server);
        }
    }

    fn on_delete(&self, id: Uuid) {
        self.pseudonyms.lock().retain(|p| p.id != id);
    }

    /// Update user preferences and save to disk.
    /// Logs warning and continues with in-memory config if save fails.
    pub fn update_preferences(&self, prefs: UserPreferences) {
        use tracing::info;

        info!("Updating user preferences");
        self.service.update_preferences(prefs);
        self.push_settings_update();
    }

    /// Log an error and ask the GUI to show it
    pub fn message_error(&self, error: &NymgraphError) {
        use tracing::error;

        error!("{error}");
        self.emit(GuiEvent::Error(get_user_friendly_error(error)));
    }

    /// Handle an event from a listener thread
    pub fn handle_connection_event(&self, event: ConnectionEvent) {
        use tracing::{debug, error};

        match event {
            ConnectionEvent::SelfAddress {
                pseudonym_id,
                address,
            } => {
                if let Some(session) = self.session(pseudonym_id) {
                    self.apply_self_address(&session, address);
                }
            }
            ConnectionEvent::Received {
                pseudonym_id,
                text,
                sender_tag,
            } => {
                let Some(session) = self.session(pseudonym_id) else {
                    debug!("Dropping message for closed session {pseudonym_id}");
                    return;
                };
                if let Err(e) = self
                    .service
                    .received
                    .record(pseudonym_id, sender_tag, &text)
                {
                    error!("Failed to store received message: {e}");
                    return;
                }

                if session.is_loaded() {
                    self.emit(GuiEvent::ChatUpdated(self.chat_view(&session)));
                } else {
                    if let Some(item) = self.menu.lock().chat_mut(pseudonym_id) {
                        item.unread += 1;
                    }
                    self.publish_menu();
                }
            }
            ConnectionEvent::Error {
                pseudonym_id,
                message,
            } => {
                if self.session(pseudonym_id).is_none() {
                    debug!("Dropping mixnet client error for closed session {pseudonym_id}");
                    return;
                }
                self.message_error(&NymgraphError::ProtocolError(message));
            }
        }
    }

    /// Spawn the event loop in a background thread.
    ///
    /// The loop exits once [`close`](Self::close) has been called or every
    /// sender is gone.
    pub fn spawn_event_loop(controller: Arc<Self>) -> std::thread::JoinHandle<()> {
        let receiver = controller.event_receiver.lock().take();

        std::thread::spawn(move || {
            use std::sync::mpsc::RecvTimeoutError;
            use std::time::Duration;
            use tracing::{info, warn};

            let Some(receiver) = receiver else {
                warn!("Event loop already running; spawn_event_loop() call ignored");
                return;
            };

            info!("Entering connection event loop");
            loop {
                match receiver.recv_timeout(Duration::from_millis(100)) {
                    Ok(event) => controller.handle_connection_event(event),
                    Err(RecvTimeoutError::Timeout) => {
                        if controller.shutting_down.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        warn!("Connection event channel disconnected. Exiting event loop.");
                        break;
                    }
                }
            }
            info!("Connection event loop exited");
        })
    }

    /// Close every chat connection and apply the delete-history preference
    pub fn close(&self) {
        use rayon::prelude::*;
        use tracing::{error, info};

        self.shutting_down.store(true, Ordering::SeqCst);

        let sessions: Vec<Arc<ChatSession>> = self
            .open_chats
            .lock()
            .drain()
            .map(|(_, session)| session)
            .collect();
        sessions
            .par_iter()
            .for_each(|session| session.connection().close());
        info!("Closed {} chat connection(s)", sessions.len());

        if self.service.preferences().delete_history_after_quit {
            match self.service.sent.truncate() {
                Ok(()) => info!("Sent data cleaned"),
                Err(e) => error!("Failed to clean sent data: {e}"),
            }
            match self.service.received.truncate() {
                Ok(()) => info!("Received/Replies data cleaned"),
                Err(e) => error!("Failed to clean received data: {e}"),
            }
        }
    }
}
