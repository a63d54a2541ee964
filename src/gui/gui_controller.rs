//! GUI controller
//!
//! Owns every Slint window and applies [`GuiEvent`]s from the application
//! controller. Events are drained on the GUI thread by a repeating timer;
//! window callbacks call straight into [`AppController`].

use crate::{
    ChatItem, ChatWindow, ContactRow, ErrorWindow, HistoryRow, MainWindow, PseudonymRow,
    SettingsWindow,
};
use anyhow::{Context, Result};
use nymgraph::config::UserPreferences;
use nymgraph::controller::{AppController, ChatView, GuiEvent, SettingsView, TrayMenu};
use nymgraph::entity::Direction;
use slint::{
    CloseRequestResponse, ComponentHandle, ModelRc, SharedString, Timer, TimerMode, VecModel,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[cfg(any(windows, target_os = "macos"))]
use super::tray::{TrayAction, TrayIcon};

/// How often pending GUI events are applied
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Windows living on the GUI thread
struct Windows {
    main: MainWindow,
    chats: HashMap<Uuid, ChatWindow>,
    settings: Option<SettingsWindow>,
    error: Option<ErrorWindow>,
    #[cfg(any(windows, target_os = "macos"))]
    tray: Option<TrayIcon>,
}

/// GUI controller running the Slint event loop
pub struct GuiController {
    controller: Arc<AppController>,
    events: mpsc::Receiver<GuiEvent>,
    windows: Rc<RefCell<Windows>>,
}

impl GuiController {
    /// Create the main window and, where supported, the tray icon
    pub fn new(controller: Arc<AppController>, events: mpsc::Receiver<GuiEvent>) -> Result<Self> {
        let main = MainWindow::new().context("Failed to create main window")?;

        #[cfg(any(windows, target_os = "macos"))]
        let tray = match TrayIcon::new(&controller.menu()) {
            Ok(tray) => Some(tray),
            Err(e) => {
                warn!("System tray unavailable, using the main window only: {e:#}");
                None
            }
        };

        #[cfg(any(windows, target_os = "macos"))]
        main.set_has_tray(tray.is_some());

        let windows = Rc::new(RefCell::new(Windows {
            main,
            chats: HashMap::new(),
            settings: None,
            error: None,
            #[cfg(any(windows, target_os = "macos"))]
            tray,
        }));

        Ok(Self {
            controller,
            events,
            windows,
        })
    }

    /// Show the main window and run the event loop until the user quits
    pub fn run(self) -> Result<()> {
        self.wire_main_window();

        let windows = Rc::clone(&self.windows);
        let controller = Arc::clone(&self.controller);
        let events = self.events;

        let timer = Timer::default();
        timer.start(TimerMode::Repeated, EVENT_POLL_INTERVAL, move || {
            while let Ok(event) = events.try_recv() {
                apply_event(&windows, &controller, event);
            }
            #[cfg(any(windows, target_os = "macos"))]
            poll_tray(&controller);
        });

        self.windows
            .borrow()
            .main
            .show()
            .context("Failed to show main window")?;

        slint::run_event_loop_until_quit().context("Slint event loop failed")?;
        timer.stop();
        info!("GUI event loop exited");
        Ok(())
    }

    fn wire_main_window(&self) {
        let windows = self.windows.borrow();
        let main = &windows.main;

        let controller = Arc::clone(&self.controller);
        main.on_open_chat(move |id| {
            if let Some(id) = parse_id(&id) {
                controller.open_chat(id);
            }
        });

        let controller = Arc::clone(&self.controller);
        main.on_open_settings(move || controller.open_settings());

        main.on_quit(quit);

        let has_tray = main.get_has_tray();
        main.window().on_close_requested(move || {
            if !has_tray {
                quit();
            }
            CloseRequestResponse::HideWindow
        });
    }
}

fn quit() {
    info!("Quit requested");
    if let Err(e) = slint::quit_event_loop() {
        warn!("Failed to stop the event loop: {e}");
    }
}

fn parse_id(id: &str) -> Option<Uuid> {
    let parsed = Uuid::parse_str(id).ok();
    if parsed.is_none() {
        warn!("Ignoring malformed id '{id}' from the GUI");
    }
    parsed
}

#[cfg(any(windows, target_os = "macos"))]
fn poll_tray(controller: &Arc<AppController>) {
    while let Some(action) = TrayIcon::poll_action() {
        match action {
            TrayAction::OpenChat(id) => controller.open_chat(id),
            TrayAction::OpenSettings => controller.open_settings(),
            TrayAction::Quit => quit(),
        }
    }
}

fn apply_event(windows: &Rc<RefCell<Windows>>, controller: &Arc<AppController>, event: GuiEvent) {
    match event {
        GuiEvent::MenuChanged(menu) => apply_menu(&windows.borrow(), &menu),
        GuiEvent::ShowChat(view) => {
            let mut windows = windows.borrow_mut();
            let existing = windows
                .chats
                .get(&view.pseudonym_id)
                .map(ComponentHandle::clone_strong);
            let window = match existing {
                Some(window) => window,
                None => match create_chat_window(controller, view.pseudonym_id) {
                    Ok(window) => {
                        windows
                            .chats
                            .insert(view.pseudonym_id, window.clone_strong());
                        window
                    }
                    Err(e) => {
                        warn!("{e:#}");
                        return;
                    }
                },
            };
            apply_chat_view(&window, &view);
            if let Err(e) = window.show() {
                warn!("Failed to show chat window: {e}");
            }
        }
        GuiEvent::FocusChat(id) => {
            if let Some(window) = windows.borrow().chats.get(&id) {
                window.window().set_minimized(false);
                if let Err(e) = window.show() {
                    warn!("Failed to focus chat window: {e}");
                }
            }
        }
        GuiEvent::HideChat(id) => {
            if let Some(window) = windows.borrow().chats.get(&id)
                && let Err(e) = window.hide()
            {
                warn!("Failed to hide chat window: {e}");
            }
        }
        GuiEvent::ChatUpdated(view) => {
            if let Some(window) = windows.borrow().chats.get(&view.pseudonym_id) {
                apply_chat_view(window, &view);
            }
        }
        GuiEvent::ShowSettings(view) => {
            let mut windows = windows.borrow_mut();
            if windows.settings.is_none() {
                match create_settings_window(controller) {
                    Ok(window) => windows.settings = Some(window),
                    Err(e) => {
                        warn!("{e:#}");
                        return;
                    }
                }
            }
            if let Some(settings) = &windows.settings {
                apply_settings_view(settings, &view);
                if let Err(e) = settings.show() {
                    warn!("Failed to show settings window: {e}");
                }
            }
        }
        GuiEvent::SettingsUpdated(view) => {
            if let Some(settings) = &windows.borrow().settings {
                apply_settings_view(settings, &view);
            }
        }
        GuiEvent::Error(message) => show_error(&mut windows.borrow_mut(), &message),
    }
}

fn apply_menu(windows: &Windows, menu: &TrayMenu) {
    debug!("Applying menu with {} chat item(s)", menu.chats().count());

    let items: Vec<ChatItem> = menu
        .chats()
        .map(|item| ChatItem {
            id: item.pseudonym_id.to_string().into(),
            label: item.display_label().into(),
            enabled: item.enabled,
            checked: item.checked,
        })
        .collect();
    windows.main.set_chats(ModelRc::new(VecModel::from(items)));

    #[cfg(any(windows, target_os = "macos"))]
    {
        if let Some(tray) = &windows.tray
            && let Err(e) = tray.update(menu)
        {
            warn!("Failed to update tray menu: {e:#}");
        }
    }
}

fn create_chat_window(controller: &Arc<AppController>, pseudonym_id: Uuid) -> Result<ChatWindow> {
    let window = ChatWindow::new().context("Failed to create chat window")?;

    let c = Arc::clone(controller);
    let weak = window.as_weak();
    window.on_send_message(move |contact_id, text| {
        let Some(contact_id) = parse_id(&contact_id) else {
            return;
        };
        match c.send_message(pseudonym_id, contact_id, &text) {
            Ok(_) => {
                if let Some(window) = weak.upgrade() {
                    window.set_draft(SharedString::new());
                }
            }
            Err(e) => c.message_error(&e),
        }
    });

    let c = Arc::clone(controller);
    let weak = window.as_weak();
    window.on_reply_message(move |message_id, text| {
        let Some(message_id) = parse_id(&message_id) else {
            return;
        };
        match c.reply_message(pseudonym_id, message_id, &text) {
            Ok(_) => {
                if let Some(window) = weak.upgrade() {
                    window.set_draft(SharedString::new());
                    window.set_reply_to(SharedString::new());
                }
            }
            Err(e) => c.message_error(&e),
        }
    });

    let c = Arc::clone(controller);
    let weak = window.as_weak();
    window.on_add_contact(move |alias, address| {
        match c.add_contact(pseudonym_id, &alias, &address) {
            Ok(contact) => {
                if let Some(window) = weak.upgrade() {
                    window.set_new_alias(SharedString::new());
                    window.set_new_address(SharedString::new());
                    window.set_selected_contact(contact.id.to_string().into());
                }
            }
            Err(e) => c.message_error(&e),
        }
    });

    let c = Arc::clone(controller);
    window.on_delete_contact(move |contact_id| {
        if let Some(contact_id) = parse_id(&contact_id)
            && let Err(e) = c.delete_contact(pseudonym_id, contact_id)
        {
            c.message_error(&e);
        }
    });

    let c = Arc::clone(controller);
    window.window().on_close_requested(move || {
        c.close_chat_window(pseudonym_id);
        CloseRequestResponse::HideWindow
    });

    Ok(window)
}

fn apply_chat_view(window: &ChatWindow, view: &ChatView) {
    window.set_chat_title(view.title.as_str().into());
    window.set_self_address(view.self_address.clone().unwrap_or_default().into());
    window.set_online(view.online);

    let contacts: Vec<ContactRow> = view
        .contacts
        .iter()
        .map(|contact| ContactRow {
            id: contact.id.to_string().into(),
            alias: contact.alias.as_str().into(),
            address: contact.address.as_str().into(),
        })
        .collect();

    // Keep the selection on a contact that still exists
    let selected = window.get_selected_contact();
    if !contacts.iter().any(|row| row.id == selected) {
        let first = contacts.first().map(|row| row.id.clone()).unwrap_or_default();
        window.set_selected_contact(first);
    }
    window.set_contacts(ModelRc::new(VecModel::from(contacts)));

    let history: Vec<HistoryRow> = view
        .history
        .iter()
        .map(|entry| HistoryRow {
            id: entry.id.to_string().into(),
            outgoing: entry.direction == Direction::Sent,
            peer: entry.peer.as_str().into(),
            text: entry.text.as_str().into(),
            time: entry
                .at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .into(),
            can_reply: entry.can_reply,
        })
        .collect();
    window.set_history(ModelRc::new(VecModel::from(history)));
}

fn create_settings_window(controller: &Arc<AppController>) -> Result<SettingsWindow> {
    let window = SettingsWindow::new().context("Failed to create settings window")?;

    let c = Arc::clone(controller);
    let weak = window.as_weak();
    window.on_create_pseudonym(move |name, server| match c.create_pseudonym(&name, &server) {
        Ok(pseudonym) => {
            if let Some(window) = weak.upgrade() {
                window.set_selected_id(pseudonym.id.to_string().into());
            }
        }
        Err(e) => c.message_error(&e),
    });

    let c = Arc::clone(controller);
    window.on_update_pseudonym(move |id, name, server| {
        if let Some(id) = parse_id(&id)
            && let Err(e) = c.update_pseudonym(id, &name, &server)
        {
            c.message_error(&e);
        }
    });

    let c = Arc::clone(controller);
    let weak = window.as_weak();
    window.on_delete_pseudonym(move |id| {
        let Some(id) = parse_id(&id) else {
            return;
        };
        match c.delete_pseudonym(id) {
            Ok(()) => {
                if let Some(window) = weak.upgrade() {
                    window.set_selected_id(SharedString::new());
                    window.set_edit_name(SharedString::new());
                }
            }
            Err(e) => c.message_error(&e),
        }
    });

    let c = Arc::clone(controller);
    window.on_save_preferences(move |delete_history_after_quit, poll_interval_ms| {
        let prefs = UserPreferences {
            delete_history_after_quit,
            poll_interval_ms: u64::try_from(poll_interval_ms)
                .unwrap_or(UserPreferences::default().poll_interval_ms),
            ..c.service().preferences()
        };
        c.update_preferences(prefs);
    });

    let c = Arc::clone(controller);
    window.window().on_close_requested(move || {
        c.close_settings();
        CloseRequestResponse::HideWindow
    });

    Ok(window)
}

fn apply_settings_view(window: &SettingsWindow, view: &SettingsView) {
    let rows: Vec<PseudonymRow> = view
        .pseudonyms
        .iter()
        .map(|p| PseudonymRow {
            id: p.id.to_string().into(),
            name: p.name.as_str().into(),
            server: p.server.as_str().into(),
        })
        .collect();
    window.set_pseudonyms(ModelRc::new(VecModel::from(rows)));
    window.set_delete_history_after_quit(view.preferences.delete_history_after_quit);
    window.set_poll_interval_ms(
        i32::try_from(view.preferences.poll_interval_ms).unwrap_or(i32::MAX),
    );
}

fn show_error(windows: &mut Windows, message: &str) {
    if windows.error.is_none() {
        match ErrorWindow::new() {
            Ok(window) => {
                let weak = window.as_weak();
                window.on_dismiss(move || {
                    if let Some(window) = weak.upgrade()
                        && let Err(e) = window.hide()
                    {
                        warn!("Failed to hide error window: {e}");
                    }
                });
                windows.error = Some(window);
            }
            Err(e) => {
                warn!("Failed to create error window: {e}");
                return;
            }
        }
    }

    if let Some(window) = &windows.error {
        window.set_message(message.into());
        if let Err(e) = window.show() {
            warn!("Failed to show error window: {e}");
        }
    }
}
