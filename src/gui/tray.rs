//! System tray integration
//!
//! Renders the controller's [`TrayMenu`] as a native tray menu. Menu item ids
//! encode the action: `chat:<pseudonym id>`, `settings` and `quit`.
//!
//! Only built on Windows and macOS. Other platforms use the main window,
//! which shows the same entries.

use anyhow::{Result, anyhow};
use nymgraph::controller::{MenuEntry, TrayMenu};
use tray_icon::menu::{CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIconBuilder};
use uuid::Uuid;

const SETTINGS_ID: &str = "settings";
const QUIT_ID: &str = "quit";
const CHAT_PREFIX: &str = "chat:";

/// What a click on a tray menu entry asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    /// Open the chat window of a pseudonym
    OpenChat(Uuid),
    /// Open the settings window
    OpenSettings,
    /// Exit the application
    Quit,
}

/// System tray icon with the chat menu
pub struct TrayIcon {
    tray: tray_icon::TrayIcon,
}

impl TrayIcon {
    /// Create the tray icon with an initial menu
    pub fn new(menu: &TrayMenu) -> Result<Self> {
        use tracing::info;

        info!("Creating system tray icon");

        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(build_menu(menu)?))
            .with_icon(create_icon()?)
            .with_tooltip("Nymgraph")
            .build()
            .map_err(|e| anyhow!("Failed to build tray icon: {e}"))?;

        info!("System tray icon created successfully");
        Ok(Self { tray })
    }

    /// Replace the tray menu
    pub fn update(&self, menu: &TrayMenu) -> Result<()> {
        self.tray.set_menu(Some(Box::new(build_menu(menu)?)));
        Ok(())
    }

    /// Next pending click on the tray menu, if any
    pub fn poll_action() -> Option<TrayAction> {
        use tracing::debug;

        while let Ok(event) = MenuEvent::receiver().try_recv() {
            let id: &str = event.id.as_ref();
            match parse_action(id) {
                Some(action) => return Some(action),
                None => debug!("Ignoring unknown tray menu id '{id}'"),
            }
        }
        None
    }
}

fn parse_action(id: &str) -> Option<TrayAction> {
    match id {
        SETTINGS_ID => Some(TrayAction::OpenSettings),
        QUIT_ID => Some(TrayAction::Quit),
        _ => id
            .strip_prefix(CHAT_PREFIX)
            .and_then(|uuid| Uuid::parse_str(uuid).ok())
            .map(TrayAction::OpenChat),
    }
}

fn build_menu(model: &TrayMenu) -> Result<Menu> {
    let menu = Menu::new();
    let append_err = |e: tray_icon::menu::Error| anyhow!("Failed to add tray menu item: {e}");

    for entry in model.entries() {
        match entry {
            MenuEntry::Chat(item) => {
                let check = CheckMenuItem::with_id(
                    format!("{CHAT_PREFIX}{}", item.pseudonym_id),
                    item.display_label(),
                    item.enabled,
                    item.checked,
                    None,
                );
                menu.append(&check).map_err(append_err)?;
            }
            MenuEntry::Separator => {
                menu.append(&PredefinedMenuItem::separator())
                    .map_err(append_err)?;
            }
            MenuEntry::Settings => {
                menu.append(&MenuItem::with_id(SETTINGS_ID, "Settings", true, None))
                    .map_err(append_err)?;
            }
        }
    }

    menu.append(&PredefinedMenuItem::separator())
        .map_err(append_err)?;
    menu.append(&MenuItem::with_id(QUIT_ID, "Quit", true, None))
        .map_err(append_err)?;
    Ok(menu)
}

/// 32x32 RGBA icon: violet disc on a transparent background
fn create_icon() -> Result<Icon> {
    const ICON_SIZE: u32 = 32;
    const RADIUS: f32 = 15.0;
    const CENTER: f32 = 15.5;

    let mut rgba = Vec::with_capacity((ICON_SIZE * ICON_SIZE * 4) as usize);
    for y in 0..ICON_SIZE {
        for x in 0..ICON_SIZE {
            #[expect(
                clippy::cast_precision_loss,
                reason = "Pixel coordinates below 32 are exact in f32"
            )]
            let distance = (x as f32 - CENTER).hypot(y as f32 - CENTER);
            if distance <= RADIUS - 2.0 {
                rgba.extend_from_slice(&[0x8e, 0x44, 0xad, 0xff]);
            } else if distance <= RADIUS {
                rgba.extend_from_slice(&[0x5b, 0x2c, 0x6f, 0xff]);
            } else {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
            }
        }
    }

    Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE)
        .map_err(|e| anyhow!("Failed to create icon from RGBA: {e}"))
}
