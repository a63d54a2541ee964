//! `Nymgraph` - Desktop chat client for the Nym mixnet
//!
//! Starts the tray menu and connects every configured pseudonym to its local
//! nym-client.

// Set Windows subsystem to hide console window
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![expect(
    missing_docs,
    reason = "Slint-generated code from include_modules! lacks doc comments"
)]
#![allow(clippy::unwrap_used)] // Slint-generated code from include_modules! uses .unwrap() extensively

// GUI module is only in the binary, not the library
mod gui;

use anyhow::{Context, Result};
use gui::GuiController;
use nymgraph::{
    config::{AppConfig, ConfigManager},
    controller::{AppController, GuiEvent},
    error::NymgraphError,
    monitor::ConnectionMonitor,
    nym::{ConnectionEvent, NymClientFactory, NymClientOptions},
    service::Service,
    utils,
};
use std::sync::{Arc, mpsc};
use tracing::{error, info};

// Include Slint-generated code
slint::include_modules!();

/// Connection events queued between the websocket listeners and the controller
const CONNECTION_EVENT_CAPACITY: usize = 64;

/// Main entry point for the application
fn main() -> Result<()> {
    utils::init_logging(&ConfigManager::data_dir())
        .context("Failed to initialize logging system")?;

    info!("Nymgraph v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = ConfigManager::load().context("Failed to load application configuration")?;
    info!(
        "Configuration loaded, poll interval {} ms",
        config.preferences.poll_interval_ms
    );

    let (controller, gui_controller) =
        match initialize_components(config).context("Failed to initialize core components") {
            Ok(components) => components,
            Err(e) => {
                use nymgraph::error::get_user_friendly_error;

                error!("Failed to initialize components: {:#}", e);
                let error_message = if let Some(nymgraph_error) = e.downcast_ref::<NymgraphError>()
                {
                    get_user_friendly_error(nymgraph_error)
                } else {
                    format!("{e:#}")
                };
                show_error_and_exit(&format!("Failed to initialize Nymgraph:\n\n{error_message}"));
                return Err(e);
            }
        };

    info!("Starting controller event thread");
    let event_loop_handle = AppController::spawn_event_loop(Arc::clone(&controller));

    info!("Starting connection monitor thread");
    let monitor = ConnectionMonitor::new(Arc::clone(&controller));
    let monitor_handle = monitor.start();

    info!("Starting GUI event loop");
    let gui_result = gui_controller
        .run()
        .context("GUI event loop terminated with error");

    info!("Nymgraph shutting down");
    monitor.stop();
    if monitor_handle.join().is_err() {
        error!("Connection monitor thread panicked");
    }

    controller.close();
    if event_loop_handle.join().is_err() {
        error!("Controller event thread panicked");
    }

    info!("Nymgraph stopped");
    gui_result
}

/// Wires the connection factory, service, controller and GUI together.
fn initialize_components(config: AppConfig) -> Result<(Arc<AppController>, GuiController)> {
    let (connection_tx, connection_rx) =
        mpsc::sync_channel::<ConnectionEvent>(CONNECTION_EVENT_CAPACITY);
    let (gui_tx, gui_rx) = mpsc::channel::<GuiEvent>();

    let options = NymClientOptions::from(&config.preferences);
    let factory = Arc::new(NymClientFactory::new(options, connection_tx));

    info!("Opening data stores in {}", ConfigManager::data_dir().display());
    let service = Service::open_default(config, factory).context("Failed to open data stores")?;

    info!("Creating application controller");
    let controller = Arc::new(AppController::new(Arc::new(service), connection_rx, gui_tx));
    controller.load();

    info!("Creating GUI controller");
    let gui_controller = GuiController::new(Arc::clone(&controller), gui_rx)
        .context("Failed to create GUI controller")?;

    Ok((controller, gui_controller))
}

/// Shows an error dialog and exits the application.
#[cfg(windows)]
fn show_error_and_exit(message: &str) {
    use rfd::MessageDialog;

    MessageDialog::new()
        .set_title("Nymgraph - Error")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .set_level(rfd::MessageLevel::Error)
        .show();

    std::process::exit(1);
}

/// Shows an error dialog and exits the application (non-Windows fallback).
#[cfg(not(windows))]
fn show_error_and_exit(message: &str) {
    eprintln!("ERROR: {message}");
    std::process::exit(1);
}
