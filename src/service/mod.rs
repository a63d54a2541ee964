//! Service layer
//!
//! [`Service`] bundles everything the application object works with: the
//! configuration, the persistent stores and the connection factory.

use crate::config::{AppConfig, ConfigManager, UserPreferences};
use crate::error::Result;
use crate::nym::ConnectionFactory;
use crate::storage::{ContactStore, PseudonymStore, ReceivedStore, SentStore};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared collaborators of the application controller
pub struct Service {
    /// Application configuration
    pub config: Mutex<AppConfig>,
    /// Where `config.json` is saved
    config_path: PathBuf,
    /// Pseudonym identities
    pub pseudonyms: PseudonymStore,
    /// Address book
    pub contacts: ContactStore,
    /// Outgoing history
    pub sent: SentStore,
    /// Incoming history
    pub received: ReceivedStore,
    /// Creates one mixnet client connection per pseudonym
    pub nym_client: Arc<dyn ConnectionFactory>,
}

impl Service {
    /// Open all stores under `data_dir`
    pub fn open(
        data_dir: &Path,
        config: AppConfig,
        nym_client: Arc<dyn ConnectionFactory>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        info!("Opening data stores in {}", data_dir.display());

        Ok(Self {
            config: Mutex::new(config),
            config_path: data_dir.join("config.json"),
            pseudonyms: PseudonymStore::open(data_dir.join("pseudonyms.json"))?,
            contacts: ContactStore::open(data_dir.join("contacts.json"))?,
            sent: SentStore::open(data_dir.join("sent.json"))?,
            received: ReceivedStore::open(data_dir.join("received.json"))?,
            nym_client,
        })
    }

    /// Open the stores in the default data directory
    pub fn open_default(config: AppConfig, nym_client: Arc<dyn ConnectionFactory>) -> Result<Self> {
        let dir = ConfigManager::ensure_config_dir()?;
        Self::open(&dir, config, nym_client)
    }

    /// Current preferences
    pub fn preferences(&self) -> UserPreferences {
        self.config.lock().preferences.clone()
    }

    /// Replace preferences and save the configuration
    ///
    /// A failed save is logged and the in-memory preferences are kept.
    pub fn update_preferences(&self, prefs: UserPreferences) {
        let mut config = self.config.lock();
        config.preferences = prefs;

        if let Err(e) = ConfigManager::save_to(&self.config_path, &config) {
            warn!(
                "Failed to save configuration to disk: {}. Continuing with in-memory config. \
                 Changes will be lost on application restart.",
                e
            );
        }
    }
}
