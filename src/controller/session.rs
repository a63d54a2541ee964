//! Per-pseudonym chat session

use crate::entity::Pseudonym;
use crate::nym::MixnetConnection;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Connection and window state of one pseudonym
///
/// A session is created the first time the poll loop sees a pseudonym and
/// lives until the pseudonym is edited, deleted or the application quits.
pub struct ChatSession {
    pseudonym: Pseudonym,
    connection: Arc<dyn MixnetConnection>,
    title: String,
    /// Window content is loaded and the window is showing
    loaded: AtomicBool,
    /// Last dial or listen attempt failed
    failing: AtomicBool,
    self_address: Mutex<Option<String>>,
}

impl ChatSession {
    /// Session for `pseudonym` over `connection`
    pub fn new(pseudonym: Pseudonym, connection: Arc<dyn MixnetConnection>) -> Self {
        let title = pseudonym.window_title();
        Self {
            pseudonym,
            connection,
            title,
            loaded: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            self_address: Mutex::new(None),
        }
    }

    /// Pseudonym id
    pub fn id(&self) -> Uuid {
        self.pseudonym.id
    }

    /// Pseudonym this session was created for
    pub fn pseudonym(&self) -> &Pseudonym {
        &self.pseudonym
    }

    /// Mixnet client connection
    pub fn connection(&self) -> &Arc<dyn MixnetConnection> {
        &self.connection
    }

    /// Chat window title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Whether the chat window is showing
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Mark the window content loaded. Returns whether it was not loaded already.
    pub fn load(&self) -> bool {
        !self.loaded.swap(true, Ordering::SeqCst)
    }

    /// The chat window was closed
    pub fn unload(&self) {
        self.loaded.store(false, Ordering::SeqCst);
    }

    /// Last known Nym address of this pseudonym
    pub fn self_address(&self) -> Option<String> {
        self.self_address.lock().clone()
    }

    /// Store the Nym address. Returns whether it changed.
    pub fn set_self_address(&self, address: String) -> bool {
        let mut current = self.self_address.lock();
        if current.as_deref() == Some(address.as_str()) {
            return false;
        }
        *current = Some(address);
        true
    }

    /// Note a failed attempt. Returns true for the first failure in a row.
    pub fn record_failure(&self) -> bool {
        !self.failing.swap(true, Ordering::SeqCst)
    }

    /// Note a successful attempt. Returns true if the previous one had failed.
    pub fn record_success(&self) -> bool {
        self.failing.swap(false, Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("pseudonym", &self.pseudonym)
            .field("loaded", &self.is_loaded())
            .field("online", &self.connection.is_online())
            .finish_non_exhaustive()
    }
}
