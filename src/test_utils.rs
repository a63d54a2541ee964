#![expect(
    clippy::unwrap_used,
    reason = "Test utilities use .unwrap() for brevity"
)]

//! Shared test utilities for `Nymgraph` unit tests.
//!
//! This module provides common test infrastructure used across multiple test modules.
//! It is only compiled during testing (`#[cfg(test)]`).

use crate::entity::Pseudonym;
use crate::error::{NymgraphError, Result, StringError};
use crate::nym::{CloseCallback, ConnectionFactory, MixnetConnection};
use parking_lot::Mutex as PlMutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

/// Global mutex to serialize tests that modify the `NYMGRAPH_HOME` environment variable.
static HOME_LOCK: Mutex<()> = Mutex::new(());

/// Helper function to create a temporary test directory using tempfile.
/// Returns a `TempDir` that automatically cleans up when dropped.
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// RAII guard that points `NYMGRAPH_HOME` at a temp directory for a test scope
/// and restores the original value when dropped.
///
/// # Safety Considerations
///
/// `std::env::set_var` and `std::env::remove_var` are unsafe because other threads
/// may read the environment concurrently. Every test that touches the variable
/// holds `HOME_LOCK` for the guard's lifetime, so modifications are serialized,
/// and the original value is restored on drop (including on panic).
pub struct HomeGuard {
    original: Option<String>,
    // Held for the lifetime of the guard
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[expect(
    unsafe_code,
    reason = "Test-only code that modifies environment variables under a global lock"
)]
impl HomeGuard {
    /// Create a new guard that sets `NYMGRAPH_HOME` to the given temp directory path.
    pub fn new(temp_dir: &TempDir) -> Self {
        let lock = HOME_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let original = std::env::var(crate::config::manager::HOME_ENV).ok();
        // SAFETY: HOME_LOCK serializes all writers; restored on drop.
        unsafe {
            std::env::set_var(crate::config::manager::HOME_ENV, temp_dir.path());
        }
        Self {
            original,
            _lock: lock,
        }
    }
}

#[expect(
    unsafe_code,
    reason = "Test-only code that restores environment variables under a global lock"
)]
impl Drop for HomeGuard {
    fn drop(&mut self) {
        // SAFETY: still holding HOME_LOCK.
        if let Some(ref original) = self.original {
            unsafe {
                std::env::set_var(crate::config::manager::HOME_ENV, original);
            }
        } else {
            unsafe {
                std::env::remove_var(crate::config::manager::HOME_ENV);
            }
        }
    }
}

/// Scripted behaviour for a [`MockConnection`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBehaviour {
    /// `dial` fails
    pub fail_dial: bool,
    /// `listen_and_serve` fails
    pub fail_listen: bool,
}

/// In-memory connection used to drive the controller without a mixnet client
pub struct MockConnection {
    server: String,
    behaviour: PlMutex<MockBehaviour>,
    online: AtomicBool,
    /// Calls to `dial`
    pub dial_count: AtomicUsize,
    /// Calls to `listen_and_serve`
    pub listen_count: AtomicUsize,
    /// `close` was called
    pub closed: AtomicBool,
    /// Address reported by `self_address`
    pub address: PlMutex<Option<String>>,
    /// `(recipient, text)` of every send
    pub sent: PlMutex<Vec<(String, String)>>,
    /// `(sender_tag, text)` of every reply
    pub replies: PlMutex<Vec<(String, String)>>,
    on_close: PlMutex<Option<CloseCallback>>,
}

impl MockConnection {
    fn new(server: &str, behaviour: MockBehaviour) -> Self {
        Self {
            server: server.to_string(),
            behaviour: PlMutex::new(behaviour),
            online: AtomicBool::new(false),
            dial_count: AtomicUsize::new(0),
            listen_count: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            address: PlMutex::new(None),
            sent: PlMutex::new(Vec::new()),
            replies: PlMutex::new(Vec::new()),
            on_close: PlMutex::new(None),
        }
    }

    /// Change the scripted behaviour for subsequent calls
    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        *self.behaviour.lock() = behaviour;
    }

    /// Simulate the mixnet client dropping the socket
    pub fn drop_connection(&self) {
        self.online.store(false, Ordering::SeqCst);
        if let Some(callback) = self.on_close.lock().as_ref() {
            callback();
        }
    }
}

impl MixnetConnection for MockConnection {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn dial(&self) -> Result<()> {
        self.dial_count.fetch_add(1, Ordering::SeqCst);
        if self.behaviour.lock().fail_dial {
            return Err(NymgraphError::ConnectionFailed(StringError::new(
                "connection refused",
            )));
        }
        self.online.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn listen_and_serve(&self) -> Result<()> {
        self.listen_count.fetch_add(1, Ordering::SeqCst);
        if self.behaviour.lock().fail_listen {
            // Like NymClient: a failed listen drops the socket
            self.online.store(false, Ordering::SeqCst);
            return Err(NymgraphError::NotConnected(self.server.clone()));
        }
        Ok(())
    }

    fn self_address(&self) -> Option<String> {
        self.address.lock().clone()
    }

    fn send(&self, recipient: &str, text: &str) -> Result<()> {
        if !self.is_online() {
            return Err(NymgraphError::NotConnected(self.server.clone()));
        }
        self.sent.lock().push((recipient.to_string(), text.to_string()));
        Ok(())
    }

    fn reply(&self, sender_tag: &str, text: &str) -> Result<()> {
        if !self.is_online() {
            return Err(NymgraphError::NotConnected(self.server.clone()));
        }
        self.replies
            .lock()
            .push((sender_tag.to_string(), text.to_string()));
        Ok(())
    }

    fn set_on_close(&self, callback: CloseCallback) {
        *self.on_close.lock() = Some(callback);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.online.store(false, Ordering::SeqCst);
    }
}

/// Factory handing out [`MockConnection`]s and remembering them by pseudonym id
#[derive(Default)]
pub struct MockFactory {
    default_behaviour: PlMutex<MockBehaviour>,
    /// Every connection handed out, per pseudonym id
    pub created: PlMutex<HashMap<Uuid, Vec<Arc<MockConnection>>>>,
}

impl MockFactory {
    /// Factory whose connections all behave as `behaviour`
    pub fn with_behaviour(behaviour: MockBehaviour) -> Self {
        Self {
            default_behaviour: PlMutex::new(behaviour),
            created: PlMutex::new(HashMap::new()),
        }
    }

    /// Most recent connection created for a pseudonym
    pub fn last_for(&self, pseudonym_id: Uuid) -> Arc<MockConnection> {
        self.created
            .lock()
            .get(&pseudonym_id)
            .and_then(|conns| conns.last().cloned())
            .unwrap()
    }

    /// Number of connections created for a pseudonym
    pub fn count_for(&self, pseudonym_id: Uuid) -> usize {
        self.created
            .lock()
            .get(&pseudonym_id)
            .map_or(0, Vec::len)
    }
}

impl ConnectionFactory for MockFactory {
    fn create(&self, pseudonym: &Pseudonym) -> Arc<dyn MixnetConnection> {
        let conn = Arc::new(MockConnection::new(
            &pseudonym.server,
            *self.default_behaviour.lock(),
        ));
        self.created
            .lock()
            .entry(pseudonym.id)
            .or_default()
            .push(Arc::clone(&conn));
        conn
    }
}
