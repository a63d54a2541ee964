//! Pseudonym store
//!
//! Pseudonym names are unique (case-insensitive) because they label tray
//! menu entries. Servers must be plain `ws://` URLs: the mixnet client only
//! listens on a local, unencrypted websocket.

use crate::entity::Pseudonym;
use crate::error::{NymgraphError, Result};
use crate::storage::json_store::{JsonStore, Record};
use std::path::PathBuf;
use tracing::info;
use url::Url;
use uuid::Uuid;

impl Record for Pseudonym {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Persistent list of pseudonyms
#[derive(Debug)]
pub struct PseudonymStore {
    store: JsonStore<Pseudonym>,
}

impl PseudonymStore {
    /// Open the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            store: JsonStore::open(path)?,
        })
    }

    /// Read every pseudonym from disk
    pub fn get_all(&self) -> Result<Vec<Pseudonym>> {
        self.store.load_all()
    }

    /// Pseudonym with the given id
    pub fn get(&self, id: Uuid) -> Option<Pseudonym> {
        self.store.find(id)
    }

    /// Validate and persist a new pseudonym
    pub fn create(&self, name: &str, server: &str) -> Result<Pseudonym> {
        let name = validate_name(name)?;
        let server = validate_server(server)?;

        let pseudonym = self.store.transact(|records| {
            ensure_unique(records, &name, None)?;
            let pseudonym = Pseudonym::new(name, server);
            records.push(pseudonym.clone());
            Ok(pseudonym)
        })?;
        info!("Created pseudonym '{}' ({})", pseudonym.name, pseudonym.server);
        Ok(pseudonym)
    }

    /// Change the name and server of an existing pseudonym
    pub fn update(&self, id: Uuid, name: &str, server: &str) -> Result<Pseudonym> {
        let name = validate_name(name)?;
        let server = validate_server(server)?;

        let updated = self.store.transact(|records| {
            ensure_unique(records, &name, Some(id))?;
            let existing = records
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(NymgraphError::PseudonymNotFound(id))?;
            existing.name = name;
            existing.server = server;
            Ok(existing.clone())
        })?;
        info!("Updated pseudonym '{}' ({})", updated.name, updated.server);
        Ok(updated)
    }

    /// Remove a pseudonym
    pub fn delete(&self, id: Uuid) -> Result<Pseudonym> {
        let removed = self
            .store
            .remove(id)?
            .ok_or(NymgraphError::PseudonymNotFound(id))?;
        info!("Deleted pseudonym '{}'", removed.name);
        Ok(removed)
    }
}

fn ensure_unique(records: &[Pseudonym], name: &str, except: Option<Uuid>) -> Result<()> {
    let taken = records
        .iter()
        .any(|p| Some(p.id) != except && p.name.eq_ignore_ascii_case(name));
    if taken {
        return Err(NymgraphError::DuplicatePseudonym(name.to_string()));
    }
    Ok(())
}

/// Trim and check a pseudonym name
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(NymgraphError::InvalidPseudonym(
            "name must not be empty".to_string(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(NymgraphError::InvalidPseudonym(
            "name must not contain control characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// Trim and check a mixnet client websocket URL
pub fn validate_server(server: &str) -> Result<String> {
    let server = server.trim();
    let url = Url::parse(server)
        .map_err(|e| NymgraphError::InvalidPseudonym(format!("server '{server}': {e}")))?;

    if url.scheme() != "ws" {
        return Err(NymgraphError::InvalidPseudonym(format!(
            "server '{server}' must use ws://"
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(NymgraphError::InvalidPseudonym(format!(
            "server '{server}' has no host"
        )));
    }
    Ok(server.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_dir;

    fn open_store(dir: &tempfile::TempDir) -> PseudonymStore {
        PseudonymStore::open(dir.path().join("pseudonyms.json")).unwrap()
    }

    #[test]
    fn test_create_trims_and_persists() {
        let dir = create_test_dir();
        let store = open_store(&dir);

        let created = store.create("  alice ", " ws://127.0.0.1:1977 ").unwrap();
        assert_eq!(created.name, "alice");
        assert_eq!(created.server, "ws://127.0.0.1:1977");

        let reopened = open_store(&dir);
        assert_eq!(reopened.get_all().unwrap(), vec![created]);
    }

    #[test]
    fn test_duplicate_names_rejected_case_insensitively() {
        let dir = create_test_dir();
        let store = open_store(&dir);
        store.create("alice", "ws://127.0.0.1:1977").unwrap();

        let result = store.create("ALICE", "ws://127.0.0.1:1978");
        assert!(matches!(result, Err(NymgraphError::DuplicatePseudonym(_))));
    }

    #[test]
    fn test_concurrent_creates_keep_names_unique() {
        let dir = create_test_dir();
        let store = open_store(&dir);

        let created = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    let server = format!("ws://127.0.0.1:{}", 2000 + i);
                    scope.spawn(move || store.create("alice", &server))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(Result::is_ok)
                .count()
        });

        assert_eq!(created, 1);
        assert_eq!(open_store(&dir).get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_update_keeps_own_name() {
        let dir = create_test_dir();
        let store = open_store(&dir);
        let alice = store.create("alice", "ws://127.0.0.1:1977").unwrap();
        store.create("bob", "ws://127.0.0.1:1978").unwrap();

        let updated = store.update(alice.id, "Alice", "ws://localhost:2000").unwrap();
        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.server, "ws://localhost:2000");

        let clash = store.update(alice.id, "bob", "ws://localhost:2000");
        assert!(matches!(clash, Err(NymgraphError::DuplicatePseudonym(_))));
    }

    #[test]
    fn test_update_and_delete_unknown_id() {
        let dir = create_test_dir();
        let store = open_store(&dir);
        let id = Uuid::new_v4();

        assert!(matches!(
            store.update(id, "x", "ws://localhost:1"),
            Err(NymgraphError::PseudonymNotFound(missing)) if missing == id
        ));
        assert!(matches!(
            store.delete(id),
            Err(NymgraphError::PseudonymNotFound(_))
        ));
    }

    #[test]
    fn test_server_validation() {
        assert!(validate_server("ws://127.0.0.1:1977").is_ok());
        assert!(validate_server("ws://localhost").is_ok());
        assert!(validate_server("wss://127.0.0.1:1977").is_err());
        assert!(validate_server("http://127.0.0.1:1977").is_err());
        assert!(validate_server("not a url").is_err());
        assert!(validate_server("").is_err());
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("a\nb").is_err());
        assert_eq!(validate_name(" ok ").unwrap(), "ok");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: accepted names are always trimmed and non-empty
            #[test]
            fn accepted_names_are_trimmed(s in "\\PC{0,24}") {
                if let Ok(name) = validate_name(&s) {
                    prop_assert!(!name.is_empty());
                    prop_assert_eq!(name.trim(), name.as_str());
                }
            }

            /// Property: any ws URL with a simple host and port validates
            #[test]
            fn simple_ws_urls_validate(host in "[a-z][a-z0-9]{0,10}", port in 1u16..) {
                let server = format!("ws://{host}:{port}");
                prop_assert_eq!(validate_server(&server).unwrap(), server);
            }
        }
    }
}
