//! Contact store

use crate::entity::Contact;
use crate::error::{NymgraphError, Result};
use crate::storage::json_store::{JsonStore, Record};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

impl Record for Contact {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Persistent address book, partitioned by pseudonym
#[derive(Debug)]
pub struct ContactStore {
    store: JsonStore<Contact>,
}

impl ContactStore {
    /// Open the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            store: JsonStore::open(path)?,
        })
    }

    /// Contacts of one pseudonym, sorted by alias
    pub fn for_pseudonym(&self, pseudonym_id: Uuid) -> Vec<Contact> {
        let mut contacts = self.store.filter(|c| c.pseudonym_id == pseudonym_id);
        contacts.sort_by_key(|c| c.alias.to_lowercase());
        contacts
    }

    /// Contact with the given id
    pub fn get(&self, id: Uuid) -> Result<Contact> {
        self.store.find(id).ok_or(NymgraphError::ContactNotFound(id))
    }

    /// Validate and persist a new contact
    pub fn create(&self, pseudonym_id: Uuid, alias: &str, address: &str) -> Result<Contact> {
        let alias = alias.trim();
        let address = address.trim();
        if alias.is_empty() {
            return Err(NymgraphError::InvalidContact(
                "alias must not be empty".to_string(),
            ));
        }
        if address.is_empty() || address.chars().any(char::is_whitespace) {
            return Err(NymgraphError::InvalidContact(format!(
                "'{address}' is not a valid recipient address"
            )));
        }

        let contact = Contact {
            id: Uuid::new_v4(),
            pseudonym_id,
            alias: alias.to_string(),
            address: address.to_string(),
        };
        self.store.insert(contact.clone())?;
        info!("Added contact '{}'", contact.alias);
        Ok(contact)
    }

    /// Remove a contact
    pub fn delete(&self, id: Uuid) -> Result<Contact> {
        self.store
            .remove(id)?
            .ok_or(NymgraphError::ContactNotFound(id))
    }

    /// Remove every contact of a pseudonym
    pub fn delete_for_pseudonym(&self, pseudonym_id: Uuid) -> Result<usize> {
        self.store.retain(|c| c.pseudonym_id != pseudonym_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_dir;

    #[test]
    fn test_contacts_are_partitioned_and_sorted() {
        let dir = create_test_dir();
        let store = ContactStore::open(dir.path().join("contacts.json")).unwrap();
        let mine = Uuid::new_v4();
        let theirs = Uuid::new_v4();

        store.create(mine, "zed", "zed.addr@gw").unwrap();
        store.create(mine, "Amy", "amy.addr@gw").unwrap();
        store.create(theirs, "other", "o.addr@gw").unwrap();

        let aliases: Vec<String> = store
            .for_pseudonym(mine)
            .into_iter()
            .map(|c| c.alias)
            .collect();
        assert_eq!(aliases, ["Amy", "zed"]);

        assert_eq!(store.delete_for_pseudonym(mine).unwrap(), 2);
        assert!(store.for_pseudonym(mine).is_empty());
        assert_eq!(store.for_pseudonym(theirs).len(), 1);
    }

    #[test]
    fn test_invalid_contacts_rejected() {
        let dir = create_test_dir();
        let store = ContactStore::open(dir.path().join("contacts.json")).unwrap();
        let id = Uuid::new_v4();

        assert!(matches!(
            store.create(id, " ", "addr"),
            Err(NymgraphError::InvalidContact(_))
        ));
        assert!(matches!(
            store.create(id, "bob", "has space"),
            Err(NymgraphError::InvalidContact(_))
        ));
        assert!(matches!(
            store.delete(Uuid::new_v4()),
            Err(NymgraphError::ContactNotFound(_))
        ));
    }
}
