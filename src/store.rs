use crate::api::models::Contact;
use crate::guard::is_duplicate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("duplicate contact (same email {email:?} and phone {phone:?}) not allowed")]
    Duplicate { email: String, phone: String },

    #[error("no contact with id {0:?}")]
    NotFound(String),
}

/// The working set: the single writable copy of all contacts, plus the pre-import snapshot.
#[derive(Debug, Default)]
pub struct ContactStore {
    contacts: Vec<Contact>,
    snapshot: Option<Vec<Contact>>,
    last_deleted: Option<Contact>,
}

impl ContactStore {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts,
            ..Default::default()
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn add(&mut self, contact: Contact) -> Result<&Contact> {
        if is_duplicate(&contact, &self.contacts) {
            return Err(Error::Duplicate {
                email: contact.email,
                phone: contact.phone,
            });
        }
        self.contacts.push(contact);
        Ok(&self.contacts[self.contacts.len() - 1])
    }

    /// Removes the first contact carrying `id` and remembers it for [`Self::undo_delete`].
    pub fn remove(&mut self, id: &str) -> Result<Contact> {
        let idx = self.position(id)?;
        let removed = self.contacts.remove(idx);
        self.last_deleted = Some(removed.clone());
        Ok(removed)
    }

    pub fn toggle_favorite(&mut self, id: &str) -> Result<&Contact> {
        let idx = self.position(id)?;
        let c = &mut self.contacts[idx];
        c.favorite = !c.favorite;
        Ok(&*c)
    }

    /// Replaces the record in place. Position, id and the favorite flag survive the edit.
    pub fn update(&mut self, id: &str, mut contact: Contact) -> Result<&Contact> {
        let idx = self.position(id)?;
        let slot = &mut self.contacts[idx];
        contact.id = slot.id.clone();
        contact.favorite = slot.favorite;
        *slot = contact;
        Ok(&*slot)
    }

    /// Swaps in an imported set, keeping the current one as the restore point.
    pub fn import(&mut self, contacts: Vec<Contact>) {
        let previous = std::mem::replace(&mut self.contacts, contacts);
        self.snapshot = Some(previous);
    }

    /// Brings back the pre-import set. Consumes the snapshot, so it works once per import.
    /// Returns `None` when there is nothing to restore.
    pub fn restore(&mut self) -> Option<usize> {
        let snapshot = self.snapshot.take().filter(|s| !s.is_empty())?;
        self.contacts = snapshot;
        Some(self.contacts.len())
    }

    /// Re-appends the most recently deleted contact, if any.
    pub fn undo_delete(&mut self) -> Option<&Contact> {
        let contact = self.last_deleted.take()?;
        self.contacts.push(contact);
        self.contacts.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: &str, email: &str, phone: &str) -> Contact {
        Contact {
            id: id.into(),
            first_name: format!("First{id}"),
            email: email.into(),
            phone: phone.into(),
            ..Default::default()
        }
    }

    fn ids(store: &ContactStore) -> Vec<&str> {
        store.contacts().iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut store = ContactStore::default();
        store.add(contact("1", "a@x.com", "555")).unwrap();
        let err = store.add(contact("2", "a@x.com", "555")).unwrap_err();
        assert_eq!(
            err,
            Error::Duplicate {
                email: "a@x.com".into(),
                phone: "555".into()
            }
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn same_email_different_phone_is_accepted() {
        let mut store = ContactStore::default();
        store.add(contact("1", "a@x.com", "555")).unwrap();
        store.add(contact("2", "a@x.com", "556")).unwrap();
        assert_eq!(ids(&store), vec!["1", "2"]);
    }

    #[test]
    fn removing_the_only_contact_leaves_empty_set() {
        let mut store = ContactStore::new(vec![contact("1", "", "")]);
        let removed = store.remove("1").unwrap();
        assert_eq!(removed.id, "1");
        assert!(store.is_empty());
    }

    #[test]
    fn remove_resolves_by_id_not_position() {
        let mut store = ContactStore::new(vec![
            contact("a", "1", "1"),
            contact("b", "2", "2"),
            contact("c", "3", "3"),
        ]);
        store.remove("c").unwrap();
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.remove("zzz"), Err(Error::NotFound("zzz".into())));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn toggle_flips_in_place() {
        let mut store = ContactStore::new(vec![contact("1", "", "")]);
        assert!(store.toggle_favorite("1").unwrap().favorite);
        assert!(!store.toggle_favorite("1").unwrap().favorite);
        assert!(store.toggle_favorite("2").is_err());
    }

    #[test]
    fn update_keeps_position_id_and_favorite() {
        let mut store = ContactStore::new(vec![contact("1", "", ""), contact("2", "", "")]);
        store.toggle_favorite("1").unwrap();
        let edited = Contact {
            id: "ignored".into(),
            first_name: "Changed".into(),
            ..Default::default()
        };
        let updated = store.update("1", edited).unwrap();
        assert_eq!(updated.id, "1");
        assert_eq!(updated.first_name, "Changed");
        assert!(updated.favorite);
        assert_eq!(ids(&store), vec!["1", "2"]);
    }

    #[test]
    fn update_bypasses_duplicate_guard() {
        let mut store = ContactStore::new(vec![
            contact("1", "a@x.com", "555"),
            contact("2", "b@x.com", "556"),
        ]);
        store.update("2", contact("2", "a@x.com", "555")).unwrap();
        assert_eq!(store.get("2").unwrap().email, "a@x.com");
    }

    #[test]
    fn restore_works_once_per_import() {
        let mut store = ContactStore::new(vec![contact("1", "", "")]);
        store.import(vec![contact("9", "", "")]);
        assert_eq!(ids(&store), vec!["9"]);
        assert_eq!(store.restore(), Some(1));
        assert_eq!(ids(&store), vec!["1"]);
        assert_eq!(store.restore(), None);
        assert_eq!(ids(&store), vec!["1"]);
    }

    #[test]
    fn restore_without_import_reports_nothing() {
        let mut store = ContactStore::new(vec![contact("1", "", "")]);
        assert_eq!(store.restore(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn undo_reappends_last_deleted_once() {
        let mut store = ContactStore::new(vec![contact("1", "", ""), contact("2", "", "")]);
        store.remove("1").unwrap();
        assert_eq!(store.undo_delete().map(|c| c.id.clone()), Some("1".to_string()));
        assert_eq!(ids(&store), vec!["2", "1"]);
        assert!(store.undo_delete().is_none());
    }
}
