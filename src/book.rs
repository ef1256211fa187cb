use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use log::info;
use thiserror::Error;

use crate::api::client::RemoteStore;
use crate::api::events::SyncEvent;
use crate::api::models::Contact;
use crate::csv;
use crate::query::{self, NameSort};
use crate::storage::{self, LocalCache};
use crate::store::{self, ContactStore};
use crate::sync::{self, LoadSource, Persistence};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] store::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// One user session: the working set, where it is mirrored to, and the view state
/// (name sort direction) that lives for the whole process.
pub struct ContactBook {
    store: ContactStore,
    persistence: Persistence,
    sort: NameSort,
    save_error: Option<storage::Error>,
}

impl ContactBook {
    pub fn new(contacts: Vec<Contact>, persistence: Persistence) -> Self {
        Self {
            store: ContactStore::new(contacts),
            persistence,
            sort: NameSort::default(),
            save_error: None,
        }
    }

    /// Loads the starting set (remote, then cache, then empty) and wires up mirroring.
    pub async fn open(remote: Option<Arc<dyn RemoteStore>>, cache: LocalCache) -> (Self, LoadSource) {
        let loaded = sync::load_initial(remote.as_deref(), &cache).await;
        let persistence = Persistence::new(cache, remote);
        (Self::new(loaded.contacts, persistence), loaded.source)
    }

    pub fn contacts(&self) -> &[Contact] {
        self.store.contacts()
    }

    pub fn get(&self, id: &str) -> Option<&Contact> {
        self.store.get(id)
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.persistence.is_remote_enabled()
    }

    fn persist(&mut self, event: Option<SyncEvent>) {
        if let Err(e) = self.persistence.record(self.store.contacts(), event) {
            self.save_error = Some(e);
        }
    }

    /// The last local save failure since this was called, if any.
    pub fn take_save_error(&mut self) -> Option<storage::Error> {
        self.save_error.take()
    }

    pub fn add(&mut self, contact: Contact) -> Result<()> {
        let added = self.store.add(contact)?.clone();
        info!("added contact {}", added.id);
        self.persist(Some(SyncEvent::Added(added)));
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<Contact> {
        let removed = self.store.remove(id)?;
        info!("deleted contact {id}");
        self.persist(Some(SyncEvent::Deleted { id: removed.id.clone() }));
        Ok(removed)
    }

    pub fn undo_delete(&mut self) -> Option<Contact> {
        let restored = self.store.undo_delete()?.clone();
        self.persist(Some(SyncEvent::Added(restored.clone())));
        Some(restored)
    }

    /// Flips the favorite flag; returns the new value.
    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool> {
        let updated = self.store.toggle_favorite(id)?.clone();
        let favorite = updated.favorite;
        self.persist(Some(SyncEvent::Updated(updated)));
        Ok(favorite)
    }

    pub fn update(&mut self, id: &str, contact: Contact) -> Result<()> {
        let updated = self.store.update(id, contact)?.clone();
        info!("updated contact {id}");
        self.persist(Some(SyncEvent::Updated(updated)));
        Ok(())
    }

    /// Replaces the working set with the file's contacts; returns how many were accepted.
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let imported = csv::read_file(path)?;
        let count = imported.len();
        self.store.import(imported);
        info!("imported {count} contacts from {}", path.display());
        self.persist(None);
        Ok(count)
    }

    pub fn export_file(&self, path: &Path) -> Result<usize> {
        csv::write_file(path, self.store.contacts())?;
        Ok(self.store.len())
    }

    /// Reverts the last import. `None` means there was nothing to restore.
    pub fn restore(&mut self) -> Option<usize> {
        let count = self.store.restore()?;
        self.persist(None);
        Some(count)
    }

    pub fn search(&self, query: &str) -> Vec<&Contact> {
        query::search(self.store.contacts(), query)
    }

    pub fn filter_by_category(&self, category: &str) -> Vec<&Contact> {
        query::filter_by_category(self.store.contacts(), category)
    }

    pub fn filter_by_country(&self, country: &str) -> Vec<&Contact> {
        query::filter_by_country(self.store.contacts(), country)
    }

    pub fn favorites(&self) -> Option<Vec<&Contact>> {
        query::favorites(self.store.contacts())
    }

    /// Name-sorted view; ascending on the first call, then alternating.
    pub fn sort_by_name(&mut self) -> Vec<&Contact> {
        self.sort.apply(self.store.contacts())
    }

    pub fn birthday_notice(&self, today: NaiveDate) -> Option<String> {
        query::birthday_notice(self.store.contacts(), today)
    }

    pub fn stats(&self) -> (usize, Vec<(String, usize)>) {
        (self.store.len(), query::count_by_category(self.store.contacts()))
    }

    pub fn set_remote(&mut self, remote: Option<Arc<dyn RemoteStore>>) {
        self.persistence.set_remote(remote);
    }

    /// Waits for queued remote changes before the process exits.
    pub fn shutdown(&mut self) {
        self.persistence.shutdown();
    }
}
