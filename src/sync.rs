//! Mirrors the working set to the local cache (synchronously) and to the remote service
//! (in the background, at most one attempt per change, never reconciled).

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::client::{self, RemoteStore};
use crate::api::events::SyncEvent;
use crate::api::models::Contact;
use crate::storage::{self, LocalCache};
use crate::utils;

async fn apply(remote: &dyn RemoteStore, event: &SyncEvent) -> client::Result<()> {
    match event {
        SyncEvent::Added(c) => remote.add(c).await,
        SyncEvent::Deleted { id } => remote.delete(id).await,
        SyncEvent::Updated(c) => remote.update(&c.id, c).await,
    }
}

/// Background worker pushing changes to the remote service in the order they were made.
pub struct RemoteSync {
    tx: Option<mpsc::UnboundedSender<SyncEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl RemoteSync {
    pub fn start(remote: Arc<dyn RemoteStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SyncEvent>();
        let worker = utils::spawn_async(async move {
            while let Some(event) = rx.recv().await {
                match apply(remote.as_ref(), &event).await {
                    Ok(()) => debug!("mirrored {} for contact {}", kind(&event), event.contact_id()),
                    Err(e) => warn!(
                        "failed to mirror {} for contact {} to remote: {e}",
                        kind(&event),
                        event.contact_id()
                    ),
                }
            }
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    pub fn push(&self, event: SyncEvent) {
        let Some(tx) = &self.tx else {
            debug!("remote sync stopped, dropping change for {}", event.contact_id());
            return;
        };
        if let Err(e) = tx.send(event) {
            warn!("remote sync worker is gone, dropping change for {}", e.0.contact_id());
        }
    }

    /// Closes the queue and waits until every queued change has been attempted.
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = utils::block_on(worker) {
                error!("remote sync worker failed: {e}");
            }
        }
    }
}

fn kind(event: &SyncEvent) -> &'static str {
    match event {
        SyncEvent::Added(_) => "add",
        SyncEvent::Deleted { .. } => "delete",
        SyncEvent::Updated(_) => "update",
    }
}

/// The persistence adapter: every mutation lands here once it has succeeded in memory.
pub struct Persistence {
    cache: LocalCache,
    remote: Option<RemoteSync>,
}

impl Persistence {
    pub fn new(cache: LocalCache, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self {
            cache,
            remote: remote.map(RemoteSync::start),
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Writes the full set to the cache, then queues `event` for the remote service.
    /// A cache failure is logged and returned, and the remote change is still queued.
    pub fn record(&self, contacts: &[Contact], event: Option<SyncEvent>) -> storage::Result<()> {
        let saved = self.cache.save_contacts(contacts);
        if let Err(e) = &saved {
            error!("failed to save {} contacts locally: {e}", contacts.len());
        }
        match (event, &self.remote) {
            (Some(event), Some(remote)) => remote.push(event),
            (Some(event), None) => debug!("remote disabled, {} kept local only", event.contact_id()),
            (None, Some(_)) => debug!("bulk change has no remote counterpart, kept local only"),
            (None, None) => {}
        }
        saved
    }

    /// Swaps the remote service, draining the old one first.
    pub fn set_remote(&mut self, remote: Option<Arc<dyn RemoteStore>>) {
        if let Some(mut old) = self.remote.take() {
            old.shutdown();
        }
        self.remote = remote.map(RemoteSync::start);
    }

    pub fn shutdown(&mut self) {
        if let Some(remote) = self.remote.as_mut() {
            remote.shutdown();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    LocalCache,
    Empty,
}

#[derive(Debug)]
pub struct Loaded {
    pub contacts: Vec<Contact>,
    pub source: LoadSource,
}

/// Startup load: remote first, then the local cache, then nothing.
/// The cache is only read here; it is rewritten by the first mutation.
pub async fn load_initial(remote: Option<&dyn RemoteStore>, cache: &LocalCache) -> Loaded {
    if let Some(remote) = remote {
        match remote.fetch_all().await {
            Ok(contacts) => {
                info!("loaded {} contacts from remote", contacts.len());
                return Loaded {
                    contacts,
                    source: LoadSource::Remote,
                };
            }
            Err(e) => warn!("failed to load contacts from remote, falling back to local cache: {e}"),
        }
    }
    match cache.load_contacts() {
        Ok(Some(contacts)) => {
            info!("loaded {} contacts from local cache", contacts.len());
            Loaded {
                contacts,
                source: LoadSource::LocalCache,
            }
        }
        Ok(None) => {
            info!("no cached contacts, starting empty");
            Loaded {
                contacts: Vec::new(),
                source: LoadSource::Empty,
            }
        }
        Err(e) => {
            warn!("local cache unreadable, starting empty: {e}");
            Loaded {
                contacts: Vec::new(),
                source: LoadSource::Empty,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::{Error as ClientError, MockRemoteStore};
    use mockall::Sequence;
    use tempfile::TempDir;

    fn contact(id: &str) -> Contact {
        Contact {
            id: id.into(),
            first_name: format!("First{id}"),
            ..Default::default()
        }
    }

    fn cache_in(dir: &TempDir) -> LocalCache {
        LocalCache::open_default(Some(dir.path())).unwrap()
    }

    #[test]
    fn events_reach_remote_in_mutation_order() {
        let mut remote = MockRemoteStore::new();
        let mut seq = Sequence::new();
        remote
            .expect_add()
            .withf(|c: &Contact| c.id == "1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        remote
            .expect_update()
            .withf(|id: &str, c: &Contact| id == "1" && c.favorite)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        remote
            .expect_delete()
            .withf(|id: &str| id == "1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let remote = Arc::new(remote);
        let dir = TempDir::new().unwrap();
        let mut persistence = Persistence::new(cache_in(&dir), Some(remote.clone() as Arc<dyn RemoteStore>));
        let mut c = contact("1");
        persistence.record(&[c.clone()], Some(SyncEvent::Added(c.clone()))).unwrap();
        c.favorite = true;
        persistence.record(&[c.clone()], Some(SyncEvent::Updated(c))).unwrap();
        persistence
            .record(&[], Some(SyncEvent::Deleted { id: "1".into() }))
            .unwrap();
        persistence.shutdown();
    }

    #[test]
    fn remote_failures_do_not_touch_local_state() {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_add()
            .times(1)
            .returning(|_| Err(ClientError::Status(reqwest::StatusCode::CONFLICT)));

        let remote = Arc::new(remote);
        let dir = TempDir::new().unwrap();
        let mut persistence = Persistence::new(cache_in(&dir), Some(remote.clone() as Arc<dyn RemoteStore>));
        let c = contact("1");
        assert!(persistence.record(&[c.clone()], Some(SyncEvent::Added(c.clone()))).is_ok());
        persistence.shutdown();
        assert_eq!(persistence.cache().load_contacts().unwrap(), Some(vec![c]));
    }

    #[test]
    fn bulk_changes_stay_local() {
        let remote = MockRemoteStore::new();
        let dir = TempDir::new().unwrap();
        let mut persistence = Persistence::new(cache_in(&dir), Some(Arc::new(remote)));
        persistence.record(&[contact("1"), contact("2")], None).unwrap();
        persistence.shutdown();
        assert_eq!(persistence.cache().load_contacts().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn cache_failure_is_reported_but_remote_still_queued() {
        let mut remote = MockRemoteStore::new();
        remote.expect_delete().times(1).returning(|_| Ok(()));
        let remote = Arc::new(remote);
        let dir = TempDir::new().unwrap();
        // a directory where the database file should be
        let blocked = dir.path().join("cache.sqlite");
        std::fs::create_dir_all(&blocked).unwrap();
        let mut persistence =
            Persistence::new(LocalCache::new(blocked), Some(remote.clone() as Arc<dyn RemoteStore>));
        let result = persistence.record(&[], Some(SyncEvent::Deleted { id: "9".into() }));
        assert!(result.is_err());
        persistence.shutdown();
    }

    #[test]
    fn set_remote_drains_the_old_worker() {
        let mut first = MockRemoteStore::new();
        first.expect_add().times(1).returning(|_| Ok(()));
        let first = Arc::new(first);
        let dir = TempDir::new().unwrap();
        let mut persistence = Persistence::new(cache_in(&dir), Some(first.clone() as Arc<dyn RemoteStore>));
        let c = contact("1");
        persistence.record(&[c.clone()], Some(SyncEvent::Added(c))).unwrap();
        persistence.set_remote(None);
        assert!(!persistence.is_remote_enabled());
        persistence
            .record(&[], Some(SyncEvent::Deleted { id: "1".into() }))
            .unwrap();
    }

    #[tokio::test]
    async fn load_prefers_remote_and_leaves_cache_alone() {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_fetch_all()
            .times(1)
            .returning(|| Ok(vec![contact("r1")]));
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.save_contacts(&[contact("old")]).unwrap();

        let loaded = load_initial(Some(&remote), &cache).await;
        assert_eq!(loaded.source, LoadSource::Remote);
        assert_eq!(loaded.contacts, vec![contact("r1")]);
        assert_eq!(cache.load_contacts().unwrap(), Some(vec![contact("old")]));
    }

    #[tokio::test]
    async fn load_falls_back_to_cache_when_remote_fails() {
        let mut remote = MockRemoteStore::new();
        remote
            .expect_fetch_all()
            .times(1)
            .returning(|| Err(ClientError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR)));
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.save_contacts(&[contact("c1")]).unwrap();

        let loaded = load_initial(Some(&remote), &cache).await;
        assert_eq!(loaded.source, LoadSource::LocalCache);
        assert_eq!(loaded.contacts, vec![contact("c1")]);
    }

    #[tokio::test]
    async fn load_starts_empty_without_remote_or_cache() {
        let dir = TempDir::new().unwrap();
        let loaded = load_initial(None, &cache_in(&dir)).await;
        assert_eq!(loaded.source, LoadSource::Empty);
        assert!(loaded.contacts.is_empty());
    }

    #[tokio::test]
    async fn unreadable_cache_starts_empty() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let conn = rusqlite::Connection::open(cache.path()).unwrap();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES ('contacts', '[{', 0)",
            [],
        )
        .unwrap();
        let loaded = load_initial(None, &cache).await;
        assert_eq!(loaded.source, LoadSource::Empty);
    }
}
