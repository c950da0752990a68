//! Session store
//!
//! Keyed, time-bounded storage of USSD sessions. The store is the only shared
//! mutable resource: every mutation of one session id happens while holding
//! that id's async mutex, and different ids never contend.

mod database;
mod memory;

pub use database::DatabaseBackend;
pub use memory::MemoryBackend;

use crate::db::DbError;
use crate::menu::MenuId;
use crate::state_machine::Session;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Session backend unavailable: {0}")]
    #[allow(dead_code)] // Used in tests
    Unavailable(String),
}

/// Raw persistence for sessions. Expiry and locking live in [`SessionStore`].
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError>;

    async fn put(&self, session: &Session) -> Result<(), StoreError>;

    /// Returns whether a session existed
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn list(&self) -> Result<Vec<Session>, StoreError>;

    async fn clear(&self) -> Result<usize, StoreError>;

    /// Delete sessions whose last activity is before the cutoff
    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

#[async_trait]
impl<T: SessionBackend + ?Sized> SessionBackend for Arc<T> {
    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        (**self).get(id).await
    }

    async fn put(&self, session: &Session) -> Result<(), StoreError> {
        (**self).put(session).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        (**self).list().await
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        (**self).clear().await
    }

    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        (**self).delete_idle_since(cutoff).await
    }
}

/// Session store with lazy expiry and per-id serialization
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    ttl: Duration,
    root: MenuId,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>, ttl: std::time::Duration, root: MenuId) -> Self {
        Self {
            backend,
            locks: DashMap::new(),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            root,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn in_memory(ttl: std::time::Duration, root: MenuId) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), ttl, root)
    }

    /// Existing unexpired session, or a fresh one at the root menu.
    /// An expired record is deleted before its replacement is created.
    ///
    /// Does not take the per-id lock; use [`SessionStore::checkout`] for a
    /// read-modify-write cycle.
    pub async fn load_or_create(&self, id: &str, phone: &str) -> Result<Session, StoreError> {
        if let Some(session) = self.backend.get(id).await? {
            if !session.is_expired(Utc::now(), self.ttl) {
                return Ok(session);
            }
            tracing::debug!(session_id = %id, "Session expired, starting over");
            self.backend.delete(id).await?;
        }
        Ok(Session::new(id, phone, self.root))
    }

    /// Persist a session and refresh its last activity
    pub async fn save(&self, session: &mut Session) -> Result<(), StoreError> {
        session.touch();
        self.backend.put(session).await
    }

    pub async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        self.backend.delete(id).await
    }

    /// Delete every session idle beyond the expiry window
    pub async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let Some(cutoff) = Utc::now().checked_sub_signed(self.ttl) else {
            return Ok(0);
        };
        let removed = self.backend.delete_idle_since(cutoff).await?;
        // A lock referenced only by the map has no holder and no waiter
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(removed)
    }

    /// Lock the session id and load (or create) its session
    pub async fn checkout(&self, id: &str, phone: &str) -> Result<SessionLease<'_>, StoreError> {
        let lock = Arc::clone(self.locks.entry(id.to_string()).or_default().value());
        let guard = lock.lock_owned().await;
        let session = self.load_or_create(id, phone).await?;
        Ok(SessionLease {
            store: self,
            session,
            _guard: guard,
        })
    }

    pub async fn list(&self) -> Result<Vec<Session>, StoreError> {
        self.backend.list().await
    }

    pub async fn clear(&self) -> Result<usize, StoreError> {
        self.backend.clear().await
    }

    /// Start the periodic sweep; stops when the token is cancelled
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: std::time::Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => match store.sweep_expired().await {
                        Ok(0) => {}
                        Ok(removed) => tracing::info!(removed, "Swept expired USSD sessions"),
                        Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
                    },
                }
            }
            tracing::info!("Session sweeper stopped");
        })
    }
}

/// Exclusive access to one session until dropped
pub struct SessionLease<'a> {
    store: &'a SessionStore,
    session: Session,
    _guard: OwnedMutexGuard<()>,
}

impl SessionLease<'_> {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Persist and release the lock
    pub async fn save(mut self) -> Result<Session, StoreError> {
        self.store.save(&mut self.session).await?;
        Ok(self.session)
    }

    /// Delete and release the lock
    pub async fn remove(self) -> Result<(), StoreError> {
        self.store.remove(&self.session.id).await?;
        Ok(())
    }
}
