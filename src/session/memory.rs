//! In-process session backend

use super::{SessionBackend, StoreError};
use crate::state_machine::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Sessions held in a sharded concurrent map; lost on restart
#[derive(Default)]
pub struct MemoryBackend {
    sessions: DashMap<String, Session>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        sessions.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(sessions)
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let count = self.sessions.len();
        self.sessions.clear();
        Ok(count)
    }

    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.last_activity >= cutoff);
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
