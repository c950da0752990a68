//! `SQLite` session backend, so sessions survive a restart within their expiry window

use super::{SessionBackend, StoreError};
use crate::db::{Database, SessionRow};
use crate::menu::MenuId;
use crate::state_machine::{MenuState, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Clone)]
pub struct DatabaseBackend {
    db: Database,
    root: MenuId,
}

impl DatabaseBackend {
    pub fn new(db: Database, root: MenuId) -> Self {
        Self { db, root }
    }

    /// Rows naming a menu this build no longer knows restart at the root
    fn session_from_row(&self, row: SessionRow) -> Session {
        let state = match MenuId::parse(&row.menu) {
            Ok(menu) => MenuState {
                menu,
                step: row.step,
                fields: row.fields,
            },
            Err(e) => {
                tracing::error!(
                    session_id = %row.id,
                    error = %e,
                    "Stored session references unknown menu, resetting to root"
                );
                MenuState::at(self.root)
            }
        };

        Session {
            id: row.id,
            phone: row.phone,
            state,
            inputs_seen: row.inputs_seen,
            created_at: row.created_at,
            last_activity: row.last_activity,
        }
    }
}

fn to_row(session: &Session) -> SessionRow {
    SessionRow {
        id: session.id.clone(),
        phone: session.phone.clone(),
        menu: session.state.menu.as_str().to_string(),
        step: session.state.step,
        fields: session.state.fields.clone(),
        inputs_seen: session.inputs_seen,
        created_at: session.created_at,
        last_activity: session.last_activity,
    }
}

#[async_trait]
impl SessionBackend for DatabaseBackend {
    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.db.get_session(id)?.map(|row| self.session_from_row(row)))
    }

    async fn put(&self, session: &Session) -> Result<(), StoreError> {
        Ok(self.db.put_session(&to_row(session))?)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.db.delete_session(id)?)
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .db
            .list_sessions()?
            .into_iter()
            .map(|row| self.session_from_row(row))
            .collect())
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        Ok(self.db.clear_sessions()?)
    }

    async fn delete_idle_since(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(self.db.delete_sessions_idle_since(cutoff)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> DatabaseBackend {
        DatabaseBackend::new(Database::open_in_memory().unwrap(), MenuId::Main)
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let backend = backend();
        let mut session = Session::new("ATUid_1", "+255700000001", MenuId::CreateOrder);
        session.state.step = 2;
        session
            .state
            .fields
            .insert("crop".to_string(), "Mchele".to_string());
        session.inputs_seen = 4;

        backend.put(&session).await.unwrap();
        let loaded = backend.get("ATUid_1").await.unwrap().unwrap();
        assert_eq!(loaded.state, session.state);
        assert_eq!(loaded.inputs_seen, 4);
        assert_eq!(loaded.phone, session.phone);
    }

    #[tokio::test]
    async fn test_unknown_menu_loads_at_root() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        db.put_session(&SessionRow {
            id: "ATUid_1".to_string(),
            phone: "+255700000001".to_string(),
            menu: "weather_alerts".to_string(),
            step: 3,
            fields: crate::state_machine::Fields::new(),
            inputs_seen: 5,
            created_at: now,
            last_activity: now,
        })
        .unwrap();

        let backend = DatabaseBackend::new(db, MenuId::Main);
        let session = backend.get("ATUid_1").await.unwrap().unwrap();
        assert!(session.state.is_at(MenuId::Main));
        assert_eq!(session.state.step, 0);
        assert_eq!(session.inputs_seen, 5);
    }

    #[tokio::test]
    async fn test_store_over_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let ttl = std::time::Duration::from_mins(2);

        {
            let backend = DatabaseBackend::new(Database::open(&path).unwrap(), MenuId::Main);
            let store = crate::session::SessionStore::new(std::sync::Arc::new(backend), ttl, MenuId::Main);
            let mut lease = store.checkout("ATUid_1", "+255700000001").await.unwrap();
            lease.session_mut().state = MenuState::at(MenuId::Orders);
            lease.save().await.unwrap();
        }

        let backend = DatabaseBackend::new(Database::open(&path).unwrap(), MenuId::Main);
        let store = crate::session::SessionStore::new(std::sync::Arc::new(backend), ttl, MenuId::Main);
        let session = store.load_or_create("ATUid_1", "+255700000001").await.unwrap();
        assert!(session.state.is_at(MenuId::Orders));
    }
}
