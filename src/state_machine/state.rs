//! Session state types

use crate::menu::MenuId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Collected form values keyed by field name
pub type Fields = BTreeMap<String, String>;

/// Position in the menu graph
///
/// `step` and `fields` only carry meaning inside a multi-step form and are
/// reset whenever `menu` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuState {
    pub menu: MenuId,
    pub step: usize,
    #[serde(default)]
    pub fields: Fields,
}

impl MenuState {
    /// Fresh state at the given menu
    pub fn at(menu: MenuId) -> Self {
        Self {
            menu,
            step: 0,
            fields: Fields::new(),
        }
    }

    pub fn is_at(&self, menu: MenuId) -> bool {
        self.menu == menu
    }
}

/// Per-call conversational state, keyed by the gateway's session identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub phone: String,
    pub state: MenuState,
    /// Number of gateway inputs already applied to `state`
    pub inputs_seen: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, phone: impl Into<String>, root: MenuId) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            phone: phone.into(),
            state: MenuState::at(root),
            inputs_seen: 0,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_activity > ttl
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}
