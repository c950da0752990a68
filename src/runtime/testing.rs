//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::session::{SessionBackend, StoreError};
use crate::state_machine::{Fields, PartyKind, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

// ============================================================================
// Mock Registrar
// ============================================================================

/// Records registrations; optionally fails every call
#[derive(Default)]
pub struct MockRegistrar {
    fail: bool,
    pub registrations: Mutex<Vec<(PartyKind, Fields, String)>>,
}

impl MockRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<(PartyKind, Fields, String)> {
        self.registrations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Registrar for MockRegistrar {
    async fn register(
        &self,
        kind: PartyKind,
        fields: &Fields,
        phone: &str,
    ) -> Result<(), CollaboratorError> {
        self.registrations
            .lock()
            .unwrap()
            .push((kind, fields.clone(), phone.to_string()));
        if self.fail {
            return Err(CollaboratorError::Delivery("registry offline".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Mock Trade Ledger
// ============================================================================

#[derive(Default)]
pub struct MockLedger {
    pub orders: Mutex<Vec<(Fields, String)>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<(Fields, String)> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeLedger for MockLedger {
    async fn record_order(&self, fields: &Fields, phone: &str) -> Result<(), CollaboratorError> {
        self.orders
            .lock()
            .unwrap()
            .push((fields.clone(), phone.to_string()));
        Ok(())
    }
}

// ============================================================================
// Mock Notifier
// ============================================================================

/// Records messages; optionally fails every send
#[derive(Default)]
pub struct MockNotifier {
    fail: bool,
    pub messages: Mutex<Vec<(String, String)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, phone: &str, message: &str) -> Result<(), CollaboratorError> {
        self.messages
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        if self.fail {
            return Err(CollaboratorError::Delivery("SMS gateway timeout".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Failing Session Backend
// ============================================================================

/// Backend whose reads succeed with nothing stored and whose writes fail
#[derive(Default)]
pub struct ReadOnlyBackend;

#[async_trait]
impl SessionBackend for ReadOnlyBackend {
    async fn get(&self, _id: &str) -> Result<Option<Session>, StoreError> {
        Ok(None)
    }

    async fn put(&self, _session: &Session) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn delete(&self, _id: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn list(&self) -> Result<Vec<Session>, StoreError> {
        Ok(vec![])
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn delete_idle_since(&self, _cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(0)
    }
}
