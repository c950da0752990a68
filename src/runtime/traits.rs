//! Trait abstractions for side-effect collaborators
//!
//! These traits enable testing the dispatcher with mock implementations.

use crate::db::{Database, OrderType};
use crate::menu::{
    FIELD_BUSINESS_NAME, FIELD_BUSINESS_TYPE, FIELD_CROP, FIELD_CROP_TYPE, FIELD_LOCATION,
    FIELD_NAME, FIELD_ORDER_TYPE, FIELD_PRICE, FIELD_QUANTITY,
};
use crate::state_machine::{Fields, PartyKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for field {field}: {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("Storage error: {0}")]
    Storage(#[from] crate::db::DbError),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Record keeping for registered parties
#[async_trait]
pub trait Registrar: Send + Sync {
    async fn register(
        &self,
        kind: PartyKind,
        fields: &Fields,
        phone: &str,
    ) -> Result<(), CollaboratorError>;
}

/// Record keeping for trade orders
#[async_trait]
pub trait TradeLedger: Send + Sync {
    async fn record_order(&self, fields: &Fields, phone: &str) -> Result<(), CollaboratorError>;
}

/// Outbound SMS delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, phone: &str, message: &str) -> Result<(), CollaboratorError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Registrar + ?Sized> Registrar for Arc<T> {
    async fn register(
        &self,
        kind: PartyKind,
        fields: &Fields,
        phone: &str,
    ) -> Result<(), CollaboratorError> {
        (**self).register(kind, fields, phone).await
    }
}

#[async_trait]
impl<T: TradeLedger + ?Sized> TradeLedger for Arc<T> {
    async fn record_order(&self, fields: &Fields, phone: &str) -> Result<(), CollaboratorError> {
        (**self).record_order(fields, phone).await
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn notify(&self, phone: &str, message: &str) -> Result<(), CollaboratorError> {
        (**self).notify(phone, message).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as Registrar and `TradeLedger`
#[derive(Clone)]
pub struct DatabaseRegistrar {
    db: Database,
}

impl DatabaseRegistrar {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn field<'a>(fields: &'a Fields, name: &'static str) -> Result<&'a str, CollaboratorError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or(CollaboratorError::MissingField(name))
}

fn number_field(fields: &Fields, name: &'static str) -> Result<u64, CollaboratorError> {
    let raw = field(fields, name)?;
    raw.parse().map_err(|_| CollaboratorError::InvalidField {
        field: name,
        value: raw.to_string(),
    })
}

#[async_trait]
impl Registrar for DatabaseRegistrar {
    async fn register(
        &self,
        kind: PartyKind,
        fields: &Fields,
        phone: &str,
    ) -> Result<(), CollaboratorError> {
        match kind {
            PartyKind::Farmer => {
                let farmer = self.db.register_farmer(
                    phone,
                    field(fields, FIELD_NAME)?,
                    field(fields, FIELD_LOCATION)?,
                    field(fields, FIELD_CROP_TYPE)?,
                )?;
                tracing::info!(farmer_id = %farmer.id, phone = %phone, "Farmer registered");
            }
            PartyKind::Buyer => {
                let buyer = self.db.register_buyer(
                    phone,
                    field(fields, FIELD_BUSINESS_NAME)?,
                    field(fields, FIELD_LOCATION)?,
                    field(fields, FIELD_BUSINESS_TYPE)?,
                )?;
                tracing::info!(buyer_id = %buyer.id, phone = %phone, "Buyer registered");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TradeLedger for DatabaseRegistrar {
    async fn record_order(&self, fields: &Fields, phone: &str) -> Result<(), CollaboratorError> {
        let raw_type = field(fields, FIELD_ORDER_TYPE)?;
        let order_type =
            OrderType::parse(raw_type).ok_or_else(|| CollaboratorError::InvalidField {
                field: FIELD_ORDER_TYPE,
                value: raw_type.to_string(),
            })?;

        let order = self.db.create_order(
            phone,
            order_type,
            field(fields, FIELD_CROP)?,
            number_field(fields, FIELD_QUANTITY)?,
            number_field(fields, FIELD_PRICE)?,
        )?;
        tracing::info!(
            order_id = %order.id,
            order_type = %order.kind,
            crop = %order.crop,
            quantity = order.quantity,
            "Order recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_database_registrar_registers_farmer() {
        let db = Database::open_in_memory().unwrap();
        let registrar = DatabaseRegistrar::new(db.clone());

        registrar
            .register(
                PartyKind::Farmer,
                &fields(&[("name", "Asha"), ("location", "Mwanza"), ("crop_type", "Maize")]),
                "+255700000001",
            )
            .await
            .unwrap();

        assert_eq!(db.get_farmer_by_phone("+255700000001").unwrap().crop_type, "Maize");
    }

    #[tokio::test]
    async fn test_missing_field_is_reported() {
        let registrar = DatabaseRegistrar::new(Database::open_in_memory().unwrap());
        let err = registrar
            .register(PartyKind::Buyer, &fields(&[("location", "Arusha")]), "+255700000002")
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::MissingField("business_name")));
    }

    #[tokio::test]
    async fn test_record_order() {
        let db = Database::open_in_memory().unwrap();
        let ledger = DatabaseRegistrar::new(db.clone());

        ledger
            .record_order(
                &fields(&[
                    ("order_type", "sell"),
                    ("crop", "Mchele"),
                    ("quantity", "100"),
                    ("price", "1200"),
                ]),
                "+255700000001",
            )
            .await
            .unwrap();

        let orders = db.list_orders_for_phone("+255700000001").unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].kind, OrderType::Sell);
        assert_eq!(orders[0].total(), Some(120_000));
    }

    #[tokio::test]
    async fn test_record_order_rejects_bad_type() {
        let ledger = DatabaseRegistrar::new(Database::open_in_memory().unwrap());
        let err = ledger
            .record_order(
                &fields(&[
                    ("order_type", "barter"),
                    ("crop", "Mchele"),
                    ("quantity", "1"),
                    ("price", "1"),
                ]),
                "+255700000001",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidField { field: "order_type", .. }));
    }
}
