//! Side effects produced by terminal transitions

use super::Fields;
use serde::{Deserialize, Serialize};

/// Kind of party a registration creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Farmer,
    Buyer,
}

/// Deferred, best-effort call to an external collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write a farmer or buyer registration
    Register {
        kind: PartyKind,
        fields: Fields,
        phone: String,
    },

    /// Record a trade order
    PlaceOrder { fields: Fields, phone: String },

    /// Send an SMS to the caller
    Notify { phone: String, message: String },
}

impl Effect {
    pub fn register(kind: PartyKind, fields: Fields, phone: impl Into<String>) -> Self {
        Effect::Register {
            kind,
            fields,
            phone: phone.into(),
        }
    }

    pub fn place_order(fields: Fields, phone: impl Into<String>) -> Self {
        Effect::PlaceOrder {
            fields,
            phone: phone.into(),
        }
    }

    pub fn notify(phone: impl Into<String>, message: impl Into<String>) -> Self {
        Effect::Notify {
            phone: phone.into(),
            message: message.into(),
        }
    }

    /// Stable name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::Register {
                kind: PartyKind::Farmer,
                ..
            } => "register_farmer",
            Effect::Register {
                kind: PartyKind::Buyer,
                ..
            } => "register_buyer",
            Effect::PlaceOrder { .. } => "place_order",
            Effect::Notify { .. } => "notify",
        }
    }
}
