//! Database schema and types

use crate::state_machine::Fields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS farmers (
    id TEXT PRIMARY KEY,
    phone TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    crop_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS buyers (
    id TEXT PRIMARY KEY,
    phone TEXT NOT NULL UNIQUE,
    business_name TEXT NOT NULL,
    location TEXT NOT NULL,
    business_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    phone TEXT NOT NULL,
    order_type TEXT NOT NULL,
    crop TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    price INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_phone ON orders(phone, created_at DESC);

CREATE TABLE IF NOT EXISTS ussd_sessions (
    id TEXT PRIMARY KEY,
    phone TEXT NOT NULL,
    menu TEXT NOT NULL,
    step INTEGER NOT NULL DEFAULT 0,
    fields TEXT NOT NULL DEFAULT '{}',
    inputs_seen INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_activity TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ussd_sessions_activity ON ussd_sessions(last_activity);
";

/// Registered farmer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Farmer {
    pub id: String,
    pub phone: String,
    pub name: String,
    pub location: String,
    pub crop_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registered buyer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Buyer {
    pub id: String,
    pub phone: String,
    pub business_name: String,
    pub location: String,
    pub business_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Buy,
    Sell,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Buy => "buy",
            OrderType::Sell => "sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(OrderType::Buy),
            "sell" => Some(OrderType::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade order placed over USSD
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    pub phone: String,
    /// Stored in the `order_type` column
    pub kind: OrderType,
    pub crop: String,
    /// Kilograms
    pub quantity: u64,
    /// `TSh` per kilogram
    pub price: u64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[allow(dead_code)] // Used in tests
    pub fn total(&self) -> Option<u64> {
        self.quantity.checked_mul(self.price)
    }
}

/// Persisted USSD session
///
/// `menu` is kept as stored text; mapping it back onto the menu registry is
/// the session backend's job.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionRow {
    pub id: String,
    pub phone: String,
    pub menu: String,
    pub step: usize,
    pub fields: Fields,
    pub inputs_seen: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}
