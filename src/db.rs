//! Database module for `AgriConnect` USSD
//!
//! Provides persistence for registrations, trade orders and (optionally)
//! USSD sessions.

mod schema;

pub use schema::*;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Farmer not found: {0}")]
    FarmerNotFound(String),
    #[error("Buyer not found: {0}")]
    BuyerNotFound(String),
    #[error("Value out of range for column {0}")]
    OutOfRange(&'static str),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// A panic while holding the lock cannot leave a half-applied statement
    /// behind, so a poisoned connection is still usable.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Registration Operations ====================

    /// Register a farmer, updating the existing record for a known phone
    pub fn register_farmer(
        &self,
        phone: &str,
        name: &str,
        location: &str,
        crop_type: &str,
    ) -> DbResult<Farmer> {
        let conn = self.conn();
        let now = format_datetime(Utc::now());

        conn.execute(
            "INSERT INTO farmers (id, phone, name, location, crop_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(phone) DO UPDATE SET
                name = excluded.name,
                location = excluded.location,
                crop_type = excluded.crop_type,
                updated_at = excluded.updated_at",
            params![new_id(), phone, name, location, crop_type, now],
        )?;

        query_farmer(&conn, phone)
    }

    /// Get farmer by phone number
    #[allow(dead_code)] // Used in tests
    pub fn get_farmer_by_phone(&self, phone: &str) -> DbResult<Farmer> {
        query_farmer(&self.conn(), phone)
    }

    /// Register a buyer, updating the existing record for a known phone
    pub fn register_buyer(
        &self,
        phone: &str,
        business_name: &str,
        location: &str,
        business_type: &str,
    ) -> DbResult<Buyer> {
        let conn = self.conn();
        let now = format_datetime(Utc::now());

        conn.execute(
            "INSERT INTO buyers (id, phone, business_name, location, business_type, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(phone) DO UPDATE SET
                business_name = excluded.business_name,
                location = excluded.location,
                business_type = excluded.business_type,
                updated_at = excluded.updated_at",
            params![new_id(), phone, business_name, location, business_type, now],
        )?;

        query_buyer(&conn, phone)
    }

    /// Get buyer by phone number
    #[allow(dead_code)] // Used in tests
    pub fn get_buyer_by_phone(&self, phone: &str) -> DbResult<Buyer> {
        query_buyer(&self.conn(), phone)
    }

    // ==================== Order Operations ====================

    /// Record a new pending order
    pub fn create_order(
        &self,
        phone: &str,
        order_type: OrderType,
        crop: &str,
        quantity: u64,
        price: u64,
    ) -> DbResult<Order> {
        let conn = self.conn();
        let id = new_id();
        let now = Utc::now();
        let sql_quantity = i64::try_from(quantity).map_err(|_| DbError::OutOfRange("quantity"))?;
        let sql_price = i64::try_from(price).map_err(|_| DbError::OutOfRange("price"))?;

        conn.execute(
            "INSERT INTO orders (id, phone, order_type, crop, quantity, price, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7)",
            params![
                id,
                phone,
                order_type.as_str(),
                crop,
                sql_quantity,
                sql_price,
                format_datetime(now)
            ],
        )?;

        Ok(Order {
            id,
            phone: phone.to_string(),
            kind: order_type,
            crop: crop.to_string(),
            quantity,
            price,
            status: "pending".to_string(),
            created_at: now,
        })
    }

    /// Orders placed from a phone, newest first
    #[allow(dead_code)] // Used in tests
    pub fn list_orders_for_phone(&self, phone: &str) -> DbResult<Vec<Order>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, phone, order_type, crop, quantity, price, status, created_at
             FROM orders WHERE phone = ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![phone], |row| {
            let order_type: String = row.get(2)?;
            Ok(Order {
                id: row.get(0)?,
                phone: row.get(1)?,
                kind: OrderType::parse(&order_type).unwrap_or(OrderType::Buy),
                crop: row.get(3)?,
                quantity: u64::try_from(row.get::<_, i64>(4)?).unwrap_or_default(),
                price: u64::try_from(row.get::<_, i64>(5)?).unwrap_or_default(),
                status: row.get(6)?,
                created_at: parse_datetime(&row.get::<_, String>(7)?),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Session Operations ====================

    /// Insert or replace a session row
    pub fn put_session(&self, session: &SessionRow) -> DbResult<()> {
        let conn = self.conn();
        let fields = serde_json::to_string(&session.fields)?;
        let step = i64::try_from(session.step).map_err(|_| DbError::OutOfRange("step"))?;
        let inputs_seen =
            i64::try_from(session.inputs_seen).map_err(|_| DbError::OutOfRange("inputs_seen"))?;

        conn.execute(
            "INSERT INTO ussd_sessions (id, phone, menu, step, fields, inputs_seen, created_at, last_activity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                phone = excluded.phone,
                menu = excluded.menu,
                step = excluded.step,
                fields = excluded.fields,
                inputs_seen = excluded.inputs_seen,
                last_activity = excluded.last_activity",
            params![
                session.id,
                session.phone,
                session.menu,
                step,
                fields,
                inputs_seen,
                format_datetime(session.created_at),
                format_datetime(session.last_activity)
            ],
        )?;
        Ok(())
    }

    /// Get session row by ID
    pub fn get_session(&self, id: &str) -> DbResult<Option<SessionRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, phone, menu, step, fields, inputs_seen, created_at, last_activity
             FROM ussd_sessions WHERE id = ?1",
        )?;

        stmt.query_row(params![id], session_from_row)
            .optional()
            .map_err(DbError::from)
    }

    /// Delete a session row, returning whether one existed
    pub fn delete_session(&self, id: &str) -> DbResult<bool> {
        let conn = self.conn();
        let deleted = conn.execute("DELETE FROM ussd_sessions WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// All session rows, most recently active first
    pub fn list_sessions(&self) -> DbResult<Vec<SessionRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, phone, menu, step, fields, inputs_seen, created_at, last_activity
             FROM ussd_sessions ORDER BY last_activity DESC",
        )?;

        let rows = stmt.query_map([], session_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Delete every session row
    pub fn clear_sessions(&self) -> DbResult<usize> {
        let conn = self.conn();
        Ok(conn.execute("DELETE FROM ussd_sessions", [])?)
    }

    /// Delete sessions whose last activity is before the cutoff
    pub fn delete_sessions_idle_since(&self, cutoff: DateTime<Utc>) -> DbResult<usize> {
        let conn = self.conn();
        Ok(conn.execute(
            "DELETE FROM ussd_sessions WHERE last_activity < ?1",
            params![format_datetime(cutoff)],
        )?)
    }
}

fn query_farmer(conn: &Connection, phone: &str) -> DbResult<Farmer> {
    conn.query_row(
        "SELECT id, phone, name, location, crop_type, created_at, updated_at
         FROM farmers WHERE phone = ?1",
        params![phone],
        |row| {
            Ok(Farmer {
                id: row.get(0)?,
                phone: row.get(1)?,
                name: row.get(2)?,
                location: row.get(3)?,
                crop_type: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                updated_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::FarmerNotFound(phone.to_string()),
        other => DbError::Sqlite(other),
    })
}

fn query_buyer(conn: &Connection, phone: &str) -> DbResult<Buyer> {
    conn.query_row(
        "SELECT id, phone, business_name, location, business_type, created_at, updated_at
         FROM buyers WHERE phone = ?1",
        params![phone],
        |row| {
            Ok(Buyer {
                id: row.get(0)?,
                phone: row.get(1)?,
                business_name: row.get(2)?,
                location: row.get(3)?,
                business_type: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                updated_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::BuyerNotFound(phone.to_string()),
        other => DbError::Sqlite(other),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    let fields_json: String = row.get(4)?;
    Ok(SessionRow {
        id: row.get(0)?,
        phone: row.get(1)?,
        menu: row.get(2)?,
        step: usize::try_from(row.get::<_, i64>(3)?).unwrap_or_default(),
        fields: serde_json::from_str(&fields_json).unwrap_or_default(),
        inputs_seen: usize::try_from(row.get::<_, i64>(5)?).unwrap_or_default(),
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        last_activity: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fixed-width UTC timestamps so text comparison matches time order
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
