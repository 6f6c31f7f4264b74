//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
///
/// Corrupt enum values surface as a column type error instead of a panic.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const LEASE_COLS: &str =
    "id, tenant_email, property_name, monthly_rent_minor, currency, created_at";

pub const PAYMENT_COLS: &str = "id, lease_id, payer_email, amount_minor, currency, reference, status, gateway_response, created_at, updated_at, paid_at";

pub const LEDGER_COLS: &str = "id, lease_id, payment_id, amount_minor, currency, created_at";

// ============ FromRow Implementations ============

impl FromRow for Lease {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Lease {
            id: row.get(0)?,
            tenant_email: row.get(1)?,
            property_name: row.get(2)?,
            monthly_rent_minor: row.get(3)?,
            currency: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Payment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Payment {
            id: row.get(0)?,
            lease_id: row.get(1)?,
            payer_email: row.get(2)?,
            amount_minor: row.get(3)?,
            currency: row.get(4)?,
            reference: row.get(5)?,
            status: parse_enum(row, 6, "status")?,
            gateway_response: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
            paid_at: row.get(10)?,
        })
    }
}

impl FromRow for RentLedgerEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(RentLedgerEntry {
            id: row.get(0)?,
            lease_id: row.get(1)?,
            payment_id: row.get(2)?,
            amount_minor: row.get(3)?,
            currency: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}
