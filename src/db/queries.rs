use chrono::Utc;
use rusqlite::{Connection, params};

use crate::error::Result;
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{LEASE_COLS, LEDGER_COLS, PAYMENT_COLS, query_all, query_one};

fn now() -> i64 {
    Utc::now().timestamp()
}

// ============ Leases ============

pub fn create_lease(conn: &Connection, input: &CreateLease) -> Result<Lease> {
    let id = EntityType::Lease.gen_id();
    let now = now();
    let currency = input.currency.to_uppercase();

    conn.execute(
        "INSERT INTO leases (id, tenant_email, property_name, monthly_rent_minor, currency, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &id,
            &input.tenant_email,
            &input.property_name,
            input.monthly_rent_minor,
            &currency,
            now
        ],
    )?;

    Ok(Lease {
        id,
        tenant_email: input.tenant_email.clone(),
        property_name: input.property_name.clone(),
        monthly_rent_minor: input.monthly_rent_minor,
        currency,
        created_at: now,
    })
}

pub fn get_lease_by_id(conn: &Connection, id: &str) -> Result<Option<Lease>> {
    query_one(
        conn,
        &format!("SELECT {} FROM leases WHERE id = ?1", LEASE_COLS),
        &[&id],
    )
}

// ============ Payments ============

pub fn create_payment(conn: &Connection, input: &CreatePayment) -> Result<Payment> {
    let id = EntityType::Payment.gen_id();
    let now = now();
    let currency = input.currency.to_uppercase();

    conn.execute(
        "INSERT INTO payments (id, lease_id, payer_email, amount_minor, currency, reference, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)",
        params![
            &id,
            &input.lease_id,
            &input.payer_email,
            input.amount_minor,
            &currency,
            &input.reference,
            now
        ],
    )?;

    Ok(Payment {
        id,
        lease_id: input.lease_id.clone(),
        payer_email: input.payer_email.clone(),
        amount_minor: input.amount_minor,
        currency,
        reference: input.reference.clone(),
        status: PaymentStatus::Pending,
        gateway_response: None,
        created_at: now,
        updated_at: now,
        paid_at: None,
    })
}

pub fn get_payment_by_id(conn: &Connection, id: &str) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLS),
        &[&id],
    )
}

pub fn get_payment_by_reference(conn: &Connection, reference: &str) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payments WHERE reference = ?1", PAYMENT_COLS),
        &[&reference],
    )
}

pub fn list_payments_for_lease(conn: &Connection, lease_id: &str) -> Result<Vec<Payment>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM payments WHERE lease_id = ?1 ORDER BY created_at DESC",
            PAYMENT_COLS
        ),
        &[&lease_id],
    )
}

/// Atomically move a pending payment to a terminal status.
///
/// Compare-and-swap on `status = 'pending'`: when several webhook deliveries
/// (or a webhook and the browser callback) race on the same reference, exactly
/// one of them sees `Ok(true)`.
///
/// Returns:
/// - `Ok(true)` if this call performed the transition
/// - `Ok(false)` if the payment is unknown or no longer pending
pub fn try_transition_payment(
    conn: &Connection,
    reference: &str,
    to: PaymentStatus,
    gateway_response: Option<&str>,
) -> Result<bool> {
    if !PaymentStatus::Pending.can_transition_to(to) {
        return Ok(false);
    }

    let now = now();
    let paid_at = (to == PaymentStatus::Paid).then_some(now);

    let affected = conn.execute(
        "UPDATE payments
         SET status = ?1, gateway_response = COALESCE(?2, gateway_response), paid_at = ?3, updated_at = ?4
         WHERE reference = ?5 AND status = 'pending'",
        params![to.as_str(), gateway_response, paid_at, now, reference],
    )?;
    Ok(affected > 0)
}

/// Expire pending payments created before `now - max_age_secs`.
/// Returns the number of payments moved to `expired`.
pub fn expire_stale_payments(conn: &Connection, max_age_secs: i64) -> Result<usize> {
    let now = now();
    let cutoff = now - max_age_secs;
    let expired = conn.execute(
        "UPDATE payments SET status = 'expired', updated_at = ?1
         WHERE status = 'pending' AND created_at < ?2",
        params![now, cutoff],
    )?;
    Ok(expired)
}

// ============ Rent Ledger ============

/// Credit a paid payment to its lease.
///
/// Must run in the same database transaction as the `pending -> paid`
/// transition; the UNIQUE(payment_id) constraint rejects a second credit.
pub fn create_ledger_entry(conn: &Connection, payment: &Payment) -> Result<RentLedgerEntry> {
    let id = EntityType::LedgerEntry.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO rent_ledger (id, lease_id, payment_id, amount_minor, currency, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &id,
            &payment.lease_id,
            &payment.id,
            payment.amount_minor,
            &payment.currency,
            now
        ],
    )?;

    Ok(RentLedgerEntry {
        id,
        lease_id: payment.lease_id.clone(),
        payment_id: payment.id.clone(),
        amount_minor: payment.amount_minor,
        currency: payment.currency.clone(),
        created_at: now,
    })
}

pub fn list_ledger_for_lease(conn: &Connection, lease_id: &str) -> Result<Vec<RentLedgerEntry>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM rent_ledger WHERE lease_id = ?1 ORDER BY created_at ASC",
            LEDGER_COLS
        ),
        &[&lease_id],
    )
}

pub fn get_ledger_entry_by_payment(
    conn: &Connection,
    payment_id: &str,
) -> Result<Option<RentLedgerEntry>> {
    query_one(
        conn,
        &format!("SELECT {} FROM rent_ledger WHERE payment_id = ?1", LEDGER_COLS),
        &[&payment_id],
    )
}
