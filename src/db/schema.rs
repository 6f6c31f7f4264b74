use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Leases (minimal: only what rent collection needs)
        CREATE TABLE IF NOT EXISTS leases (
            id TEXT PRIMARY KEY,
            tenant_email TEXT NOT NULL,
            property_name TEXT NOT NULL,
            monthly_rent_minor INTEGER NOT NULL CHECK (monthly_rent_minor > 0),
            currency TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Payments (one row per gateway transaction attempt)
        -- status only ever moves pending -> paid | failed | expired
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            lease_id TEXT NOT NULL REFERENCES leases(id) ON DELETE CASCADE,
            payer_email TEXT NOT NULL,
            amount_minor INTEGER NOT NULL CHECK (amount_minor > 0),
            currency TEXT NOT NULL,
            reference TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'paid', 'failed', 'expired')),
            gateway_response TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            paid_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_payments_lease ON payments(lease_id);
        CREATE INDEX IF NOT EXISTS idx_payments_pending ON payments(created_at) WHERE status = 'pending';

        -- Rent ledger (credit side effect of a paid payment)
        -- At most one credit per payment
        CREATE TABLE IF NOT EXISTS rent_ledger (
            id TEXT PRIMARY KEY,
            lease_id TEXT NOT NULL REFERENCES leases(id) ON DELETE CASCADE,
            payment_id TEXT NOT NULL UNIQUE REFERENCES payments(id) ON DELETE CASCADE,
            amount_minor INTEGER NOT NULL,
            currency TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_rent_ledger_lease ON rent_ledger(lease_id);
        "#,
    )?;

    Ok(())
}
