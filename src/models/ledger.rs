use serde::Serialize;

/// Rent credited to a lease. Written exactly once per paid payment.
#[derive(Debug, Clone, Serialize)]
pub struct RentLedgerEntry {
    pub id: String,
    pub lease_id: String,
    pub payment_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub created_at: i64,
}
