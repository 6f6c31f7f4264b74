use serde::{Deserialize, Serialize};

/// The tenancy a rent payment is made against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub id: String,
    pub tenant_email: String,
    pub property_name: String,
    pub monthly_rent_minor: i64,
    pub currency: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLease {
    pub tenant_email: String,
    pub property_name: String,
    pub monthly_rent_minor: i64,
    pub currency: String,
}
