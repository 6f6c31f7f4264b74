//! Prefixed ID generation for rentpay entities.
//!
//! IDs carry an `rp_` brand prefix so they can never be confused with
//! gateway-issued transaction references.
//!
//! Format: `rp_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

const ALL_PREFIXES: &[&str] = &["rp_lse_", "rp_pay_", "rp_led_"];

/// Validate that a string is a well-formed rentpay prefixed ID.
///
/// Cheap check used to reject garbage before hitting the database.
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];
    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Lease,
    Payment,
    LedgerEntry,
}

impl EntityType {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Lease => "rp_lse",
            Self::Payment => "rp_pay",
            Self::LedgerEntry => "rp_led",
        }
    }

    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}
