use serde::{Deserialize, Serialize};

/// Lifecycle of a rent payment.
///
/// `Pending` is the only non-terminal state. No transition leaves
/// `Paid`, `Failed` or `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(self, Self::Pending) && next.is_terminal()
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tenant's attempt to pay rent through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub lease_id: String,
    pub payer_email: String,
    /// Amount in the currency's minor unit (kobo for NGN)
    pub amount_minor: i64,
    /// ISO 4217 code, uppercase (e.g. "NGN")
    pub currency: String,
    /// Gateway-issued transaction reference
    pub reference: String,
    pub status: PaymentStatus,
    /// Last status text reported by the gateway, for support
    pub gateway_response: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub paid_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub lease_id: String,
    pub payer_email: String,
    pub amount_minor: i64,
    pub currency: String,
    pub reference: String,
}
