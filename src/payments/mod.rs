mod paystack;
pub mod reconcile;
mod signature;

pub use paystack::*;
pub use reconcile::{ReconcileOutcome, decide, reconcile};
pub use signature::{compute_signature, verify_signature};
