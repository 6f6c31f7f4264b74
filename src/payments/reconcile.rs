//! Maps a server-side verified gateway transaction onto the internal payment
//! record.
//!
//! [`decide`] is pure and holds the whole policy. [`reconcile`] only adds the
//! database lookup and the single conditional write that makes repeated
//! webhook deliveries harmless.

use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::error::Result;
use crate::models::{Payment, PaymentStatus};

use super::paystack::{GatewayStatus, VerifiedTransaction};

/// What reconciling one verified transaction did (or would do).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The pending payment moved to the given terminal status.
    Applied(PaymentStatus),
    /// The payment already has the status the gateway reports.
    Duplicate,
    /// No payment carries this reference. Nothing is created.
    NotFound,
    /// The payment is terminal in a different status than the gateway
    /// reports (e.g. expired locally, then paid late). Left untouched.
    Stale(PaymentStatus),
    /// The gateway has not settled the transaction yet.
    Unsettled,
    /// The gateway settled a different amount or currency than was requested.
    AmountMismatch,
}

impl ReconcileOutcome {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Applied(PaymentStatus::Paid) => "Payment marked paid",
            Self::Applied(PaymentStatus::Failed) => "Payment marked failed",
            Self::Applied(_) => "Payment updated",
            Self::Duplicate => "Already processed",
            Self::NotFound => "Payment not found",
            Self::Stale(_) => "Payment already finalized",
            Self::Unsettled => "Transaction not settled",
            Self::AmountMismatch => "Amount mismatch",
        }
    }
}

/// Terminal status implied by a gateway status, if the gateway is final.
pub fn target_status(status: GatewayStatus) -> Option<PaymentStatus> {
    match status {
        GatewayStatus::Success => Some(PaymentStatus::Paid),
        GatewayStatus::Failed | GatewayStatus::Reversed => Some(PaymentStatus::Failed),
        _ => None,
    }
}

/// Decide what to do with a verified transaction given the current record.
pub fn decide(record: Option<&Payment>, verified: &VerifiedTransaction) -> ReconcileOutcome {
    let Some(payment) = record else {
        return ReconcileOutcome::NotFound;
    };

    let target = target_status(verified.status);

    if payment.status.is_terminal() {
        return if target == Some(payment.status) {
            ReconcileOutcome::Duplicate
        } else {
            ReconcileOutcome::Stale(payment.status)
        };
    }

    match target {
        None => ReconcileOutcome::Unsettled,
        Some(PaymentStatus::Paid)
            if verified.amount_minor != payment.amount_minor
                || !verified.currency.eq_ignore_ascii_case(&payment.currency) =>
        {
            ReconcileOutcome::AmountMismatch
        }
        Some(status) => ReconcileOutcome::Applied(status),
    }
}

/// Apply a verified transaction to the database.
///
/// Runs in an IMMEDIATE transaction: the `pending -> terminal` update is
/// conditional on the row still being pending, and the rent-ledger credit is
/// written in the same transaction. A concurrent delivery that loses the race
/// gets `Duplicate`.
pub fn reconcile(conn: &mut Connection, verified: &VerifiedTransaction) -> Result<ReconcileOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let payment = queries::get_payment_by_reference(&tx, &verified.reference)?;
    let outcome = decide(payment.as_ref(), verified);

    let (payment, target) = match (payment, outcome) {
        (Some(payment), ReconcileOutcome::Applied(target)) => (payment, target),
        (payment, outcome) => {
            log_discarded(payment.as_ref(), verified, outcome);
            return Ok(outcome);
        }
    };

    let claimed = queries::try_transition_payment(
        &tx,
        &verified.reference,
        target,
        verified.gateway_response.as_deref(),
    )?;
    if !claimed {
        return Ok(ReconcileOutcome::Duplicate);
    }

    if target == PaymentStatus::Paid {
        let entry = queries::create_ledger_entry(&tx, &payment)?;
        tracing::debug!(
            "Rent ledger credited: lease={}, entry={}, amount={} {}",
            entry.lease_id,
            entry.id,
            entry.amount_minor,
            entry.currency
        );
    }

    tx.commit()?;

    tracing::info!(
        "Payment {} ({}) reconciled: pending -> {}",
        payment.id,
        verified.reference,
        target
    );

    Ok(outcome)
}

fn log_discarded(payment: Option<&Payment>, verified: &VerifiedTransaction, outcome: ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::NotFound => {
            tracing::warn!("No payment for verified reference {}", verified.reference);
        }
        ReconcileOutcome::Duplicate => {
            tracing::debug!("Reference {} already reconciled", verified.reference);
        }
        ReconcileOutcome::Stale(status) => {
            tracing::warn!(
                "Reference {} is {} locally but gateway reports {:?}; manual review needed",
                verified.reference,
                status,
                verified.status
            );
        }
        ReconcileOutcome::Unsettled => {
            tracing::debug!(
                "Reference {} not settled yet (gateway status {:?})",
                verified.reference,
                verified.status
            );
        }
        ReconcileOutcome::AmountMismatch => {
            tracing::error!(
                "Reference {} settled {} {} but payment expects {:?}; left pending",
                verified.reference,
                verified.amount_minor,
                verified.currency,
                payment.map(|p| (p.amount_minor, p.currency.as_str()))
            );
        }
        ReconcileOutcome::Applied(_) => {}
    }
}
