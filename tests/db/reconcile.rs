//! Reconciliation against a real database: single application, duplicate
//! deliveries, stale records and concurrent deliveries.

#[path = "../common/mod.rs"]
mod common;
use common::*;

use std::sync::Barrier;

fn verified(reference: &str, status: GatewayStatus) -> VerifiedTransaction {
    VerifiedTransaction {
        reference: reference.to_string(),
        status,
        amount_minor: TEST_RENT_MINOR,
        currency: "NGN".to_string(),
        paid_at: Some("2026-10-01T09:30:12.000Z".to_string()),
        gateway_response: Some("Approved".to_string()),
    }
}

#[test]
fn test_success_marks_paid_and_credits_ledger() {
    let (pool, _dir) = setup_test_pool();
    let mut conn = pool.get().unwrap();
    let lease = create_test_lease(&conn);
    let payment = create_test_payment(&conn, &lease, "ref_paid");

    let outcome = reconcile(&mut conn, &verified("ref_paid", GatewayStatus::Success)).unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied(PaymentStatus::Paid));

    let stored = queries::get_payment_by_reference(&conn, "ref_paid").unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Paid);
    assert!(stored.paid_at.is_some());
    assert_eq!(stored.gateway_response.as_deref(), Some("Approved"));

    let entry = queries::get_ledger_entry_by_payment(&conn, &payment.id)
        .unwrap()
        .expect("ledger entry");
    assert_eq!(entry.lease_id, lease.id);
    assert_eq!(entry.amount_minor, TEST_RENT_MINOR);
    assert_eq!(entry.currency, "NGN");
}

#[test]
fn test_repeated_delivery_is_duplicate() {
    let (pool, _dir) = setup_test_pool();
    let mut conn = pool.get().unwrap();
    let lease = create_test_lease(&conn);
    create_test_payment(&conn, &lease, "ref_twice");

    let event = verified("ref_twice", GatewayStatus::Success);
    assert_eq!(
        reconcile(&mut conn, &event).unwrap(),
        ReconcileOutcome::Applied(PaymentStatus::Paid)
    );
    for _ in 0..3 {
        assert_eq!(reconcile(&mut conn, &event).unwrap(), ReconcileOutcome::Duplicate);
    }

    assert_eq!(ledger_count(&conn, &lease.id), 1);
}

#[test]
fn test_unknown_reference_creates_nothing() {
    let (pool, _dir) = setup_test_pool();
    let mut conn = pool.get().unwrap();
    let lease = create_test_lease(&conn);

    let outcome = reconcile(&mut conn, &verified("ref_ghost", GatewayStatus::Success)).unwrap();
    assert_eq!(outcome, ReconcileOutcome::NotFound);

    assert!(queries::get_payment_by_reference(&conn, "ref_ghost").unwrap().is_none());
    assert!(queries::list_payments_for_lease(&conn, &lease.id).unwrap().is_empty());
    assert_eq!(ledger_count(&conn, &lease.id), 0);
}

#[test]
fn test_failed_transaction_marks_failed_without_credit() {
    let (pool, _dir) = setup_test_pool();
    let mut conn = pool.get().unwrap();
    let lease = create_test_lease(&conn);
    create_test_payment(&conn, &lease, "ref_declined");

    let outcome = reconcile(&mut conn, &verified("ref_declined", GatewayStatus::Failed)).unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied(PaymentStatus::Failed));
    assert_eq!(payment_status(&conn, "ref_declined"), PaymentStatus::Failed);
    assert_eq!(ledger_count(&conn, &lease.id), 0);

    // A later success report does not resurrect it
    let outcome = reconcile(&mut conn, &verified("ref_declined", GatewayStatus::Success)).unwrap();
    assert_eq!(outcome, ReconcileOutcome::Stale(PaymentStatus::Failed));
    assert_eq!(ledger_count(&conn, &lease.id), 0);
}

#[test]
fn test_expired_payment_is_not_revived() {
    let (pool, _dir) = setup_test_pool();
    let mut conn = pool.get().unwrap();
    let lease = create_test_lease(&conn);
    create_test_payment(&conn, &lease, "ref_late");
    backdate_payment(&conn, "ref_late", 48 * 3600);
    assert_eq!(queries::expire_stale_payments(&conn, 24 * 3600).unwrap(), 1);

    let outcome = reconcile(&mut conn, &verified("ref_late", GatewayStatus::Success)).unwrap();
    assert_eq!(outcome, ReconcileOutcome::Stale(PaymentStatus::Expired));
    assert_eq!(payment_status(&conn, "ref_late"), PaymentStatus::Expired);
    assert_eq!(ledger_count(&conn, &lease.id), 0);
}

#[test]
fn test_unsettled_and_mismatched_stay_pending() {
    let (pool, _dir) = setup_test_pool();
    let mut conn = pool.get().unwrap();
    let lease = create_test_lease(&conn);
    create_test_payment(&conn, &lease, "ref_wait");

    let outcome = reconcile(&mut conn, &verified("ref_wait", GatewayStatus::Ongoing)).unwrap();
    assert_eq!(outcome, ReconcileOutcome::Unsettled);
    assert_eq!(payment_status(&conn, "ref_wait"), PaymentStatus::Pending);

    let mut short = verified("ref_wait", GatewayStatus::Success);
    short.amount_minor = TEST_RENT_MINOR - 1;
    let outcome = reconcile(&mut conn, &short).unwrap();
    assert_eq!(outcome, ReconcileOutcome::AmountMismatch);
    assert_eq!(payment_status(&conn, "ref_wait"), PaymentStatus::Pending);
    assert_eq!(ledger_count(&conn, &lease.id), 0);

    // The correct settlement still applies afterwards
    let outcome = reconcile(&mut conn, &verified("ref_wait", GatewayStatus::Success)).unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied(PaymentStatus::Paid));
}

#[test]
fn test_concurrent_deliveries_apply_once() {
    const DELIVERIES: usize = 8;

    let (pool, _dir) = setup_test_pool();
    let lease = {
        let conn = pool.get().unwrap();
        let lease = create_test_lease(&conn);
        create_test_payment(&conn, &lease, "ref_race");
        lease
    };

    let barrier = Barrier::new(DELIVERIES);
    let outcomes: Vec<ReconcileOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..DELIVERIES)
            .map(|_| {
                let pool = pool.clone();
                let barrier = &barrier;
                scope.spawn(move || {
                    let mut conn = pool.get().unwrap();
                    barrier.wait();
                    reconcile(&mut conn, &verified("ref_race", GatewayStatus::Success)).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let applied = outcomes
        .iter()
        .filter(|o| **o == ReconcileOutcome::Applied(PaymentStatus::Paid))
        .count();
    let duplicates = outcomes
        .iter()
        .filter(|o| **o == ReconcileOutcome::Duplicate)
        .count();
    assert_eq!(applied, 1, "outcomes: {:?}", outcomes);
    assert_eq!(duplicates, DELIVERIES - 1);

    let conn = pool.get().unwrap();
    assert_eq!(ledger_count(&conn, &lease.id), 1);
    assert_eq!(payment_status(&conn, "ref_race"), PaymentStatus::Paid);
}
