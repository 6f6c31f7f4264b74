//! End-to-end tests for POST /webhook/paystack through the router.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

#[path = "../common/mod.rs"]
mod common;
use common::*;

fn webhook(body: Vec<u8>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook/paystack")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-paystack-signature", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

fn signed(body: Vec<u8>) -> Request<Body> {
    let signature = sign(&body);
    webhook(body, Some(signature.as_str()))
}

#[tokio::test]
async fn test_charge_success_marks_payment_paid() {
    let env = setup().await;
    let lease = create_test_lease(&env.conn());
    create_test_payment(&env.conn(), &lease, "ref_hook");
    env.gateway.set_verify_response(200, verify_success("ref_hook"));

    let response = env
        .app()
        .oneshot(signed(charge_success_event("ref_hook")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Payment marked paid");
    assert_eq!(payment_status(&env.conn(), "ref_hook"), PaymentStatus::Paid);
    assert_eq!(ledger_count(&env.conn(), &lease.id), 1);
    assert_eq!(env.gateway.verified_references(), vec!["ref_hook".to_string()]);
}

#[tokio::test]
async fn test_redelivery_is_acknowledged_without_second_credit() {
    let env = setup().await;
    let lease = create_test_lease(&env.conn());
    create_test_payment(&env.conn(), &lease, "ref_again");
    env.gateway.set_verify_response(200, verify_success("ref_again"));

    let first = env
        .app()
        .oneshot(signed(charge_success_event("ref_again")))
        .await
        .unwrap();
    assert_eq!(body_text(first).await, "Payment marked paid");

    let second = env
        .app()
        .oneshot(signed(charge_success_event("ref_again")))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_text(second).await, "Already processed");

    assert_eq!(ledger_count(&env.conn(), &lease.id), 1);
}

#[tokio::test]
async fn test_bad_signature_is_rejected_without_verify() {
    let env = setup().await;
    let lease = create_test_lease(&env.conn());
    create_test_payment(&env.conn(), &lease, "ref_forged");

    let body = charge_success_event("ref_forged");
    let forged = compute_signature(&body, "sk_test_attacker").unwrap();
    let response = env.app().oneshot(webhook(body, Some(forged.as_str()))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(env.gateway.verify_calls(), 0);
    assert_eq!(payment_status(&env.conn(), "ref_forged"), PaymentStatus::Pending);
}

#[tokio::test]
async fn test_signature_over_different_body_is_rejected() {
    let env = setup().await;
    let lease = create_test_lease(&env.conn());
    create_test_payment(&env.conn(), &lease, "ref_swap");

    let signature = sign(&charge_success_event("ref_other"));
    let response = env
        .app()
        .oneshot(webhook(charge_success_event("ref_swap"), Some(signature.as_str())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(env.gateway.verify_calls(), 0);
}

#[tokio::test]
async fn test_missing_signature_header_is_400() {
    let env = setup().await;

    let response = env
        .app()
        .oneshot(webhook(charge_success_event("ref_nosig"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(env.gateway.verify_calls(), 0);
}

#[tokio::test]
async fn test_unconfigured_secret_acknowledges_without_action() {
    let env = setup_with_secret(None).await;
    let lease = create_test_lease(&env.conn());
    create_test_payment(&env.conn(), &lease, "ref_nocfg");

    let response = env
        .app()
        .oneshot(signed(charge_success_event("ref_nocfg")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Paystack not configured");
    assert_eq!(env.gateway.verify_calls(), 0);
    assert_eq!(payment_status(&env.conn(), "ref_nocfg"), PaymentStatus::Pending);
}

#[tokio::test]
async fn test_other_events_are_ignored() {
    let env = setup().await;

    let body = serde_json::to_vec(&json!({
        "event": "transfer.success",
        "data": { "reference": "trf_1" }
    }))
    .unwrap();
    let response = env.app().oneshot(signed(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Event ignored");
    assert_eq!(env.gateway.verify_calls(), 0);
}

#[tokio::test]
async fn test_signed_garbage_is_400() {
    let env = setup().await;

    let response = env
        .app()
        .oneshot(signed(b"not json at all".to_vec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payload_claims_are_not_trusted() {
    let env = setup().await;
    let lease = create_test_lease(&env.conn());
    create_test_payment(&env.conn(), &lease, "ref_liar");
    // Webhook says success; the gateway's own record says failed
    env.gateway.set_verify_response(
        200,
        verify_response("ref_liar", "failed", TEST_RENT_MINOR, "NGN"),
    );

    let response = env
        .app()
        .oneshot(signed(charge_success_event("ref_liar")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Payment marked failed");
    assert_eq!(payment_status(&env.conn(), "ref_liar"), PaymentStatus::Failed);
    assert_eq!(ledger_count(&env.conn(), &lease.id), 0);
}

#[tokio::test]
async fn test_unknown_reference_is_acknowledged() {
    let env = setup().await;
    env.gateway.set_verify_response(200, verify_success("ref_stranger"));

    let response = env
        .app()
        .oneshot(signed(charge_success_event("ref_stranger")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Payment not found");
    assert!(
        queries::get_payment_by_reference(&env.conn(), "ref_stranger")
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_transient_verify_failure_asks_for_redelivery() {
    let env = setup().await;
    let lease = create_test_lease(&env.conn());
    create_test_payment(&env.conn(), &lease, "ref_flaky");
    env.gateway.set_verify_response(502, json!({}));

    let response = env
        .app()
        .oneshot(signed(charge_success_event("ref_flaky")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(payment_status(&env.conn(), "ref_flaky"), PaymentStatus::Pending);

    // Redelivery after the gateway recovers settles it
    env.gateway.set_verify_response(200, verify_success("ref_flaky"));
    let response = env
        .app()
        .oneshot(signed(charge_success_event("ref_flaky")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(payment_status(&env.conn(), "ref_flaky"), PaymentStatus::Paid);
}

#[tokio::test]
async fn test_rejected_verify_is_acknowledged() {
    let env = setup().await;
    let lease = create_test_lease(&env.conn());
    create_test_payment(&env.conn(), &lease, "ref_rejected");

    // Fake gateway answers 404 for references it has no script for
    let response = env
        .app()
        .oneshot(signed(charge_success_event("ref_rejected")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Verification rejected");
    assert_eq!(env.gateway.verify_calls(), 1);
    assert_eq!(payment_status(&env.conn(), "ref_rejected"), PaymentStatus::Pending);
}

#[tokio::test]
async fn test_expired_payment_paid_late_is_left_for_review() {
    let env = setup().await;
    let lease = create_test_lease(&env.conn());
    create_test_payment(&env.conn(), &lease, "ref_expired");
    backdate_payment(&env.conn(), "ref_expired", 48 * 3600);
    queries::expire_stale_payments(&env.conn(), 24 * 3600).unwrap();
    env.gateway.set_verify_response(200, verify_success("ref_expired"));

    let response = env
        .app()
        .oneshot(signed(charge_success_event("ref_expired")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Payment already finalized");
    assert_eq!(payment_status(&env.conn(), "ref_expired"), PaymentStatus::Expired);
    assert_eq!(ledger_count(&env.conn(), &lease.id), 0);
}
