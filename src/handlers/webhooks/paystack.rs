use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::db::AppState;
use crate::error::AppError;
use crate::payments::reconcile;

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Status and plain-text body returned to the gateway.
pub type WebhookResult = (StatusCode, &'static str);

/// Only `event` and `data.reference` are read. Everything else in the payload
/// is untrusted and superseded by the server-side verify.
#[derive(Debug, Deserialize)]
struct PaystackEvent {
    event: String,
    data: PaystackEventData,
}

#[derive(Debug, Deserialize)]
struct PaystackEventData {
    #[serde(default)]
    reference: Option<String>,
}

pub async fn handle_paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    process_webhook(&state, &headers, &body)
        .await
        .unwrap_or_else(|e| e)
}

async fn process_webhook(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<WebhookResult, WebhookResult> {
    let signature = extract_signature(headers)?;

    // Missing config returns 200 so the gateway does not retry forever.
    match state.paystack.verify_webhook_signature(body, signature) {
        Ok(true) => {}
        Ok(false) => return Err((StatusCode::UNAUTHORIZED, "Invalid signature")),
        Err(e) => {
            tracing::error!("Paystack webhook received but gateway is not configured: {}", e);
            return Err((StatusCode::OK, "Paystack not configured"));
        }
    }

    let event: PaystackEvent = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("Failed to parse Paystack webhook: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid JSON")
    })?;

    if event.event != "charge.success" {
        tracing::debug!("Ignoring Paystack event {}", event.event);
        return Ok((StatusCode::OK, "Event ignored"));
    }

    let reference = event
        .data
        .reference
        .filter(|r| !r.trim().is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "Missing reference"))?;

    let verified = state
        .paystack
        .verify_with_retry(&reference)
        .await
        .map_err(|e| verify_failure(&reference, e))?;

    if verified.reference != reference {
        tracing::error!(
            "Paystack verify for {} returned reference {}",
            reference,
            verified.reference
        );
        return Err((StatusCode::OK, "Reference mismatch"));
    }

    let mut conn = state.db.get().map_err(|e| {
        tracing::error!("Failed to get db connection for webhook: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    })?;

    let outcome = reconcile(&mut conn, &verified).map_err(|e| {
        tracing::error!("Failed to reconcile {}: {}", reference, e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    })?;

    Ok((StatusCode::OK, outcome.describe()))
}

fn extract_signature(headers: &HeaderMap) -> Result<&str, WebhookResult> {
    headers
        .get(SIGNATURE_HEADER)
        .ok_or((StatusCode::BAD_REQUEST, "Missing x-paystack-signature header"))?
        .to_str()
        .map_err(|e| {
            tracing::debug!("Invalid UTF-8 in Paystack signature header: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid signature header")
        })
}

/// Transient failures get a 5xx so the gateway redelivers. A definitive
/// rejection (unknown reference, bad key) would fail identically next time.
fn verify_failure(reference: &str, e: AppError) -> WebhookResult {
    if e.is_retryable() {
        tracing::warn!("Paystack verify for {} failed, asking for redelivery: {}", reference, e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Verification failed")
    } else {
        tracing::error!("Paystack verify for {} rejected: {}", reference, e);
        (StatusCode::OK, "Verification rejected")
    }
}
