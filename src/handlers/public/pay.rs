use axum::extract::State;
use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::Json;
use crate::id::is_valid_prefixed_id;
use crate::models::CreatePayment;
use crate::payments::InitializeTransaction;

/// Amount, currency and payer default to the lease's monthly rent and tenant.
#[derive(Debug, Deserialize)]
pub struct InitializePaymentRequest {
    pub lease_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub amount_minor: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Caller-chosen transaction reference. Reusing one is rejected, which
    /// makes a retried request safe.
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitializePaymentResponse {
    pub payment_id: String,
    pub reference: String,
    pub authorization_url: String,
}

pub async fn initialize_payment(
    State(state): State<AppState>,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<Json<InitializePaymentResponse>> {
    if !is_valid_prefixed_id(&request.lease_id) {
        return Err(AppError::NotFound(msg::LEASE_NOT_FOUND.into()));
    }

    let lease = {
        let conn = state.db.get()?;
        queries::get_lease_by_id(&conn, &request.lease_id)?.or_not_found(msg::LEASE_NOT_FOUND)?
    };

    let email = request.email.unwrap_or_else(|| lease.tenant_email.clone());
    let amount_minor = request.amount_minor.unwrap_or(lease.monthly_rent_minor);
    let currency = request
        .currency
        .unwrap_or_else(|| lease.currency.clone())
        .to_uppercase();

    if !is_plausible_email(&email) {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL.into()));
    }
    if amount_minor <= 0 {
        return Err(AppError::BadRequest(msg::INVALID_AMOUNT.into()));
    }
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::BadRequest(msg::INVALID_CURRENCY.into()));
    }

    let reference = request.reference.filter(|r| !r.trim().is_empty());
    if let Some(ref reference) = reference {
        let conn = state.db.get()?;
        if queries::get_payment_by_reference(&conn, reference)?.is_some() {
            return Err(AppError::Conflict(format!(
                "Reference {} is already in use",
                reference
            )));
        }
    }

    let initialized = state
        .paystack
        .initialize(&InitializeTransaction {
            email: email.clone(),
            amount_minor,
            currency: currency.clone(),
            callback_url: format!("{}/payments/callback", state.base_url.trim_end_matches('/')),
            reference,
            metadata: Some(serde_json::json!({ "lease_id": lease.id })),
        })
        .await?;

    let conn = state.db.get()?;
    let payment = queries::create_payment(
        &conn,
        &CreatePayment {
            lease_id: lease.id.clone(),
            payer_email: email,
            amount_minor,
            currency,
            reference: initialized.reference.clone(),
        },
    )
    .map_err(|e| match e {
        AppError::Database(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            AppError::Conflict(format!(
                "Reference {} is already in use",
                initialized.reference
            ))
        }
        other => other,
    })?;

    tracing::info!(
        "Payment {} initialized for lease {} (reference {})",
        payment.id,
        lease.id,
        payment.reference
    );

    Ok(Json(InitializePaymentResponse {
        payment_id: payment.id,
        reference: payment.reference,
        authorization_url: initialized.authorization_url,
    }))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    }
}
