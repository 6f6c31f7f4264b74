use axum::{extract::State, response::Redirect};
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::Query;
use crate::payments::reconcile;

/// Paystack appends both `reference` and `trxref` (same value) to the
/// callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub trxref: Option<String>,
}

/// Browser redirect after checkout.
///
/// The query string is only a hint: the transaction is verified server-side
/// and reconciled exactly like a webhook before the tenant is redirected to
/// the success page with `reference` and `status`. If the gateway cannot be
/// reached the tenant sees `status=pending` and the webhook settles it later.
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect> {
    let reference = query
        .reference
        .or(query.trxref)
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing reference".into()))?;

    {
        let conn = state.db.get()?;
        queries::get_payment_by_reference(&conn, &reference)?
            .or_not_found(msg::PAYMENT_NOT_FOUND)?;
    }

    match state.paystack.verify_with_retry(&reference).await {
        Ok(verified) => {
            let mut conn = state.db.get()?;
            let outcome = reconcile(&mut conn, &verified)?;
            tracing::debug!("Callback for {}: {}", reference, outcome.describe());
        }
        Err(e) if e.is_retryable() => {
            tracing::warn!("Callback verify for {} deferred to webhook: {}", reference, e);
        }
        Err(e) => return Err(e),
    }

    let conn = state.db.get()?;
    let payment = queries::get_payment_by_reference(&conn, &reference)?
        .or_not_found(msg::PAYMENT_NOT_FOUND)?;

    let redirect_url = append_query_params(
        &state.success_page_url,
        &[("reference", &payment.reference), ("status", payment.status.as_str())],
    );
    Ok(Redirect::temporary(&redirect_url))
}

fn append_query_params(base_url: &str, params: &[(&str, &str)]) -> String {
    let query_string: String = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base_url, separator, query_string)
}
