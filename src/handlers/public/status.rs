use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::{OptionExt, Result, msg};
use crate::extractors::{Json, Path};
use crate::models::Payment;

/// Current state of a payment as this service knows it. Never calls the gateway.
pub async fn get_payment(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<Payment>> {
    let conn = state.db.get()?;
    let payment = queries::get_payment_by_reference(&conn, &reference)?
        .or_not_found(msg::PAYMENT_NOT_FOUND)?;
    Ok(Json(payment))
}
