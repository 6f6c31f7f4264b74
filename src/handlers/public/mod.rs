mod callback;
mod pay;
mod status;

pub use callback::*;
pub use pay::*;
pub use status::*;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/payments/initialize", post(initialize_payment))
        // Gateway redirects the tenant here after checkout
        .route("/payments/callback", get(payment_callback))
        .route("/payments/{reference}", get(get_payment))
}
