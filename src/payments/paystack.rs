use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::config::PaystackConfig;
use crate::error::{AppError, Result, msg};

use super::signature::verify_signature;

/// Delays between `verify` attempts on transient failures.
/// Worst case adds one second to a webhook or callback.
const VERIFY_RETRY_DELAYS_MS: &[u64] = &[250, 750];

/// Parameters for starting a hosted-checkout transaction.
#[derive(Debug, Clone)]
pub struct InitializeTransaction {
    pub email: String,
    /// Amount in the currency's minor unit (kobo, pesewas, cents)
    pub amount_minor: i64,
    pub currency: String,
    /// Where the gateway sends the payer after checkout
    pub callback_url: String,
    /// Caller-chosen reference. The gateway rejects a reference it has seen
    /// before, so supplying one makes retrying `initialize` safe.
    pub reference: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializedTransaction {
    pub reference: String,
    /// Hosted payment page the payer is redirected to
    pub authorization_url: String,
    pub access_code: Option<String>,
}

/// Transaction status as reported by `GET /transaction/verify/{reference}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    Success,
    Failed,
    Reversed,
    Abandoned,
    Ongoing,
    Pending,
    Processing,
    Queued,
    #[serde(other)]
    Unknown,
}

/// Server-side view of a transaction, fetched directly from the gateway.
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    pub reference: String,
    pub status: GatewayStatus,
    pub amount_minor: i64,
    pub currency: String,
    pub paid_at: Option<String>,
    pub gateway_response: Option<String>,
}

// ============ Wire types ============

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    currency: &'a str,
    callback_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    #[serde(default)]
    access_code: Option<String>,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    reference: String,
    status: GatewayStatus,
    amount: i64,
    currency: String,
    #[serde(default)]
    paid_at: Option<String>,
    #[serde(default)]
    gateway_response: Option<String>,
}

/// Paystack REST client.
///
/// Holds the injected configuration; the secret is looked up on every call
/// so a missing key fails fast with `AppError::Config` before any I/O.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    client: Client,
    config: PaystackConfig,
}

impl PaystackClient {
    pub fn new(config: &PaystackConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout)
                .build()
                .expect("Failed to create HTTP client"),
            config: config.clone(),
        }
    }

    fn secret(&self) -> Result<&str> {
        self.config
            .secret_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Config(msg::PAYSTACK_NOT_CONFIGURED.into()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Start a transaction and get the hosted payment page for the payer.
    ///
    /// Not idempotent: every call without a `reference` creates a new
    /// attempt at the gateway, so this is never retried automatically.
    pub async fn initialize(&self, request: &InitializeTransaction) -> Result<InitializedTransaction> {
        let secret = self.secret()?;

        let body = InitializeBody {
            email: &request.email,
            amount: request.amount_minor,
            currency: &request.currency,
            callback_url: &request.callback_url,
            reference: request.reference.as_deref(),
            metadata: request.metadata.as_ref(),
        };

        let response = self
            .client
            .post(self.endpoint("/transaction/initialize"))
            .bearer_auth(secret)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let data: InitializeData = read_envelope(response).await?;

        Ok(InitializedTransaction {
            reference: data.reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    /// Fetch the authoritative status of a transaction by reference.
    pub async fn verify(&self, reference: &str) -> Result<VerifiedTransaction> {
        let secret = self.secret()?;

        if reference.trim().is_empty() {
            return Err(AppError::BadRequest("Transaction reference is required".into()));
        }

        let url = self.endpoint(&format!(
            "/transaction/verify/{}",
            urlencoding::encode(reference)
        ));

        let response = self
            .client
            .get(url)
            .bearer_auth(secret)
            .send()
            .await
            .map_err(transport_error)?;

        let data: VerifyData = read_envelope(response).await?;

        Ok(VerifiedTransaction {
            reference: data.reference,
            status: data.status,
            amount_minor: data.amount,
            currency: data.currency.to_uppercase(),
            paid_at: data.paid_at,
            gateway_response: data.gateway_response,
        })
    }

    /// `verify` with quick retries on transient failures.
    ///
    /// Only network errors, timeouts, 429 and 5xx are retried. Verify is a
    /// read, so repeating it cannot create or settle anything.
    pub async fn verify_with_retry(&self, reference: &str) -> Result<VerifiedTransaction> {
        let mut last_error = None;

        for (attempt, delay_ms) in std::iter::once(&0u64)
            .chain(VERIFY_RETRY_DELAYS_MS.iter())
            .enumerate()
        {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
            }

            match self.verify(reference).await {
                Ok(verified) => {
                    if attempt > 0 {
                        tracing::debug!(
                            "Paystack verify for {} succeeded after {} retries",
                            reference,
                            attempt
                        );
                    }
                    return Ok(verified);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        "Paystack verify for {} failed (attempt {}): {}",
                        reference,
                        attempt + 1,
                        e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Gateway {
            status: None,
            message: msg::GATEWAY_FALLBACK.into(),
        }))
    }

    /// Verify an inbound webhook against the configured secret.
    ///
    /// `Ok(false)` means the request must be rejected. `Err` only when no
    /// secret is configured.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let secret = self.secret()?;
        Ok(verify_signature(payload, signature, secret))
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    let message = if e.is_timeout() {
        "Payment gateway timed out".to_string()
    } else {
        format!("Payment gateway unreachable: {}", e)
    };
    AppError::Gateway {
        status: None,
        message,
    }
}

/// Decode a Paystack `{status, message, data}` envelope.
///
/// Non-2xx responses and `status: false` become `AppError::Gateway` carrying
/// the gateway's own `message`, or a generic fallback when it sent none.
async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(AppError::Gateway {
            status: Some(status.as_u16()),
            message: gateway_message(&body),
        });
    }

    let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
        tracing::error!("Failed to parse Paystack response: {}", e);
        AppError::Gateway {
            status: Some(status.as_u16()),
            message: msg::GATEWAY_FALLBACK.into(),
        }
    })?;

    if !envelope.status {
        return Err(AppError::Gateway {
            status: Some(status.as_u16()),
            message: non_empty(envelope.message).unwrap_or_else(|| msg::GATEWAY_FALLBACK.into()),
        });
    }

    envelope.data.ok_or_else(|| AppError::Gateway {
        status: Some(status.as_u16()),
        message: non_empty(envelope.message).unwrap_or_else(|| msg::GATEWAY_FALLBACK.into()),
    })
}

fn gateway_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| non_empty(e.message))
        .unwrap_or_else(|| msg::GATEWAY_FALLBACK.to_string())
}

fn non_empty(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}
