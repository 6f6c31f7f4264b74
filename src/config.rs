use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

/// Credentials and transport settings for the Paystack API.
///
/// The secret is optional here so the server can boot without it; every call
/// that needs it fails with a configuration error instead.
#[derive(Clone)]
pub struct PaystackConfig {
    pub secret_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl PaystackConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: Some(secret_key.into()),
            base_url: DEFAULT_PAYSTACK_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for PaystackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaystackConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    /// Where tenants land after the gateway redirect has been reconciled.
    pub success_page_url: String,
    pub dev_mode: bool,
    /// Pending payments older than this are swept to `expired`.
    pub payment_expiry_hours: i64,
    pub paystack: PaystackConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("RENTPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let success_page_url =
            env::var("SUCCESS_PAGE_URL").unwrap_or_else(|_| format!("{}/payment/complete", base_url));

        let secret_key = env::var("PAYSTACK_SECRET_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());
        if secret_key.is_none() {
            tracing::warn!("PAYSTACK_SECRET_KEY is not set; payment calls will fail");
        }

        let paystack = PaystackConfig {
            secret_key,
            base_url: env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_PAYSTACK_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                env::var("PAYSTACK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "rentpay.db".to_string()),
            base_url,
            success_page_url,
            dev_mode,
            payment_expiry_hours: env::var("PAYMENT_EXPIRY_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|h: &i64| *h > 0)
                .unwrap_or(24),
            paystack,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
