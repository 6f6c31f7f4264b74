use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::time::Duration;

use rentpay::config::Config;
use rentpay::db::{AppState, create_pool, init_db, queries};
use rentpay::handlers;
use rentpay::models::CreateLease;
use rentpay::payments::PaystackClient;

#[derive(Parser, Debug)]
#[command(name = "rentpay")]
#[command(about = "Rent payments through Paystack with verified webhooks")]
struct Cli {
    /// Seed the database with a demo lease (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Creates a demo lease so the payment flow can be tried end to end.
/// Skipped when the lease table already has rows.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM leases", [], |row| row.get(0))
        .expect("Failed to count leases");
    if count > 0 {
        tracing::info!("Database already has leases, skipping seed");
        return;
    }

    let lease = queries::create_lease(
        &conn,
        &CreateLease {
            tenant_email: "tenant@rentpay.local".to_string(),
            property_name: "Flat 2B, 14 Admiralty Way".to_string(),
            monthly_rent_minor: 25_000_000,
            currency: "NGN".to_string(),
        },
    )
    .expect("Failed to create demo lease");

    tracing::info!("============================================");
    tracing::info!("SEEDED DEMO LEASE");
    tracing::info!("Lease: {} ({})", lease.id, lease.property_name);
    tracing::info!("Tenant: {}", lease.tenant_email);
    tracing::info!("Rent: {} {} (minor units)", lease.monthly_rent_minor, lease.currency);
    tracing::info!("============================================");
}

/// Spawns a background task that expires stale pending payments.
/// Runs every 5 minutes; a late webhook for an expired payment is logged, not applied.
fn spawn_expiry_task(state: AppState, expiry_hours: i64) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(5 * 60);
        let max_age_secs = expiry_hours * 3600;

        loop {
            tokio::time::sleep(interval).await;

            match state.db.get() {
                Ok(conn) => match queries::expire_stale_payments(&conn, max_age_secs) {
                    Ok(count) if count > 0 => {
                        tracing::info!("Expired {} stale pending payments", count);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Failed to expire stale payments: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to get db connection for expiry sweep: {}", e);
                }
            }
        }
    });

    tracing::info!(
        "Payment expiry task started (every 5 minutes, expiry after {}h)",
        expiry_hours
    );
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rentpay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        paystack: PaystackClient::new(&config.paystack),
        base_url: config.base_url.clone(),
        success_page_url: config.success_page_url.clone(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set RENTPAY_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    spawn_expiry_task(state.clone(), config.payment_expiry_hours);

    let app = Router::new()
        .merge(handlers::public::router())
        // Signature-authenticated gateway callbacks
        .merge(handlers::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("rentpay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
