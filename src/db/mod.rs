mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::PaystackClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every request handler.
///
/// Everything in here is read-only after startup; the database is the only
/// shared mutable state.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Gateway client, built once from the process configuration
    pub paystack: PaystackClient,
    /// Base URL for gateway callbacks (e.g., https://rent.example.com)
    pub base_url: String,
    /// Where tenants are redirected after the callback is reconciled
    pub success_page_url: String,
}

/// Concurrent webhook deliveries race on the same rows, so connections wait
/// on the write lock instead of failing with SQLITE_BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
    });
    Pool::builder().max_size(10).build(manager)
}
