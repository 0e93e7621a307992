use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::time::Duration;

/// Initialize the SQLite connection pool for the result store.
///
/// SQLite serializes writes per database anyway; a small pool is enough and
/// keeps concurrent upserts on the unique kvk_number key safe.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

pub mod queries;
