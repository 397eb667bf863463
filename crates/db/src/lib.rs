//! Postgres persistence for draft form records.
//!
//! Repositories are zero-sized structs with async methods taking `&PgPool`.
//! Every form kind has its own table with a shared column layout, so one
//! generic upsert serves all of them through a [`RowMapper`].

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod mapper;
pub mod models;
pub mod repositories;

pub use error::DraftWriteError;
pub use mapper::{NewFormRow, RowMapper};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
