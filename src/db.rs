use crate::error::ApiError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Type alias for the PostgreSQL connection pool.
pub type DbPool = PgPool;

/// Creates and configures the PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Check whether a menu item with the given name already exists within a
/// cafeteria. Names are unique per cafeteria, not globally.
pub async fn check_duplicate_menu_item(
    pool: &PgPool,
    cafeteria_id: i32,
    name: &str,
) -> Result<bool, ApiError> {
    let exists: Option<bool> = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM menu_items WHERE cafeteria_id = $1 AND name = $2)",
    )
    .bind(cafeteria_id)
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(exists.unwrap_or(false))
}
