use crate::error::ApiError;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Creates and configures a PostgreSQL connection pool
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

/// Check if a product with the given name already exists
pub async fn check_duplicate_product(pool: &PgPool, name: &str) -> Result<bool, ApiError> {
    tracing::debug!("Checking for duplicate product: {}", name);

    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE name = $1)")
            .bind(name)
            .fetch_one(pool)
            .await?;

    let is_duplicate = exists.unwrap_or(false);
    if is_duplicate {
        tracing::debug!("Duplicate product found: {}", name);
    }

    Ok(is_duplicate)
}

/// Check if a product with the given name already exists, excluding a
/// specific ID. Used for update operations to allow keeping the same name.
pub async fn check_duplicate_product_excluding_id(
    pool: &PgPool,
    name: &str,
    exclude_id: i32,
) -> Result<bool, ApiError> {
    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE name = $1 AND id != $2)")
            .bind(name)
            .bind(exclude_id)
            .fetch_one(pool)
            .await?;

    Ok(exists.unwrap_or(false))
}

/// Insert a tier price and keep the product's `has_tier_prices` flag in sync
///
/// Both writes happen in one transaction; if either fails, nothing changes.
pub async fn insert_tier_price_with_flag(
    pool: &PgPool,
    product_id: i32,
    quantity: i32,
    price: Decimal,
    calculation_method: crate::pricing::types::TierCalculationMethod,
) -> Result<crate::models::TierPrice, ApiError> {
    let mut tx = pool.begin().await?;

    let exists: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&mut *tx)
            .await?;

    if !exists.unwrap_or(false) {
        // Transaction is automatically rolled back when tx is dropped
        return Err(ApiError::NotFound {
            resource: "Product".to_string(),
            id: product_id.to_string(),
        });
    }

    let tier = sqlx::query_as::<_, crate::models::TierPrice>(
        r#"
        INSERT INTO tier_prices (product_id, quantity, price, calculation_method)
        VALUES ($1, $2, $3, $4)
        RETURNING id, product_id, quantity, price, calculation_method
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(price)
    .bind(calculation_method)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE products SET has_tier_prices = true WHERE id = $1")
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(tier)
}

/// Delete a tier price and clear the product flag when it was the last one
pub async fn delete_tier_price_with_flag(
    pool: &PgPool,
    product_id: i32,
    tier_id: i32,
) -> Result<bool, ApiError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM tier_prices WHERE id = $1 AND product_id = $2")
        .bind(tier_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    let remaining: Option<bool> =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tier_prices WHERE product_id = $1)")
            .bind(product_id)
            .fetch_one(&mut *tx)
            .await?;

    if !remaining.unwrap_or(false) {
        sqlx::query("UPDATE products SET has_tier_prices = false WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(true)
}
