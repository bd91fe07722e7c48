// Pricing data store
//
// Loads products, tier prices, discounts, attribute combinations and bundle
// compositions from PostgreSQL. The discount catalog is cached with a
// 60-second TTL; products and tier prices are read per calculation, so a
// price always reflects the current catalog row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::models::{Product, TierPrice};
use crate::pricing::error::{PricingError, PricingResult};
use crate::pricing::metrics::PerformanceMetrics;
use crate::pricing::types::DiscountType;

/// Time-to-live for the cached discount catalog
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Discount record from the database
///
/// `product_ids = NULL` means the discount applies to every product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Discount {
    pub id: i32,
    pub name: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub product_ids: Option<Vec<i32>>,
}

impl Discount {
    /// Whether this discount applies to the given product at `now`
    pub fn applies_to(&self, product_id: i32, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if now < self.valid_from {
            return false;
        }
        if let Some(valid_until) = self.valid_until {
            if now > valid_until {
                return false;
            }
        }
        match &self.product_ids {
            Some(ids) => ids.contains(&product_id),
            None => true,
        }
    }
}

/// One (attribute, value) pair of a stored combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePair {
    pub attribute: String,
    pub value: String,
}

/// A stored attribute combination, optionally carrying its own price
#[derive(Debug, Clone, Serialize)]
pub struct AttributeCombination {
    pub id: i32,
    pub product_id: i32,
    pub attributes: Vec<AttributePair>,
    pub price: Option<Decimal>,
    pub sku: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AttributeCombinationRow {
    id: i32,
    product_id: i32,
    attributes: serde_json::Value,
    price: Option<Decimal>,
    sku: Option<String>,
}

impl TryFrom<AttributeCombinationRow> for AttributeCombination {
    type Error = PricingError;

    fn try_from(row: AttributeCombinationRow) -> PricingResult<Self> {
        let attributes: Vec<AttributePair> = serde_json::from_value(row.attributes)?;
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            attributes,
            price: row.price,
            sku: row.sku,
        })
    }
}

/// One constituent of a bundle product
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BundleItem {
    pub id: i32,
    pub bundle_product_id: i32,
    pub product_id: i32,
    pub quantity: i32,
}

/// In-memory cache for the discount catalog
#[derive(Debug)]
struct DiscountCache {
    discounts: Vec<Discount>,
    last_updated: Option<Instant>,
}

impl DiscountCache {
    fn new() -> Self {
        Self {
            discounts: Vec::new(),
            last_updated: None,
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        match self.last_updated {
            Some(last_update) => last_update.elapsed() > ttl,
            None => true, // Never loaded, so it's stale
        }
    }

    fn mark_updated(&mut self) {
        self.last_updated = Some(Instant::now());
    }
}

/// Pricing data store
///
/// Shared across handlers and the pricing service; clone-cheap via the
/// inner pool and cache handles.
pub struct PricingStore {
    pool: PgPool,
    cache: Arc<RwLock<DiscountCache>>,
    cache_ttl: Duration,
    metrics: Option<Arc<PerformanceMetrics>>,
}

impl PricingStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(DiscountCache::new())),
            cache_ttl: CACHE_TTL,
            metrics: None,
        }
    }

    pub fn with_metrics(pool: PgPool, metrics: Arc<PerformanceMetrics>) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(DiscountCache::new())),
            cache_ttl: CACHE_TTL,
            metrics: Some(metrics),
        }
    }

    fn record_cache_hit(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_hit();
        }
    }

    fn record_cache_miss(&self) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_cache_miss();
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Load a product by id
    pub async fn get_product(&self, product_id: i32) -> PricingResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, sku, price, offer_price, offer_starts_at, offer_ends_at,
                   has_tier_prices, is_bundle, per_item_pricing, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(PricingError::ProductNotFound(product_id))?;

        Ok(product)
    }

    /// Load tier prices for a product, ascending by quantity threshold
    ///
    /// The ordering here is the precondition the tier walk relies on; the
    /// pipeline never re-sorts.
    pub async fn get_tier_prices(&self, product_id: i32) -> PricingResult<Vec<TierPrice>> {
        let tier_prices = sqlx::query_as::<_, TierPrice>(
            r#"
            SELECT id, product_id, quantity, price, calculation_method
            FROM tier_prices
            WHERE product_id = $1
            ORDER BY quantity ASC, id ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tier_prices)
    }

    /// Load stored attribute combinations for a product
    pub async fn get_attribute_combinations(
        &self,
        product_id: i32,
    ) -> PricingResult<Vec<AttributeCombination>> {
        let rows = sqlx::query_as::<_, AttributeCombinationRow>(
            r#"
            SELECT id, product_id, attributes, price, sku
            FROM attribute_combinations
            WHERE product_id = $1
            ORDER BY id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AttributeCombination::try_from).collect()
    }

    /// Load the composition of a bundle product
    pub async fn get_bundle_items(&self, bundle_product_id: i32) -> PricingResult<Vec<BundleItem>> {
        let items = sqlx::query_as::<_, BundleItem>(
            r#"
            SELECT id, bundle_product_id, product_id, quantity
            FROM bundle_items
            WHERE bundle_product_id = $1
            ORDER BY id
            "#,
        )
        .bind(bundle_product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Load the active discount catalog from the database
    pub async fn load_discounts(&self) -> PricingResult<Vec<Discount>> {
        let discounts = sqlx::query_as::<_, Discount>(
            r#"
            SELECT id, name, discount_type, value, is_active,
                   valid_from, valid_until, product_ids
            FROM discounts
            WHERE is_active = true
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        for discount in &discounts {
            Self::validate_discount(discount.discount_type, discount.value)?;
        }

        Ok(discounts)
    }

    /// Get the discount catalog with caching
    ///
    /// Returns cached data if fresh, otherwise reloads from the database.
    pub async fn get_discounts(&self) -> PricingResult<Vec<Discount>> {
        self.refresh_if_stale().await?;

        let cache = self.cache.read().await;
        Ok(cache.discounts.clone())
    }

    /// Refresh the discount cache if the TTL has expired
    async fn refresh_if_stale(&self) -> PricingResult<()> {
        // Check with a read lock first (fast path)
        {
            let cache = self.cache.read().await;
            if !cache.is_stale(self.cache_ttl) {
                self.record_cache_hit();
                return Ok(());
            }
        }

        self.record_cache_miss();

        let mut cache = self.cache.write().await;

        // Double-check after acquiring the write lock (another task might
        // have refreshed in the meantime)
        if !cache.is_stale(self.cache_ttl) {
            return Ok(());
        }

        cache.discounts = self.load_discounts().await?;
        cache.mark_updated();

        Ok(())
    }

    /// Force the next discount access to reload from the database
    pub async fn invalidate_discounts(&self) {
        let mut cache = self.cache.write().await;
        cache.last_updated = None;
    }

    /// Insert a new discount
    pub async fn create_discount(
        &self,
        name: &str,
        discount_type: DiscountType,
        value: Decimal,
        valid_from: DateTime<Utc>,
        valid_until: Option<DateTime<Utc>>,
        product_ids: Option<Vec<i32>>,
    ) -> PricingResult<Discount> {
        Self::validate_discount(discount_type, value)?;

        let discount = sqlx::query_as::<_, Discount>(
            r#"
            INSERT INTO discounts (name, discount_type, value, is_active,
                                   valid_from, valid_until, product_ids)
            VALUES ($1, $2, $3, true, $4, $5, $6)
            RETURNING id, name, discount_type, value, is_active,
                      valid_from, valid_until, product_ids
            "#,
        )
        .bind(name)
        .bind(discount_type)
        .bind(value)
        .bind(valid_from)
        .bind(valid_until)
        .bind(product_ids)
        .fetch_one(&self.pool)
        .await?;

        self.invalidate_discounts().await;

        Ok(discount)
    }

    /// Deactivate a discount; returns false when it did not exist
    pub async fn deactivate_discount(&self, discount_id: i32) -> PricingResult<bool> {
        let result = sqlx::query("UPDATE discounts SET is_active = false WHERE id = $1")
            .bind(discount_id)
            .execute(&self.pool)
            .await?;

        self.invalidate_discounts().await;

        Ok(result.rows_affected() > 0)
    }

    /// Validate a discount's value against its type
    pub fn validate_discount(discount_type: DiscountType, value: Decimal) -> PricingResult<()> {
        if value < Decimal::ZERO {
            return Err(PricingError::InvalidDiscount(
                "Discount value must be non-negative".to_string(),
            ));
        }

        match discount_type {
            DiscountType::Percentage => {
                if value > Decimal::ONE_HUNDRED {
                    return Err(PricingError::InvalidDiscount(
                        "Percentage discount cannot exceed 100%".to_string(),
                    ));
                }
            }
            DiscountType::FixedAmount => {
                // Fixed amount can be any non-negative value
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    fn discount(product_ids: Option<Vec<i32>>) -> Discount {
        Discount {
            id: 1,
            name: "Test".to_string(),
            discount_type: DiscountType::Percentage,
            value: dec!(10),
            is_active: true,
            valid_from: Utc::now() - ChronoDuration::days(1),
            valid_until: None,
            product_ids,
        }
    }

    #[test]
    fn test_discount_cache_is_stale() {
        let mut cache = DiscountCache::new();

        // Initially stale (never loaded)
        assert!(cache.is_stale(Duration::from_secs(60)));

        cache.mark_updated();

        assert!(!cache.is_stale(Duration::from_secs(60)));
        assert!(cache.is_stale(Duration::from_secs(0)));
    }

    #[test]
    fn test_discount_applies_to_all_products_without_targeting() {
        let discount = discount(None);
        assert!(discount.applies_to(1, Utc::now()));
        assert!(discount.applies_to(999, Utc::now()));
    }

    #[test]
    fn test_discount_targeting_restricts_products() {
        let discount = discount(Some(vec![1, 2]));
        assert!(discount.applies_to(2, Utc::now()));
        assert!(!discount.applies_to(3, Utc::now()));
    }

    #[test]
    fn test_discount_validity_window() {
        let mut discount = discount(None);
        discount.valid_until = Some(Utc::now() + ChronoDuration::days(1));

        assert!(discount.applies_to(1, Utc::now()));
        assert!(!discount.applies_to(1, Utc::now() + ChronoDuration::days(2)));
        assert!(!discount.applies_to(1, Utc::now() - ChronoDuration::days(2)));
    }

    #[test]
    fn test_inactive_discount_never_applies() {
        let mut discount = discount(None);
        discount.is_active = false;
        assert!(!discount.applies_to(1, Utc::now()));
    }

    #[test]
    fn test_validate_discount_rejects_negative_values() {
        let result = PricingStore::validate_discount(DiscountType::FixedAmount, dec!(-1));
        assert!(matches!(result, Err(PricingError::InvalidDiscount(_))));
    }

    #[test]
    fn test_validate_discount_caps_percentages() {
        assert!(PricingStore::validate_discount(DiscountType::Percentage, dec!(100)).is_ok());

        let result = PricingStore::validate_discount(DiscountType::Percentage, dec!(101));
        assert!(matches!(result, Err(PricingError::InvalidDiscount(_))));

        // Fixed amounts above 100 are fine
        assert!(PricingStore::validate_discount(DiscountType::FixedAmount, dec!(500)).is_ok());
    }

    #[test]
    fn test_attribute_combination_parsing() {
        let row = AttributeCombinationRow {
            id: 1,
            product_id: 2,
            attributes: serde_json::json!([
                {"attribute": "color", "value": "red"},
                {"attribute": "size", "value": "xl"}
            ]),
            price: Some(dec!(95)),
            sku: Some("SKU-RED-XL".to_string()),
        };

        let combination = AttributeCombination::try_from(row).unwrap();
        assert_eq!(combination.attributes.len(), 2);
        assert_eq!(combination.attributes[0].attribute, "color");
        assert_eq!(combination.price, Some(dec!(95)));
    }

    #[test]
    fn test_attribute_combination_rejects_malformed_json() {
        let row = AttributeCombinationRow {
            id: 1,
            product_id: 2,
            attributes: serde_json::json!({"not": "a list"}),
            price: None,
            sku: None,
        };

        let result = AttributeCombination::try_from(row);
        assert!(matches!(result, Err(PricingError::JsonError(_))));
    }
}
