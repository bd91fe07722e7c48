use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::pricing::types::TierCalculationMethod;

/// Represents a catalog product in the database
///
/// `price` is the base price in the primary currency. `has_tier_prices` is a
/// precomputed flag kept in sync by the tier price endpoints so the pricing
/// pipeline can skip the tier lookup for most products. Bundles reference
/// their constituents through `bundle_items`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Walnut desk organizer")]
    pub name: String,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    /// Base price in the primary currency
    pub price: Decimal,
    /// Promotional price, active within the offer window
    pub offer_price: Option<Decimal>,
    pub offer_starts_at: Option<DateTime<Utc>>,
    pub offer_ends_at: Option<DateTime<Utc>>,
    #[schema(example = false)]
    pub has_tier_prices: bool,
    #[schema(example = false)]
    pub is_bundle: bool,
    /// For bundles: price items individually instead of as an aggregate
    #[schema(example = false)]
    pub per_item_pricing: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the data needed to create a new product
///
/// Used for POST /api/products requests. The offer window and bundle flags
/// are optional; id and timestamps are auto-generated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProduct {
    #[schema(example = "Walnut desk organizer")]
    pub name: String,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    pub price: Decimal,
    pub offer_price: Option<Decimal>,
    pub offer_starts_at: Option<DateTime<Utc>>,
    pub offer_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_bundle: bool,
    #[serde(default)]
    pub per_item_pricing: bool,
}

/// Represents the data for updating an existing product
///
/// Used for PUT /api/products/{id} requests. All fields are optional to
/// support partial updates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub offer_price: Option<Decimal>,
    pub offer_starts_at: Option<DateTime<Utc>>,
    pub offer_ends_at: Option<DateTime<Utc>>,
    pub is_bundle: Option<bool>,
    pub per_item_pricing: Option<bool>,
}

/// A quantity-based tier price record for a product
///
/// Rows are kept ordered ascending by quantity threshold; the pricing
/// pipeline relies on that ordering and never re-sorts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TierPrice {
    pub id: i32,
    pub product_id: i32,
    /// Quantity threshold at which this tier starts to apply
    #[schema(example = 10)]
    pub quantity: i32,
    /// Stored value, interpreted according to the calculation method
    pub price: Decimal,
    pub calculation_method: TierCalculationMethod,
}

/// Request DTO for creating a tier price
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTierPrice {
    pub quantity: i32,
    pub price: Decimal,
    pub calculation_method: TierCalculationMethod,
}
