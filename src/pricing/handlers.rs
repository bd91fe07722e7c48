// HTTP handlers for the pricing endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::pricing::{
    AttributeSelection, AuditRecord, BundleQuote, CalculatedPrice, Discount,
    PriceCalculationOptions, PricingError, DiscountType,
};
use crate::AppState;

/// Request DTO for a single-product price quote
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct QuoteRequest {
    pub product_id: i32,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[serde(default)]
    pub selected_attributes: Vec<AttributeSelection>,
    #[serde(default)]
    pub options: PriceCalculationOptions,
}

/// Request DTO for a bundle price quote
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct BundleQuoteRequest {
    pub product_id: i32,
    #[serde(default)]
    pub options: PriceCalculationOptions,
}

/// Request DTO for creating a discount
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateDiscountRequest {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub product_ids: Option<Vec<i32>>,
}

/// Handler for POST /api/pricing/quote
/// Calculates the display price for a product and quantity
#[utoipa::path(
    post,
    path = "/api/pricing/quote",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Price calculated", body = CalculatedPrice),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Product not found")
    ),
    tag = "pricing"
)]
pub async fn quote_handler(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<CalculatedPrice>, PricingError> {
    request.validate()?;

    tracing::debug!(
        "Calculating price for product {} x{}",
        request.product_id,
        request.quantity
    );

    let price = state
        .pricing
        .calculate_price(
            request.product_id,
            request.quantity,
            request.selected_attributes,
            request.options,
        )
        .await?;

    Ok(Json(price))
}

/// Handler for POST /api/pricing/bundle-quote
/// Calculates bundle pricing (aggregate or per item)
pub async fn bundle_quote_handler(
    State(state): State<AppState>,
    Json(request): Json<BundleQuoteRequest>,
) -> Result<Json<BundleQuote>, PricingError> {
    request.validate()?;

    tracing::debug!("Calculating bundle price for product {}", request.product_id);

    let quote = state
        .pricing
        .calculate_bundle_price(request.product_id, request.options)
        .await?;

    Ok(Json(quote))
}

/// Handler for GET /api/pricing/discounts
/// Lists the active discount catalog
pub async fn list_discounts_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Discount>>, PricingError> {
    let discounts = state.pricing.store().get_discounts().await?;
    Ok(Json(discounts))
}

/// Handler for POST /api/pricing/discounts
/// Creates a new discount
pub async fn create_discount_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateDiscountRequest>,
) -> Result<(StatusCode, Json<Discount>), PricingError> {
    request.validate()?;

    let discount = state
        .pricing
        .store()
        .create_discount(
            &request.name,
            request.discount_type,
            request.value,
            request.valid_from.unwrap_or_else(Utc::now),
            request.valid_until,
            request.product_ids,
        )
        .await?;

    tracing::info!("Created discount {} ({})", discount.id, discount.name);
    Ok((StatusCode::CREATED, Json(discount)))
}

/// Handler for DELETE /api/pricing/discounts/:id
/// Deactivates a discount
pub async fn delete_discount_handler(
    State(state): State<AppState>,
    Path(discount_id): Path<i32>,
) -> Result<StatusCode, PricingError> {
    let removed = state.pricing.store().deactivate_discount(discount_id).await?;
    if !removed {
        return Err(PricingError::DiscountNotFound(discount_id));
    }

    tracing::info!("Deactivated discount {}", discount_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/pricing/audit/:product_id
/// Returns the pricing audit trail of a product
pub async fn get_audit_handler(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Json<Vec<AuditRecord>>, PricingError> {
    let audit_logger = crate::pricing::AuditLogger::new(state.db.clone());
    let records = audit_logger.get_audit_records(product_id).await?;
    Ok(Json(records))
}

/// Handler for POST /api/pricing/cache/invalidate
/// Forces the next discount access to reload from the database
pub async fn invalidate_cache_handler(State(state): State<AppState>) -> StatusCode {
    state.pricing.store().invalidate_discounts().await;
    tracing::info!("Discount cache invalidated");
    StatusCode::NO_CONTENT
}

/// Handler for GET /api/pricing/metrics
/// Returns performance metrics for the pricing subsystem
pub async fn get_metrics_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, PricingError> {
    let summary = state.pricing.metrics().summary();

    Ok(Json(serde_json::json!({
        "cache": {
            "hit_rate": format!("{:.1}%", summary.cache_hit_rate * 100.0),
            "hits": summary.cache_hits,
            "misses": summary.cache_misses,
        },
        "quotes": {
            "count": summary.quotes,
            "avg_time_ms": format!("{:.2}", summary.avg_quote_time_ms),
            "slow_operations": summary.slow_quotes,
        },
        "bundle_quotes": {
            "count": summary.bundle_quotes,
            "avg_time_ms": format!("{:.2}", summary.avg_bundle_quote_time_ms),
            "slow_operations": summary.slow_bundle_quotes,
        },
    })))
}
