// Validation utilities module
// Provides custom validation functions for catalog payloads

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

use crate::models::{CreateProduct, CreateTierPrice, UpdateProduct};

/// Validates that a price is strictly positive
pub fn validate_positive_price(price: Decimal) -> Result<(), ValidationError> {
    if price <= Decimal::ZERO {
        Err(ValidationError::new("price_must_be_positive"))
    } else {
        Ok(())
    }
}

/// Validates that an offer window is ordered (start before end)
pub fn validate_offer_window(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if start > end {
            return Err(ValidationError::new("offer_window_inverted"));
        }
    }
    Ok(())
}

/// Validates a product creation payload
pub fn validate_create_product(payload: &CreateProduct) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if payload.name.trim().is_empty() {
        errors.add("name", ValidationError::new("name_required"));
    }
    if payload.sku.trim().is_empty() {
        errors.add("sku", ValidationError::new("sku_required"));
    }
    if let Err(e) = validate_positive_price(payload.price) {
        errors.add("price", e);
    }
    if let Some(offer_price) = payload.offer_price {
        if let Err(e) = validate_positive_price(offer_price) {
            errors.add("offer_price", e);
        }
    }
    if let Err(e) = validate_offer_window(payload.offer_starts_at, payload.offer_ends_at) {
        errors.add("offer_ends_at", e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a product update payload (only the provided fields)
pub fn validate_update_product(payload: &UpdateProduct) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if let Some(ref name) = payload.name {
        if name.trim().is_empty() {
            errors.add("name", ValidationError::new("name_required"));
        }
    }
    if let Some(ref sku) = payload.sku {
        if sku.trim().is_empty() {
            errors.add("sku", ValidationError::new("sku_required"));
        }
    }
    if let Some(price) = payload.price {
        if let Err(e) = validate_positive_price(price) {
            errors.add("price", e);
        }
    }
    if let Some(offer_price) = payload.offer_price {
        if let Err(e) = validate_positive_price(offer_price) {
            errors.add("offer_price", e);
        }
    }
    if let Err(e) = validate_offer_window(payload.offer_starts_at, payload.offer_ends_at) {
        errors.add("offer_ends_at", e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a tier price payload
///
/// The stored value must fit its calculation method: percental tiers stay
/// within 0-100, fixed and adjustment tiers are non-negative.
pub fn validate_create_tier_price(payload: &CreateTierPrice) -> Result<(), ValidationErrors> {
    use crate::pricing::types::TierCalculationMethod;

    let mut errors = ValidationErrors::new();

    if payload.quantity < 1 {
        errors.add("quantity", ValidationError::new("quantity_must_be_positive"));
    }
    if payload.price < Decimal::ZERO {
        errors.add("price", ValidationError::new("price_must_be_non_negative"));
    }
    if payload.calculation_method == TierCalculationMethod::Percental
        && payload.price > Decimal::ONE_HUNDRED
    {
        errors.add("price", ValidationError::new("percentage_exceeds_100"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
