// Domain type definitions for the pricing subsystem
// Provides shared enums used across the store, the calculators and the API

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// How a tier price record is turned into a candidate price
///
/// The stored `price` value of a tier is interpreted according to this method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TierCalculationMethod {
    /// The stored value is the candidate price itself
    Fixed,

    /// The stored value is a percentage subtracted from the product price
    Percental,

    /// The stored value is an absolute amount subtracted from the product price
    Adjustment,
}

impl fmt::Display for TierCalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierCalculationMethod::Fixed => write!(f, "fixed"),
            TierCalculationMethod::Percental => write!(f, "percental"),
            TierCalculationMethod::Adjustment => write!(f, "adjustment"),
        }
    }
}

impl std::str::FromStr for TierCalculationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(TierCalculationMethod::Fixed),
            "percental" => Ok(TierCalculationMethod::Percental),
            "adjustment" => Ok(TierCalculationMethod::Adjustment),
            _ => Err(format!("Invalid tier calculation method: {}", s)),
        }
    }
}

/// Type of discount applied to a price
///
/// Determines how the discount value should be interpreted and applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Discount is a percentage of the price (e.g., 10 = 10% off)
    Percentage,

    /// Discount is a fixed amount subtracted from the price (e.g., 5.00 = $5 off)
    FixedAmount,
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::FixedAmount => write!(f, "fixed_amount"),
        }
    }
}

/// The price baseline a discount candidate was computed against
///
/// Candidates are recorded per baseline so later calculators can look up
/// "was there a discount computed against the tier price" without
/// recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountOrigin {
    /// Computed against the chain's current final price
    FinalPrice,

    /// Computed against the minimum applicable tier price
    MinTierPrice,
}

impl fmt::Display for DiscountOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountOrigin::FinalPrice => write!(f, "final_price"),
            DiscountOrigin::MinTierPrice => write!(f, "min_tier_price"),
        }
    }
}
