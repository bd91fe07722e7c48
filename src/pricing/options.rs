// Calculation options for a single pricing run
//
// Read-only for the duration of one pipeline execution. Requests may
// override individual flags; everything defaults to the plain storefront
// behavior (all features on, primary currency, no tax).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Options controlling one price calculation
///
/// Amounts inside the calculator chain are always in the primary currency;
/// `target_currency` and `exchange_rate` only affect the final snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PriceCalculationOptions {
    /// Disables tier price processing for this run
    pub ignore_tier_prices: bool,

    /// Disables discount processing; also disables tier processing, which
    /// depends on the discount infrastructure
    pub ignore_discounts: bool,

    /// Enables price-range flagging and lowest-price determination
    pub determine_lowest_price: bool,

    /// Records the attribute-inclusive price as the preselected price
    pub determine_preselected_price: bool,

    /// ISO currency code the snapshot is expressed in
    pub target_currency: String,

    /// Conversion rate from the primary currency into the target currency
    pub exchange_rate: Decimal,

    /// Tax rate in percent applied to the converted final price
    pub tax_rate: Decimal,
}

impl Default for PriceCalculationOptions {
    fn default() -> Self {
        Self {
            ignore_tier_prices: false,
            ignore_discounts: false,
            determine_lowest_price: false,
            determine_preselected_price: false,
            target_currency: "USD".to_string(),
            exchange_rate: Decimal::ONE,
            tax_rate: Decimal::ZERO,
        }
    }
}
