// Final price snapshot
//
// Built exactly once from a completed calculator context and never mutated
// afterwards. Context amounts are in the primary currency; every monetary
// field here is converted into the target currency.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use utoipa::ToSchema;

use crate::pricing::context::{AttributePriceAdjustment, CalculatorContext};
use crate::pricing::store::Discount;

/// Monetary values are rounded to 2 decimal places, half away from zero
const DECIMAL_PLACES: u32 = 2;

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Identifying slice of the priced product
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductSummary {
    pub id: i32,
    pub name: String,
    pub sku: String,
}

/// Savings relative to the regular price
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PriceSaving {
    pub saving_amount: Decimal,
    pub saving_percent: Decimal,
}

/// Immutable result of one price calculation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CalculatedPrice {
    pub product: ProductSummary,
    pub currency: String,
    pub quantity: i32,
    pub regular_price: Decimal,
    pub final_price: Decimal,
    pub has_price_range: bool,
    pub offer_price: Option<Decimal>,
    pub preselected_price: Option<Decimal>,
    pub lowest_price: Option<Decimal>,
    pub applied_discounts: Vec<Discount>,
    pub discount_amount: Decimal,
    pub attribute_price_adjustments: Vec<AttributePriceAdjustment>,
    pub tax: Decimal,
    pub price_saving: PriceSaving,
}

impl CalculatedPrice {
    /// Build the snapshot from a finalized context
    pub fn from_context(ctx: &CalculatorContext) -> Self {
        let rate = ctx.options.exchange_rate;
        let convert = |amount: Decimal| round_money(amount * rate);

        let regular_price = convert(ctx.regular_price());
        let final_price = convert(ctx.final_price);

        let tax = round_money(final_price * ctx.options.tax_rate / Decimal::ONE_HUNDRED);

        let saving_amount = (regular_price - final_price).max(Decimal::ZERO);
        let saving_percent = if regular_price > Decimal::ZERO {
            round_money(saving_amount / regular_price * Decimal::ONE_HUNDRED)
        } else {
            Decimal::ZERO
        };

        Self {
            product: ProductSummary {
                id: ctx.product.id,
                name: ctx.product.name.clone(),
                sku: ctx.product.sku.clone(),
            },
            currency: ctx.options.target_currency.clone(),
            quantity: ctx.quantity,
            regular_price,
            final_price,
            has_price_range: ctx.has_price_range,
            offer_price: ctx.offer_price.map(convert),
            preselected_price: ctx.preselected_price.map(convert),
            lowest_price: ctx.lowest_price.map(convert),
            applied_discounts: ctx.applied_discounts.clone(),
            discount_amount: convert(ctx.discount_amount),
            attribute_price_adjustments: ctx
                .attribute_price_adjustments
                .iter()
                .map(|adjustment| AttributePriceAdjustment {
                    attribute: adjustment.attribute.clone(),
                    value: adjustment.value.clone(),
                    adjustment: convert(adjustment.adjustment),
                })
                .collect(),
            tax,
            price_saving: PriceSaving {
                saving_amount,
                saving_percent,
            },
        }
    }
}
