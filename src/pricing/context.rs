// Working state for one price calculation
//
// A context is created fresh per product pricing request, mutated in place
// by each calculator in the chain, and discarded after the final snapshot
// is built. It is never pooled and never shared across calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, TierPrice};
use crate::pricing::options::PriceCalculationOptions;
use crate::pricing::store::{AttributeCombination, Discount};
use crate::pricing::types::DiscountOrigin;

/// A discount-amount candidate, tagged by the baseline it was computed
/// against so later calculators can look it up without recomputation
#[derive(Debug, Clone, Serialize)]
pub struct CalculatedDiscount {
    pub discount: Discount,
    pub amount: Decimal,
    pub origin: DiscountOrigin,
}

/// A recorded price adjustment from one selected product attribute
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttributePriceAdjustment {
    pub attribute: String,
    pub value: String,
    pub adjustment: Decimal,
}

/// One selected attribute value on a quote request, with the price
/// adjustment the storefront resolved for it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttributeSelection {
    pub attribute: String,
    pub value: String,
    #[serde(default)]
    pub price_adjustment: Decimal,
}

/// Marks a context as belonging to a bundle item rather than a standalone
/// product. Tier processing is disabled for individually priced items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleItemScope {
    pub bundle_product_id: i32,
    pub item_quantity: i32,
    pub per_item_pricing: bool,
}

/// Mutable in-flight state for a single product's price computation
///
/// `final_price` always represents the final price including
/// `additional_charge` once the attribute calculator has run; a calculator
/// comparing against a charge-free baseline must subtract the charge before
/// comparing and re-add it afterward.
#[derive(Debug, Clone)]
pub struct CalculatorContext {
    pub product: Product,
    pub quantity: i32,
    regular_price: Decimal,
    pub final_price: Decimal,
    pub has_price_range: bool,
    pub offer_price: Option<Decimal>,
    pub preselected_price: Option<Decimal>,
    pub lowest_price: Option<Decimal>,
    pub min_tier_price: Option<Decimal>,
    pub additional_charge: Decimal,
    pub discount_amount: Decimal,
    pub applied_discounts: Vec<Discount>,
    pub calculated_discounts: Vec<CalculatedDiscount>,
    pub attribute_price_adjustments: Vec<AttributePriceAdjustment>,
    pub applied_attribute_combination: Option<AttributeCombination>,
    pub options: PriceCalculationOptions,
    pub bundle_item: Option<BundleItemScope>,

    // Inputs preloaded by the data layer before the pipeline runs.
    // Tier prices must be ordered ascending by quantity threshold; the
    // pipeline does not re-sort them.
    pub tier_prices: Vec<TierPrice>,
    pub discounts: Vec<Discount>,
    pub attribute_combinations: Vec<AttributeCombination>,
    pub selected_attributes: Vec<AttributeSelection>,
}

impl CalculatorContext {
    /// Create a fresh context for one pricing run
    ///
    /// The regular price is fixed to the product's base price at
    /// construction and never reassigned afterwards.
    pub fn new(product: Product, quantity: i32, options: PriceCalculationOptions) -> Self {
        let regular_price = product.price;

        Self {
            product,
            quantity,
            regular_price,
            final_price: regular_price,
            has_price_range: false,
            offer_price: None,
            preselected_price: None,
            lowest_price: None,
            min_tier_price: None,
            additional_charge: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            applied_discounts: Vec::new(),
            calculated_discounts: Vec::new(),
            attribute_price_adjustments: Vec::new(),
            applied_attribute_combination: None,
            options,
            bundle_item: None,
            tier_prices: Vec::new(),
            discounts: Vec::new(),
            attribute_combinations: Vec::new(),
            selected_attributes: Vec::new(),
        }
    }

    /// The price set at construction, before any calculator ran
    pub fn regular_price(&self) -> Decimal {
        self.regular_price
    }

    /// Add a discount to the applied set
    ///
    /// `applied_discounts` has set semantics: a discount already present
    /// (by id) is not added again, and insertion order carries no meaning.
    pub fn add_applied_discount(&mut self, discount: Discount) {
        if !self.applied_discounts.iter().any(|d| d.id == discount.id) {
            self.applied_discounts.push(discount);
        }
    }

    /// Merge this (completed child) context into a parent context
    ///
    /// Copies every scalar field, including the product: the target's
    /// current-product pointer becomes this context's product, and the
    /// caller must account for that. The three collection fields are
    /// replaced wholesale (clear, then copy) rather than merged; merging
    /// several children sequentially keeps only the last child's entries.
    /// Options, bundle scope and the preloaded inputs stay the target's own.
    pub fn copy_to(&self, target: &mut CalculatorContext) {
        target.product = self.product.clone();
        target.quantity = self.quantity;
        target.regular_price = self.regular_price;
        target.final_price = self.final_price;
        target.has_price_range = self.has_price_range;
        target.offer_price = self.offer_price;
        target.preselected_price = self.preselected_price;
        target.lowest_price = self.lowest_price;
        target.min_tier_price = self.min_tier_price;
        target.additional_charge = self.additional_charge;
        target.discount_amount = self.discount_amount;
        target.applied_attribute_combination = self.applied_attribute_combination.clone();

        target.applied_discounts.clear();
        target.applied_discounts.extend(self.applied_discounts.iter().cloned());

        target.calculated_discounts.clear();
        target
            .calculated_discounts
            .extend(self.calculated_discounts.iter().cloned());

        target.attribute_price_adjustments.clear();
        target
            .attribute_price_adjustments
            .extend(self.attribute_price_adjustments.iter().cloned());
    }
}
