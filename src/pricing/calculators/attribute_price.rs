// Attribute price adjustments
//
// Folds the price adjustments of the request's selected attribute values
// into the surcharge, or applies an attribute combination's own price when
// the selection matches a stored combination exactly.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::pricing::context::{
    AttributePriceAdjustment, AttributeSelection, CalculatorContext,
};
use crate::pricing::error::PricingResult;
use crate::pricing::pipeline::{Next, PriceCalculator};
use crate::pricing::store::AttributeCombination;

pub struct AttributePriceCalculator;

impl AttributePriceCalculator {
    /// Find the stored combination matching the selection exactly
    ///
    /// A combination matches when it carries the same number of attribute
    /// pairs and every selected (attribute, value) pair is among them.
    fn matching_combination<'a>(
        combinations: &'a [AttributeCombination],
        selections: &[AttributeSelection],
    ) -> Option<&'a AttributeCombination> {
        combinations.iter().find(|combination| {
            combination.attributes.len() == selections.len()
                && selections.iter().all(|selection| {
                    combination.attributes.iter().any(|pair| {
                        pair.attribute == selection.attribute && pair.value == selection.value
                    })
                })
        })
    }
}

#[async_trait]
impl PriceCalculator for AttributePriceCalculator {
    async fn calculate(&self, ctx: &mut CalculatorContext, next: Next<'_>) -> PricingResult<()> {
        if ctx.selected_attributes.is_empty() {
            return next.run(ctx).await;
        }

        if let Some(combination) =
            Self::matching_combination(&ctx.attribute_combinations, &ctx.selected_attributes)
                .cloned()
        {
            // A combination price is all-inclusive; per-attribute
            // adjustments are not applied on top of it.
            if let Some(price) = combination.price {
                ctx.final_price = price;
            }
            ctx.applied_attribute_combination = Some(combination);
        } else {
            let selections = ctx.selected_attributes.clone();
            for selection in selections {
                if selection.price_adjustment == Decimal::ZERO {
                    continue;
                }

                ctx.additional_charge += selection.price_adjustment;
                ctx.final_price += selection.price_adjustment;
                ctx.attribute_price_adjustments.push(AttributePriceAdjustment {
                    attribute: selection.attribute,
                    value: selection.value,
                    adjustment: selection.price_adjustment,
                });
            }
        }

        next.run(ctx).await?;

        if ctx.options.determine_preselected_price {
            ctx.preselected_price = Some(ctx.final_price);
        }

        Ok(())
    }
}
