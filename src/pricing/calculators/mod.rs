// Calculator units of the price calculation chain
//
// Registration is explicit: each calculator is composed into the pipeline
// with a numeric priority at startup, lower priorities wrapping higher
// ones. The default chain, outermost first: offer price, tier price,
// attribute price, discount.

pub mod attribute_price;
pub mod discount;
pub mod offer_price;
pub mod tier_price;

pub use attribute_price::AttributePriceCalculator;
pub use discount::DiscountCalculator;
pub use offer_price::OfferPriceCalculator;
pub use tier_price::TierPriceCalculator;

use std::sync::Arc;

use crate::pricing::error::PricingResult;
use crate::pricing::pipeline::{ordering, CalculatorPipeline};

/// Build the default calculator chain
pub fn default_pipeline() -> PricingResult<CalculatorPipeline> {
    let mut pipeline = CalculatorPipeline::new();

    pipeline.register(ordering::DEFAULT, Arc::new(OfferPriceCalculator))?;
    pipeline.register(ordering::DEFAULT + 100, Arc::new(TierPriceCalculator))?;
    pipeline.register(ordering::DEFAULT + 500, Arc::new(AttributePriceCalculator))?;
    pipeline.register(ordering::LATE, Arc::new(DiscountCalculator))?;

    Ok(pipeline)
}
