// Offer price application
//
// Outermost unit of the chain. Applies a product's promotional offer price
// when its validity window covers the current time, and records the lowest
// observed price once the rest of the chain has finished.

use async_trait::async_trait;
use chrono::Utc;

use crate::pricing::context::CalculatorContext;
use crate::pricing::error::PricingResult;
use crate::pricing::pipeline::{Next, PriceCalculator};

pub struct OfferPriceCalculator;

#[async_trait]
impl PriceCalculator for OfferPriceCalculator {
    async fn calculate(&self, ctx: &mut CalculatorContext, next: Next<'_>) -> PricingResult<()> {
        if let Some(offer_price) = ctx.product.offer_price {
            let now = Utc::now();
            let started = ctx.product.offer_starts_at.map_or(true, |start| start <= now);
            let not_ended = ctx.product.offer_ends_at.map_or(true, |end| now <= end);

            if started && not_ended {
                ctx.offer_price = Some(offer_price);
                if offer_price < ctx.final_price {
                    ctx.final_price = offer_price;
                }
            }
        }

        next.run(ctx).await?;

        // Outermost post pass: the chain has fully settled the final price.
        if ctx.options.determine_lowest_price {
            let lowest = ctx
                .lowest_price
                .map_or(ctx.final_price, |recorded| recorded.min(ctx.final_price));
            ctx.lowest_price = Some(lowest);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::options::PriceCalculationOptions;
    use crate::pricing::pipeline::{ordering, CalculatorPipeline};
    use crate::pricing::test_support::test_product;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn run(ctx: &mut CalculatorContext) {
        let mut pipeline = CalculatorPipeline::new();
        pipeline
            .register(ordering::DEFAULT, Arc::new(OfferPriceCalculator))
            .unwrap();
        pipeline.run(ctx).await.unwrap();
    }

    #[tokio::test]
    async fn active_offer_lowers_final_price() {
        let mut product = test_product(1, dec!(100));
        product.offer_price = Some(dec!(79.90));
        product.offer_starts_at = Some(Utc::now() - Duration::days(1));
        product.offer_ends_at = Some(Utc::now() + Duration::days(1));

        let mut ctx = CalculatorContext::new(product, 1, PriceCalculationOptions::default());
        run(&mut ctx).await;

        assert_eq!(ctx.offer_price, Some(dec!(79.90)));
        assert_eq!(ctx.final_price, dec!(79.90));
    }

    #[tokio::test]
    async fn offer_without_window_is_always_active() {
        let mut product = test_product(1, dec!(100));
        product.offer_price = Some(dec!(90));

        let mut ctx = CalculatorContext::new(product, 1, PriceCalculationOptions::default());
        run(&mut ctx).await;

        assert_eq!(ctx.final_price, dec!(90));
    }

    #[tokio::test]
    async fn expired_offer_is_ignored() {
        let mut product = test_product(1, dec!(100));
        product.offer_price = Some(dec!(79.90));
        product.offer_ends_at = Some(Utc::now() - Duration::days(1));

        let mut ctx = CalculatorContext::new(product, 1, PriceCalculationOptions::default());
        run(&mut ctx).await;

        assert_eq!(ctx.offer_price, None);
        assert_eq!(ctx.final_price, dec!(100));
    }

    #[tokio::test]
    async fn offer_above_final_price_does_not_raise_it() {
        let mut product = test_product(1, dec!(100));
        product.offer_price = Some(dec!(120));

        let mut ctx = CalculatorContext::new(product, 1, PriceCalculationOptions::default());
        run(&mut ctx).await;

        assert_eq!(ctx.offer_price, Some(dec!(120)));
        assert_eq!(ctx.final_price, dec!(100));
    }

    #[tokio::test]
    async fn lowest_price_is_recorded_when_requested() {
        let mut product = test_product(1, dec!(100));
        product.offer_price = Some(dec!(85));

        let mut ctx = CalculatorContext::new(product, 1, PriceCalculationOptions::default());
        ctx.options.determine_lowest_price = true;
        run(&mut ctx).await;

        assert_eq!(ctx.lowest_price, Some(dec!(85)));
    }

    #[tokio::test]
    async fn lowest_price_keeps_an_earlier_lower_record() {
        let mut ctx = CalculatorContext::new(
            test_product(1, dec!(100)),
            1,
            PriceCalculationOptions::default(),
        );
        ctx.options.determine_lowest_price = true;
        ctx.lowest_price = Some(dec!(60));

        run(&mut ctx).await;

        assert_eq!(ctx.lowest_price, Some(dec!(60)));
    }
}
