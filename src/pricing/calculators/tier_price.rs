// Tier price policy
//
// Decides whether a quantity-based tier price should override the chain's
// computed final price. Runs at `DEFAULT + 100` so it wraps the attribute
// and discount calculators: the minimum tier price is determined before
// they run, and the comparison against their output happens on the way
// back out.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::TierPrice;
use crate::pricing::context::CalculatorContext;
use crate::pricing::error::PricingResult;
use crate::pricing::pipeline::{Next, PriceCalculator};
use crate::pricing::types::{DiscountOrigin, TierCalculationMethod};

pub struct TierPriceCalculator;

impl TierPriceCalculator {
    /// Minimum applicable tier price for the requested quantity
    ///
    /// Walks the tiers in stored order. A tier is skipped when the requested
    /// quantity has not reached its threshold, or when its threshold is
    /// below the previously accepted one (tolerates out-of-order or
    /// duplicate rows). Each qualifying tier's candidate overwrites the
    /// previous result, so with the required ascending ordering the tier
    /// closest to the requested quantity wins. Taking the minimum across
    /// all qualifying tiers instead would pick a high-quantity tier the
    /// customer has not reached.
    fn minimum_tier_price(
        product_price: Decimal,
        tier_prices: &[TierPrice],
        quantity: i32,
    ) -> Option<Decimal> {
        let hundred = Decimal::ONE_HUNDRED;
        let mut previous_qty = 1;
        let mut result = None;

        for tier in tier_prices {
            if quantity < tier.quantity || tier.quantity < previous_qty {
                continue;
            }

            result = Some(match tier.calculation_method {
                TierCalculationMethod::Fixed => tier.price,
                TierCalculationMethod::Percental => {
                    product_price - product_price / hundred * tier.price
                }
                TierCalculationMethod::Adjustment => product_price - tier.price,
            });

            previous_qty = tier.quantity;
        }

        result
    }

    fn engages(ctx: &CalculatorContext) -> bool {
        !ctx.options.ignore_tier_prices
            && !ctx.options.ignore_discounts
            && ctx.product.has_tier_prices
            && !ctx.tier_prices.is_empty()
            && !ctx
                .bundle_item
                .as_ref()
                .is_some_and(|scope| scope.per_item_pricing)
    }
}

#[async_trait]
impl PriceCalculator for TierPriceCalculator {
    async fn calculate(&self, ctx: &mut CalculatorContext, next: Next<'_>) -> PricingResult<()> {
        if !Self::engages(ctx) {
            return next.run(ctx).await;
        }

        ctx.min_tier_price =
            Self::minimum_tier_price(ctx.product.price, &ctx.tier_prices, ctx.quantity);

        if ctx.options.determine_lowest_price && !ctx.has_price_range {
            ctx.has_price_range = ctx.tier_prices.len() > 1
                || ctx.tier_prices.iter().any(|tier| tier.quantity > 1);
        }

        next.run(ctx).await?;

        if let Some(min_tier_price) = ctx.min_tier_price {
            // The comparison must exclude the attribute surcharge; it is
            // re-added once the override is settled.
            let additional_charge = ctx.additional_charge;
            let mut final_price = ctx.final_price - additional_charge;

            if min_tier_price < final_price {
                final_price = min_tier_price;

                let tier_discount = ctx
                    .calculated_discounts
                    .iter()
                    .filter(|candidate| candidate.origin == DiscountOrigin::MinTierPrice)
                    .max_by(|a, b| a.amount.cmp(&b.amount))
                    .cloned();

                if let Some(candidate) = tier_discount {
                    ctx.add_applied_discount(candidate.discount);
                    ctx.discount_amount += candidate.amount;
                    final_price -= candidate.amount;
                }
            }

            ctx.final_price = final_price + additional_charge;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::calculators::discount::DiscountCalculator;
    use crate::pricing::context::{BundleItemScope, CalculatedDiscount};
    use crate::pricing::options::PriceCalculationOptions;
    use crate::pricing::pipeline::{ordering, CalculatorPipeline};
    use crate::pricing::test_support::{test_discount, test_product, test_tier};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn tier(quantity: i32, price: Decimal, method: TierCalculationMethod) -> TierPrice {
        test_tier(quantity, price, method)
    }

    fn tier_context(
        product_price: Decimal,
        quantity: i32,
        tiers: Vec<TierPrice>,
    ) -> CalculatorContext {
        let mut product = test_product(1, product_price);
        product.has_tier_prices = !tiers.is_empty();
        let mut ctx =
            CalculatorContext::new(product, quantity, PriceCalculationOptions::default());
        ctx.tier_prices = tiers;
        ctx
    }

    fn tier_only_pipeline() -> CalculatorPipeline {
        let mut pipeline = CalculatorPipeline::new();
        pipeline
            .register(ordering::DEFAULT + 100, Arc::new(TierPriceCalculator))
            .unwrap();
        pipeline
    }

    #[test]
    fn minimum_tier_price_is_idempotent() {
        let tiers = vec![
            tier(5, dec!(8), TierCalculationMethod::Fixed),
            tier(10, dec!(6), TierCalculationMethod::Fixed),
        ];

        let first = TierPriceCalculator::minimum_tier_price(dec!(10), &tiers, 7);
        let second = TierPriceCalculator::minimum_tier_price(dec!(10), &tiers, 7);

        assert_eq!(first, Some(dec!(8)));
        assert_eq!(first, second);
    }

    #[test]
    fn last_qualifying_tier_wins() {
        let tiers = vec![
            tier(1, dec!(10), TierCalculationMethod::Fixed),
            tier(5, dec!(8), TierCalculationMethod::Fixed),
            tier(10, dec!(6), TierCalculationMethod::Fixed),
        ];

        let result = TierPriceCalculator::minimum_tier_price(dec!(100), &tiers, 12);
        assert_eq!(result, Some(dec!(6)));
    }

    // The walk keeps the result of the last qualifying tier, not the
    // cheapest one: a higher tier may legitimately be more expensive.
    #[test]
    fn last_qualifying_tier_wins_even_when_more_expensive() {
        let tiers = vec![
            tier(5, dec!(6), TierCalculationMethod::Fixed),
            tier(10, dec!(7), TierCalculationMethod::Fixed),
        ];

        let result = TierPriceCalculator::minimum_tier_price(dec!(100), &tiers, 10);
        assert_eq!(result, Some(dec!(7)));
    }

    #[test]
    fn percental_tier_reduces_by_percentage() {
        let tiers = vec![tier(5, dec!(20), TierCalculationMethod::Percental)];

        let result = TierPriceCalculator::minimum_tier_price(dec!(100), &tiers, 5);
        assert_eq!(result, Some(dec!(80)));
    }

    #[test]
    fn adjustment_tier_reduces_by_amount() {
        let tiers = vec![tier(5, dec!(15), TierCalculationMethod::Adjustment)];

        let result = TierPriceCalculator::minimum_tier_price(dec!(100), &tiers, 5);
        assert_eq!(result, Some(dec!(85)));
    }

    #[test]
    fn out_of_order_tiers_are_skipped() {
        let tiers = vec![
            tier(10, dec!(5), TierCalculationMethod::Fixed),
            tier(5, dec!(8), TierCalculationMethod::Fixed),
        ];

        let result = TierPriceCalculator::minimum_tier_price(dec!(100), &tiers, 10);
        assert_eq!(result, Some(dec!(5)));
    }

    #[test]
    fn no_qualifying_tier_yields_none() {
        let tiers = vec![
            tier(5, dec!(8), TierCalculationMethod::Fixed),
            tier(10, dec!(6), TierCalculationMethod::Fixed),
        ];

        let result = TierPriceCalculator::minimum_tier_price(dec!(100), &tiers, 1);
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn no_qualifying_tier_leaves_final_price_unmodified() {
        let mut ctx = tier_context(
            dec!(100),
            1,
            vec![tier(5, dec!(8), TierCalculationMethod::Fixed)],
        );

        tier_only_pipeline().run(&mut ctx).await.unwrap();

        assert_eq!(ctx.min_tier_price, None);
        assert_eq!(ctx.final_price, dec!(100));
    }

    #[tokio::test]
    async fn tier_override_lowers_final_price() {
        let mut ctx = tier_context(
            dec!(100),
            10,
            vec![tier(10, dec!(60), TierCalculationMethod::Fixed)],
        );

        tier_only_pipeline().run(&mut ctx).await.unwrap();

        assert_eq!(ctx.min_tier_price, Some(dec!(60)));
        assert_eq!(ctx.final_price, dec!(60));
    }

    // Charge 5, tier-derived price 50, pre-tier final price 60 including
    // the charge (55 excluding it): the comparison sees 50 < 55, overrides,
    // and the charge is re-added afterwards.
    #[tokio::test]
    async fn comparison_excludes_additional_charge() {
        struct ChargeSeed;

        #[async_trait]
        impl PriceCalculator for ChargeSeed {
            async fn calculate(
                &self,
                ctx: &mut CalculatorContext,
                next: Next<'_>,
            ) -> PricingResult<()> {
                ctx.additional_charge = dec!(5);
                ctx.final_price = dec!(60);
                next.run(ctx).await
            }
        }

        let mut pipeline = CalculatorPipeline::new();
        pipeline
            .register(ordering::DEFAULT + 100, Arc::new(TierPriceCalculator))
            .unwrap();
        pipeline
            .register(ordering::LATE, Arc::new(ChargeSeed))
            .unwrap();

        let mut ctx = tier_context(
            dec!(55),
            10,
            vec![tier(10, dec!(50), TierCalculationMethod::Fixed)],
        );

        pipeline.run(&mut ctx).await.unwrap();

        assert_eq!(ctx.final_price, dec!(55));
    }

    #[tokio::test]
    async fn tier_origin_discount_is_applied_after_override() {
        struct CandidateSeed;

        #[async_trait]
        impl PriceCalculator for CandidateSeed {
            async fn calculate(
                &self,
                ctx: &mut CalculatorContext,
                next: Next<'_>,
            ) -> PricingResult<()> {
                ctx.calculated_discounts.push(CalculatedDiscount {
                    discount: test_discount(1, dec!(4)),
                    amount: dec!(4),
                    origin: DiscountOrigin::MinTierPrice,
                });
                ctx.calculated_discounts.push(CalculatedDiscount {
                    discount: test_discount(2, dec!(6)),
                    amount: dec!(6),
                    origin: DiscountOrigin::MinTierPrice,
                });
                ctx.calculated_discounts.push(CalculatedDiscount {
                    discount: test_discount(3, dec!(9)),
                    amount: dec!(9),
                    origin: DiscountOrigin::FinalPrice,
                });
                next.run(ctx).await
            }
        }

        let mut pipeline = CalculatorPipeline::new();
        pipeline
            .register(ordering::DEFAULT + 100, Arc::new(TierPriceCalculator))
            .unwrap();
        pipeline
            .register(ordering::LATE, Arc::new(CandidateSeed))
            .unwrap();

        let mut ctx = tier_context(
            dec!(100),
            10,
            vec![tier(10, dec!(60), TierCalculationMethod::Fixed)],
        );

        pipeline.run(&mut ctx).await.unwrap();

        // Largest tier-origin candidate (6) wins over the smaller one; the
        // final-price-origin candidate is ignored here.
        assert_eq!(ctx.final_price, dec!(54));
        assert_eq!(ctx.discount_amount, dec!(6));
        assert_eq!(ctx.applied_discounts.len(), 1);
        assert_eq!(ctx.applied_discounts[0].id, 2);
    }

    #[tokio::test]
    async fn individually_priced_bundle_item_skips_tier_processing() {
        let mut ctx = tier_context(
            dec!(100),
            10,
            vec![tier(10, dec!(60), TierCalculationMethod::Fixed)],
        );
        ctx.bundle_item = Some(BundleItemScope {
            bundle_product_id: 99,
            item_quantity: 1,
            per_item_pricing: true,
        });

        tier_only_pipeline().run(&mut ctx).await.unwrap();

        assert_eq!(ctx.min_tier_price, None);
        assert_eq!(ctx.final_price, dec!(100));
    }

    #[tokio::test]
    async fn ignore_flags_disable_tier_processing() {
        for (ignore_tiers, ignore_discounts) in [(true, false), (false, true)] {
            let mut ctx = tier_context(
                dec!(100),
                10,
                vec![tier(10, dec!(60), TierCalculationMethod::Fixed)],
            );
            ctx.options.ignore_tier_prices = ignore_tiers;
            ctx.options.ignore_discounts = ignore_discounts;

            tier_only_pipeline().run(&mut ctx).await.unwrap();

            assert_eq!(ctx.min_tier_price, None);
            assert_eq!(ctx.final_price, dec!(100));
        }
    }

    #[tokio::test]
    async fn price_range_is_flagged_when_lowest_price_is_determined() {
        let mut ctx = tier_context(
            dec!(100),
            1,
            vec![
                tier(5, dec!(8), TierCalculationMethod::Fixed),
                tier(10, dec!(6), TierCalculationMethod::Fixed),
            ],
        );
        ctx.options.determine_lowest_price = true;

        tier_only_pipeline().run(&mut ctx).await.unwrap();

        assert!(ctx.has_price_range);
    }

    // Kept alongside the tier tests because the two calculators cooperate
    // through the MinTierPrice origin: the discount calculator records the
    // candidates the tier calculator later looks up.
    #[tokio::test]
    async fn tier_and_discount_calculators_cooperate() {
        let mut pipeline = CalculatorPipeline::new();
        pipeline
            .register(ordering::DEFAULT + 100, Arc::new(TierPriceCalculator))
            .unwrap();
        pipeline
            .register(ordering::LATE, Arc::new(DiscountCalculator))
            .unwrap();

        let mut ctx = tier_context(
            dec!(100),
            10,
            vec![tier(10, dec!(80), TierCalculationMethod::Fixed)],
        );
        // 10% off: 10 against the final price, 8 against the tier baseline.
        ctx.discounts = vec![test_discount(1, dec!(10))];

        pipeline.run(&mut ctx).await.unwrap();

        // Discounted final price is 90 (excl. charge); the tier price 80 is
        // lower, wins, and the tier-origin candidate (8) is subtracted.
        assert_eq!(ctx.final_price, dec!(72));
        assert_eq!(ctx.discount_amount, dec!(18));
        assert_eq!(ctx.applied_discounts.len(), 1);
    }

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        // The tier walk only ever returns a candidate produced by one of
        // the tier rows, and repeated evaluation is stable.
        #[test]
        fn prop_minimum_tier_price_is_stable_and_grounded() {
            proptest!(|(
                price_cents in 1u32..=100_000u32,
                quantity in 1i32..=50,
                tiers_raw in prop::collection::vec((1i32..=40, 1u32..=100_000u32), 0..=6)
            )| {
                let product_price = Decimal::from(price_cents) / Decimal::from(100);
                let tiers: Vec<TierPrice> = tiers_raw
                    .iter()
                    .map(|&(qty, cents)| {
                        tier(qty, Decimal::from(cents) / Decimal::from(100),
                             TierCalculationMethod::Fixed)
                    })
                    .collect();

                let first = TierPriceCalculator::minimum_tier_price(
                    product_price, &tiers, quantity);
                let second = TierPriceCalculator::minimum_tier_price(
                    product_price, &tiers, quantity);
                prop_assert_eq!(first, second);

                if let Some(result) = first {
                    prop_assert!(tiers.iter().any(|t| t.price == result));
                }
            });
        }

        // With ascending fixed tiers, the winner is the tier closest to,
        // but not exceeding, the requested quantity.
        #[test]
        fn prop_sorted_fixed_tiers_pick_closest_threshold() {
            proptest!(|(
                quantity in 1i32..=100,
                thresholds in prop::collection::btree_set(1i32..=100, 1..=8)
            )| {
                let tiers: Vec<TierPrice> = thresholds
                    .iter()
                    .map(|&qty| tier(qty, Decimal::from(qty), TierCalculationMethod::Fixed))
                    .collect();

                let result = TierPriceCalculator::minimum_tier_price(
                    dec!(1000), &tiers, quantity);

                let expected = thresholds
                    .iter()
                    .filter(|&&qty| qty <= quantity)
                    .max()
                    .map(|&qty| Decimal::from(qty));

                prop_assert_eq!(result, expected);
            });
        }
    }
}
