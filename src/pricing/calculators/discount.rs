// Discount application
//
// Innermost unit of the chain: filters the candidate discounts loaded for
// the run, records origin-tagged discount candidates for the outer
// calculators, and applies the single best discount to the final price.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::pricing::context::{CalculatedDiscount, CalculatorContext};
use crate::pricing::error::PricingResult;
use crate::pricing::pipeline::{Next, PriceCalculator};
use crate::pricing::store::Discount;
use crate::pricing::types::{DiscountOrigin, DiscountType};

pub struct DiscountCalculator;

impl DiscountCalculator {
    /// Discount amount against a given price baseline
    pub fn discount_amount(discount: &Discount, price: Decimal) -> Decimal {
        match discount.discount_type {
            DiscountType::Percentage => price * discount.value / Decimal::ONE_HUNDRED,
            DiscountType::FixedAmount => discount.value,
        }
    }
}

#[async_trait]
impl PriceCalculator for DiscountCalculator {
    async fn calculate(&self, ctx: &mut CalculatorContext, next: Next<'_>) -> PricingResult<()> {
        if ctx.options.ignore_discounts {
            return next.run(ctx).await;
        }

        let now = Utc::now();
        let product_id = ctx.product.id;
        let applicable: Vec<Discount> = ctx
            .discounts
            .iter()
            .filter(|discount| discount.applies_to(product_id, now))
            .cloned()
            .collect();

        if applicable.is_empty() {
            return next.run(ctx).await;
        }

        let base_price = ctx.final_price;
        for discount in &applicable {
            ctx.calculated_discounts.push(CalculatedDiscount {
                discount: discount.clone(),
                amount: Self::discount_amount(discount, base_price),
                origin: DiscountOrigin::FinalPrice,
            });

            if let Some(min_tier_price) = ctx.min_tier_price {
                ctx.calculated_discounts.push(CalculatedDiscount {
                    discount: discount.clone(),
                    amount: Self::discount_amount(discount, min_tier_price),
                    origin: DiscountOrigin::MinTierPrice,
                });
            }
        }

        let best = ctx
            .calculated_discounts
            .iter()
            .filter(|candidate| candidate.origin == DiscountOrigin::FinalPrice)
            .max_by(|a, b| a.amount.cmp(&b.amount))
            .cloned();

        if let Some(candidate) = best {
            ctx.add_applied_discount(candidate.discount);
            ctx.discount_amount += candidate.amount;
            ctx.final_price = (ctx.final_price - candidate.amount).max(Decimal::ZERO);
        }

        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::options::PriceCalculationOptions;
    use crate::pricing::pipeline::{ordering, CalculatorPipeline};
    use crate::pricing::test_support::{test_discount, test_fixed_discount, test_product};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn discount_context(price: Decimal, discounts: Vec<Discount>) -> CalculatorContext {
        let mut ctx = CalculatorContext::new(
            test_product(1, price),
            1,
            PriceCalculationOptions::default(),
        );
        ctx.discounts = discounts;
        ctx
    }

    async fn run(ctx: &mut CalculatorContext) {
        let mut pipeline = CalculatorPipeline::new();
        pipeline
            .register(ordering::LATE, Arc::new(DiscountCalculator))
            .unwrap();
        pipeline.run(ctx).await.unwrap();
    }

    #[test]
    fn percentage_amount() {
        let discount = test_discount(1, dec!(10));
        assert_eq!(
            DiscountCalculator::discount_amount(&discount, dec!(100)),
            dec!(10)
        );
    }

    #[test]
    fn fixed_amount() {
        let discount = test_fixed_discount(1, dec!(15));
        assert_eq!(
            DiscountCalculator::discount_amount(&discount, dec!(100)),
            dec!(15)
        );
    }

    #[tokio::test]
    async fn best_discount_wins() {
        let mut ctx = discount_context(
            dec!(100),
            vec![test_discount(1, dec!(10)), test_fixed_discount(2, dec!(25))],
        );

        run(&mut ctx).await;

        assert_eq!(ctx.final_price, dec!(75));
        assert_eq!(ctx.discount_amount, dec!(25));
        assert_eq!(ctx.applied_discounts.len(), 1);
        assert_eq!(ctx.applied_discounts[0].id, 2);
    }

    #[tokio::test]
    async fn discount_never_pushes_price_below_zero() {
        let mut ctx = discount_context(dec!(100), vec![test_fixed_discount(1, dec!(150))]);

        run(&mut ctx).await;

        assert_eq!(ctx.final_price, Decimal::ZERO);
    }

    #[tokio::test]
    async fn inactive_and_expired_discounts_are_skipped() {
        let mut inactive = test_discount(1, dec!(50));
        inactive.is_active = false;

        let mut expired = test_discount(2, dec!(50));
        expired.valid_until = Some(Utc::now() - Duration::days(1));

        let mut upcoming = test_discount(3, dec!(50));
        upcoming.valid_from = Utc::now() + Duration::days(1);

        let mut ctx = discount_context(dec!(100), vec![inactive, expired, upcoming]);

        run(&mut ctx).await;

        assert_eq!(ctx.final_price, dec!(100));
        assert!(ctx.applied_discounts.is_empty());
        assert!(ctx.calculated_discounts.is_empty());
    }

    #[tokio::test]
    async fn product_targeted_discount_only_applies_to_its_products() {
        let mut targeted = test_discount(1, dec!(10));
        targeted.product_ids = Some(vec![42]);

        let mut ctx = discount_context(dec!(100), vec![targeted.clone()]);
        run(&mut ctx).await;
        assert_eq!(ctx.final_price, dec!(100));

        let mut ctx = CalculatorContext::new(
            test_product(42, dec!(100)),
            1,
            PriceCalculationOptions::default(),
        );
        ctx.discounts = vec![targeted];
        run(&mut ctx).await;
        assert_eq!(ctx.final_price, dec!(90));
    }

    #[tokio::test]
    async fn tier_baseline_candidates_are_recorded() {
        let mut ctx = discount_context(dec!(100), vec![test_discount(1, dec!(10))]);
        ctx.min_tier_price = Some(dec!(80));

        run(&mut ctx).await;

        let tier_candidates: Vec<&CalculatedDiscount> = ctx
            .calculated_discounts
            .iter()
            .filter(|c| c.origin == DiscountOrigin::MinTierPrice)
            .collect();

        assert_eq!(tier_candidates.len(), 1);
        assert_eq!(tier_candidates[0].amount, dec!(8));
    }

    #[tokio::test]
    async fn ignore_discounts_disables_processing() {
        let mut ctx = discount_context(dec!(100), vec![test_discount(1, dec!(10))]);
        ctx.options.ignore_discounts = true;

        run(&mut ctx).await;

        assert_eq!(ctx.final_price, dec!(100));
        assert!(ctx.calculated_discounts.is_empty());
    }
}
