// Price Calculation Subsystem
//
// Computes final display prices for catalog products through an ordered
// chain of price calculators. Each calculator can adjust the in-flight
// context both before and after delegating to the rest of the chain, which
// is what lets the tier price policy compare its candidate against the
// fully discounted price. The subsystem also manages the discount catalog,
// audit logging of calculations and performance metrics.

pub mod audit;
pub mod calculators;
pub mod context;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod options;
pub mod pipeline;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use audit::{AuditLogger, AuditRecord};
pub use context::{
    AttributePriceAdjustment, AttributeSelection, BundleItemScope, CalculatedDiscount,
    CalculatorContext,
};
pub use error::{PricingError, PricingResult};
pub use metrics::PerformanceMetrics;
pub use options::PriceCalculationOptions;
pub use pipeline::{CalculatorPipeline, Next, PriceCalculator};
pub use snapshot::{CalculatedPrice, PriceSaving, ProductSummary};
pub use store::{AttributeCombination, AttributePair, BundleItem, Discount, PricingStore};
pub use types::{DiscountOrigin, DiscountType, TierCalculationMethod};

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::models::Product;

/// Pricing service
///
/// Owns the calculator pipeline and wires the data store, audit logger and
/// metrics around it. Constructed once at startup and shared through the
/// application state; every calculation gets a fresh context.
pub struct PricingService {
    store: Arc<PricingStore>,
    pipeline: CalculatorPipeline,
    audit_logger: AuditLogger,
    metrics: Arc<PerformanceMetrics>,
}

/// Result of a bundle quote
///
/// Aggregate-priced bundles carry a bundle-level snapshot; individually
/// priced bundles only carry per-item snapshots.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct BundleQuote {
    pub bundle: Option<CalculatedPrice>,
    pub items: Vec<CalculatedPrice>,
}

impl PricingService {
    pub fn new(pool: PgPool) -> PricingResult<Self> {
        let metrics = Arc::new(PerformanceMetrics::new());
        let store = Arc::new(PricingStore::with_metrics(pool.clone(), metrics.clone()));
        let audit_logger = AuditLogger::new(pool);
        let pipeline = calculators::default_pipeline()?;

        Ok(Self {
            store,
            pipeline,
            audit_logger,
            metrics,
        })
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn store(&self) -> &PricingStore {
        &self.store
    }

    /// Pre-load the discount cache to avoid cold-start latency
    pub async fn warm_cache(&self) -> PricingResult<()> {
        tracing::info!("Warming discount cache...");
        let discounts = self.store.get_discounts().await?;
        tracing::info!("Discount cache warmed with {} discounts", discounts.len());
        Ok(())
    }

    /// Calculate the price of one product
    pub async fn calculate_price(
        &self,
        product_id: i32,
        quantity: i32,
        selected_attributes: Vec<AttributeSelection>,
        options: PriceCalculationOptions,
    ) -> PricingResult<CalculatedPrice> {
        let _timer = self.metrics.start_quote();

        if quantity < 1 {
            return Err(PricingError::ValidationError(format!(
                "Quantity must be positive, got {}",
                quantity
            )));
        }

        let product = self.store.get_product(product_id).await?;
        let mut ctx = self
            .build_context(product, quantity, selected_attributes, options, None)
            .await?;

        self.pipeline.run(&mut ctx).await?;

        let price = CalculatedPrice::from_context(&ctx);
        self.audit_calculation(&ctx, &price).await;

        Ok(price)
    }

    /// Calculate prices for a bundle product
    ///
    /// Aggregate pricing runs each item through the chain with a child
    /// context, sums the item prices into the bundle total, and merges the
    /// children into the root context via `copy_to`. Individually priced
    /// bundles skip the aggregate and return one snapshot per item, with
    /// tier processing disabled by the bundle scope.
    pub async fn calculate_bundle_price(
        &self,
        product_id: i32,
        options: PriceCalculationOptions,
    ) -> PricingResult<BundleQuote> {
        let _timer = self.metrics.start_bundle_quote();

        let bundle = self.store.get_product(product_id).await?;
        if !bundle.is_bundle {
            return Err(PricingError::NotABundle(product_id));
        }

        let items = self.store.get_bundle_items(bundle.id).await?;
        let per_item_pricing = bundle.per_item_pricing;

        let mut root = CalculatorContext::new(bundle.clone(), 1, options.clone());
        let mut aggregate = Decimal::ZERO;
        let mut item_prices = Vec::with_capacity(items.len());

        for item in &items {
            let product = self.store.get_product(item.product_id).await?;
            let scope = BundleItemScope {
                bundle_product_id: bundle.id,
                item_quantity: item.quantity,
                per_item_pricing,
            };

            let mut child = self
                .build_context(product, item.quantity, Vec::new(), options.clone(), Some(scope))
                .await?;
            self.pipeline.run(&mut child).await?;

            aggregate += child.final_price * Decimal::from(item.quantity);
            item_prices.push(CalculatedPrice::from_context(&child));

            if !per_item_pricing {
                // Merge the finished child into the root. copy_to replaces
                // the root's collections wholesale, so after this loop only
                // the last child's discounts and adjustments remain.
                child.copy_to(&mut root);
            }
        }

        if per_item_pricing {
            return Ok(BundleQuote {
                bundle: None,
                items: item_prices,
            });
        }

        // copy_to moved the root's current-product pointer to the last
        // child; restore the bundle before building the snapshot.
        root.product = bundle;
        root.final_price = aggregate;

        let price = CalculatedPrice::from_context(&root);
        self.audit_calculation(&root, &price).await;

        Ok(BundleQuote {
            bundle: Some(price),
            items: item_prices,
        })
    }

    /// Assemble a fresh context with its data preloaded
    async fn build_context(
        &self,
        product: Product,
        quantity: i32,
        selected_attributes: Vec<AttributeSelection>,
        options: PriceCalculationOptions,
        bundle_item: Option<BundleItemScope>,
    ) -> PricingResult<CalculatorContext> {
        let mut ctx = CalculatorContext::new(product, quantity, options);
        ctx.bundle_item = bundle_item;
        ctx.selected_attributes = selected_attributes;

        if ctx.product.has_tier_prices && !ctx.options.ignore_tier_prices {
            ctx.tier_prices = self.store.get_tier_prices(ctx.product.id).await?;
        }
        if !ctx.options.ignore_discounts {
            ctx.discounts = self.store.get_discounts().await?;
        }
        if !ctx.selected_attributes.is_empty() {
            ctx.attribute_combinations = self
                .store
                .get_attribute_combinations(ctx.product.id)
                .await?;
        }

        Ok(ctx)
    }

    async fn audit_calculation(&self, ctx: &CalculatorContext, price: &CalculatedPrice) {
        let product_id = ctx.product.id;

        for discount in &ctx.applied_discounts {
            self.audit_logger
                .log_discount_application(
                    product_id,
                    discount.id,
                    json!({
                        "discount_type": discount.discount_type.to_string(),
                        "value": discount.value,
                    }),
                    &format!("Applied: {}", discount.name),
                )
                .await;
        }

        self.audit_logger
            .log_price_calculation(
                product_id,
                json!({
                    "quantity": ctx.quantity,
                    "regular_price": price.regular_price,
                    "final_price": price.final_price,
                    "discount_amount": price.discount_amount,
                    "min_tier_price": ctx.min_tier_price,
                    "currency": price.currency,
                }),
                &format!(
                    "Applied {} discounts, saved {}",
                    ctx.applied_discounts.len(),
                    price.price_saving.saving_amount
                ),
            )
            .await;
    }
}
