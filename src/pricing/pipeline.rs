// Calculator chain execution
//
// An ordered sequence of calculator units runs against one context in a
// chain-of-responsibility shape: each calculator receives the context and a
// continuation over the remainder of the chain, and may adjust the context
// both before and after delegating. Calculators are registered explicitly
// with a numeric priority at composition time; there is no runtime
// discovery.

use async_trait::async_trait;
use std::sync::Arc;

use crate::pricing::context::CalculatorContext;
use crate::pricing::error::{PricingError, PricingResult};

/// Upper bound on registered calculators per pipeline
///
/// The continuation chain nests one level per calculator, so the depth must
/// stay bounded. Registration fails beyond this limit.
pub const MAX_CALCULATORS: usize = 32;

/// Well-known priority anchors. Lower values run first and wrap later ones.
pub mod ordering {
    pub const EARLY: i32 = -1000;
    pub const DEFAULT: i32 = 0;
    pub const LATE: i32 = 1000;
}

/// A single price-adjustment unit in the chain
///
/// Implementations must call `next.run(ctx)` exactly once to continue the
/// chain. Skipping `next` short-circuits every later calculator and is not
/// something any shipped calculator does. Errors propagate out of the
/// pipeline untouched.
#[async_trait]
pub trait PriceCalculator: Send + Sync {
    async fn calculate(&self, ctx: &mut CalculatorContext, next: Next<'_>) -> PricingResult<()>;
}

struct Registration {
    priority: i32,
    calculator: Arc<dyn PriceCalculator>,
}

/// Continuation over the remaining calculators in the chain
pub struct Next<'a> {
    remaining: &'a [Registration],
}

impl<'a> Next<'a> {
    /// Run the rest of the chain against the context
    pub async fn run(self, ctx: &mut CalculatorContext) -> PricingResult<()> {
        match self.remaining.split_first() {
            Some((head, rest)) => {
                head.calculator
                    .calculate(ctx, Next { remaining: rest })
                    .await
            }
            None => Ok(()),
        }
    }
}

/// An ordered calculator chain, built once at startup and shared
#[derive(Default)]
pub struct CalculatorPipeline {
    calculators: Vec<Registration>,
}

impl CalculatorPipeline {
    pub fn new() -> Self {
        Self {
            calculators: Vec::new(),
        }
    }

    /// Register a calculator at the given priority
    ///
    /// The chain is kept sorted ascending; calculators registered with the
    /// same priority keep their registration order.
    pub fn register(
        &mut self,
        priority: i32,
        calculator: Arc<dyn PriceCalculator>,
    ) -> PricingResult<()> {
        if self.calculators.len() >= MAX_CALCULATORS {
            return Err(PricingError::PipelineOverflow(MAX_CALCULATORS));
        }

        let position = self
            .calculators
            .partition_point(|r| r.priority <= priority);
        self.calculators.insert(
            position,
            Registration {
                priority,
                calculator,
            },
        );

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }

    /// Execute the chain against one context
    pub async fn run(&self, ctx: &mut CalculatorContext) -> PricingResult<()> {
        Next {
            remaining: &self.calculators,
        }
        .run(ctx)
        .await
    }
}
