use rust_decimal::Decimal;
use tracing::{debug, debug_span};

use crate::cpq::pipeline::DiscountApplication;
use crate::cpq::{overflow, run_pipeline};
use crate::cpq::validation::{DeterministicPriceValidator, PriceValidator};
use crate::domain::discount::DiscountSelection;
use crate::domain::price::{MarginTaxChange, PriceSummary};
use crate::domain::quote::Distribution;
use crate::errors::CalculationError;

/// Prices one distributor sub-quote from its own rows and terms.
///
/// Nothing here writes back to the distribution; the recompute entry points hand
/// back a fresh summary and leave persistence to the caller.
#[derive(Clone, Debug)]
pub struct DistributionCalculator<V = DeterministicPriceValidator> {
    validator: V,
}

impl Default for DistributionCalculator {
    fn default() -> Self {
        Self::new(DeterministicPriceValidator)
    }
}

impl<V> DistributionCalculator<V>
where
    V: PriceValidator,
{
    pub fn new(validator: V) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Selected row sum in quote currency.
    pub fn total_price(&self, distribution: &Distribution) -> Result<Decimal, CalculationError> {
        distribution
            .terms
            .total_price(&distribution.rows)
            .ok_or_else(|| overflow(&entity_label(distribution)))
    }

    pub fn calculate(
        &self,
        distribution: &Distribution,
    ) -> Result<DiscountApplication, CalculationError> {
        let _span = debug_span!("distribution", distribution_id = %distribution.id.0).entered();

        let application = run_pipeline(
            &self.validator,
            &entity_label(distribution),
            &distribution.terms,
            distribution.price_input(),
            None,
        )?;

        debug!(
            event_name = "pricing.distribution_summary_computed",
            distribution_id = %distribution.id.0,
            total_price = %application.summary.total_price,
            final_total_price = %application.summary.final_total_price,
            "distribution price summary computed"
        );

        Ok(application)
    }

    pub fn price_summary(
        &self,
        distribution: &Distribution,
    ) -> Result<PriceSummary, CalculationError> {
        self.calculate(distribution).map(|application| application.summary)
    }

    /// Re-runs margin, discounts and tax with a new margin/tax pair. The
    /// distribution's discount selection is kept as is.
    pub fn recalculate_after_margin_and_tax(
        &self,
        distribution: &Distribution,
        change: MarginTaxChange,
    ) -> Result<PriceSummary, CalculationError> {
        let _span = debug_span!("distribution_margin_change", distribution_id = %distribution.id.0)
            .entered();

        run_pipeline(
            &self.validator,
            &entity_label(distribution),
            &distribution.terms,
            distribution.price_input().map(|input| input.with_margin_and_tax(change)),
            None,
        )
        .map(|application| application.summary)
    }

    /// Re-runs discounts and tax with a new discount selection. The
    /// distribution's margin and tax are kept as is.
    pub fn recalculate_after_discounts(
        &self,
        distribution: &Distribution,
        selection: &DiscountSelection,
    ) -> Result<PriceSummary, CalculationError> {
        let _span =
            debug_span!("distribution_discount_change", distribution_id = %distribution.id.0)
                .entered();

        run_pipeline(
            &self.validator,
            &entity_label(distribution),
            &distribution.terms,
            distribution.price_input(),
            Some(selection),
        )
        .map(|application| application.summary)
    }
}

fn entity_label(distribution: &Distribution) -> String {
    format!("distribution {}", distribution.id.0)
}
