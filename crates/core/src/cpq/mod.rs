pub mod distribution;
pub mod margin;
pub mod pipeline;
pub mod quote;
pub mod validation;

use tracing::warn;

use crate::domain::discount::DiscountSelection;
use crate::domain::price::{MarginTaxChange, PriceInput, PriceSummary};
use crate::domain::quote::{Distribution, DistributionId, PricingTerms, QuoteId};
use crate::errors::{ApplicationError, CalculationError};
use crate::provider::QuoteDataProvider;

use self::{
    pipeline::DiscountApplication,
    quote::{FinalTotals, QuoteCalculator, QuotePriceSummary},
    validation::{ensure_valid, DeterministicPriceValidator, PriceValidator},
};

/// Validates, then runs the pipeline. Nothing is computed for an entity whose
/// input is rejected.
///
/// `input` is `None` when the row total already left the decimal range. Without
/// a `selection` the discounts attached to `terms` are checked and applied.
pub(crate) fn run_pipeline<V>(
    validator: &V,
    entity: &str,
    terms: &PricingTerms,
    input: Option<PriceInput>,
    selection: Option<&DiscountSelection>,
) -> Result<DiscountApplication, CalculationError>
where
    V: PriceValidator + ?Sized,
{
    let input = input.ok_or_else(|| overflow(entity))?;
    let (mode, attached) = match selection {
        Some(selection) => (selection.mode(), &[][..]),
        None => (terms.discount_mode(), terms.predefined_discounts.as_slice()),
    };

    ensure_valid(validator, entity, terms.exchange_rate, attached, &input, &mode)?;
    pipeline::apply(&input, &mode).ok_or_else(|| overflow(entity))
}

pub(crate) fn overflow(entity: &str) -> CalculationError {
    warn!(
        event_name = "pricing.arithmetic_overflow",
        entity = entity,
        "pricing result does not fit in a decimal"
    );
    CalculationError::Overflow { entity: entity.to_owned() }
}

/// Entry points by identifier: loads snapshots through the provider and hands
/// them to the calculators.
pub struct PricingService<P, V = DeterministicPriceValidator> {
    provider: P,
    calculator: QuoteCalculator<V>,
}

impl<P> PricingService<P, DeterministicPriceValidator>
where
    P: QuoteDataProvider,
{
    pub fn with_default_validator(provider: P) -> Self {
        Self::new(provider, DeterministicPriceValidator)
    }
}

impl<P, V> PricingService<P, V>
where
    P: QuoteDataProvider,
    V: PriceValidator,
{
    pub fn new(provider: P, validator: V) -> Self {
        Self { provider, calculator: QuoteCalculator::new(validator) }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn price_quote(&self, id: &QuoteId) -> Result<QuotePriceSummary, ApplicationError> {
        let quote = self
            .provider
            .find_quote(id)?
            .ok_or_else(|| ApplicationError::NotFound { entity: "quote", id: id.0.clone() })?;

        Ok(self.calculator.price_summary(&quote)?)
    }

    pub fn price_distribution(
        &self,
        id: &DistributionId,
    ) -> Result<PriceSummary, ApplicationError> {
        let distribution = self.load_distribution(id)?;
        Ok(self.calculator.distribution_calculator().price_summary(&distribution)?)
    }

    pub fn recalculate_distribution_after_margin(
        &self,
        id: &DistributionId,
        change: MarginTaxChange,
    ) -> Result<PriceSummary, ApplicationError> {
        let distribution = self.load_distribution(id)?;
        Ok(self
            .calculator
            .distribution_calculator()
            .recalculate_after_margin_and_tax(&distribution, change)?)
    }

    pub fn recalculate_distribution_after_discounts(
        &self,
        id: &DistributionId,
        selection: &DiscountSelection,
    ) -> Result<PriceSummary, ApplicationError> {
        let distribution = self.load_distribution(id)?;
        Ok(self
            .calculator
            .distribution_calculator()
            .recalculate_after_discounts(&distribution, selection)?)
    }

    /// Final totals only. Distributor totals materialized on the way are saved
    /// back through the provider.
    pub fn quote_final_total(&self, id: &QuoteId) -> Result<FinalTotals, ApplicationError> {
        let mut quote = self
            .provider
            .find_quote(id)?
            .ok_or_else(|| ApplicationError::NotFound { entity: "quote", id: id.0.clone() })?;

        let totals = self.calculator.final_total_price(&mut quote)?;
        self.provider.save_quote(quote)?;
        Ok(totals)
    }

    fn load_distribution(&self, id: &DistributionId) -> Result<Distribution, ApplicationError> {
        self.provider.find_distribution(id)?.ok_or_else(|| ApplicationError::NotFound {
            entity: "distribution",
            id: id.0.clone(),
        })
    }
}
