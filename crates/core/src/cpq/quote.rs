use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::cpq::distribution::DistributionCalculator;
use crate::cpq::margin::margin_percentage;
use crate::cpq::{overflow, run_pipeline};
use crate::cpq::validation::{DeterministicPriceValidator, PriceValidator};
use crate::domain::discount::DiscountSelection;
use crate::domain::price::{MarginTaxChange, PriceSummary};
use crate::domain::quote::{ContractType, DistributionId, Quote};
use crate::errors::CalculationError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionPriceSummary {
    pub distribution_id: DistributionId,
    /// Position of the distribution in the quote's ordered collection.
    pub index: usize,
    pub summary: PriceSummary,
}

/// Quote-level summary plus, for contract quotes, one summary per distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePriceSummary {
    pub quote: PriceSummary,
    pub distributions: Vec<DistributionPriceSummary>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTotals {
    pub total_price: Decimal,
    pub final_total_price: Decimal,
}

#[derive(Clone, Debug)]
pub struct QuoteCalculator<V = DeterministicPriceValidator> {
    distributions: DistributionCalculator<V>,
}

impl Default for QuoteCalculator {
    fn default() -> Self {
        Self::new(DeterministicPriceValidator)
    }
}

impl<V> QuoteCalculator<V>
where
    V: PriceValidator,
{
    pub fn new(validator: V) -> Self {
        Self { distributions: DistributionCalculator::new(validator) }
    }

    pub fn distribution_calculator(&self) -> &DistributionCalculator<V> {
        &self.distributions
    }

    pub fn price_summary(&self, quote: &Quote) -> Result<QuotePriceSummary, CalculationError> {
        let _span = info_span!("quote_price_summary", quote_id = %quote.id.0).entered();

        let result = match contract_type(quote)? {
            ContractType::Pack => self.pack_summary(quote, None, None),
            ContractType::Contract => self.contract_summary(quote),
        }?;

        info!(
            event_name = "pricing.summary_computed",
            quote_id = %quote.id.0,
            distribution_count = result.distributions.len(),
            final_total_price = %result.quote.final_total_price,
            "quote price summary computed"
        );

        Ok(result)
    }

    /// Pack quotes only: re-runs margin, discounts and tax with a new margin/tax
    /// pair. Contract quotes recompute per distribution.
    pub fn recalculate_pack_after_margin_and_tax(
        &self,
        quote: &Quote,
        change: MarginTaxChange,
    ) -> Result<PriceSummary, CalculationError> {
        require_pack(quote)?;
        self.pack_summary(quote, None, Some(change)).map(|summary| summary.quote)
    }

    pub fn recalculate_pack_after_discounts(
        &self,
        quote: &Quote,
        selection: &DiscountSelection,
    ) -> Result<PriceSummary, CalculationError> {
        require_pack(quote)?;
        self.pack_summary(quote, Some(selection), None).map(|summary| summary.quote)
    }

    /// Totals without the stage breakdown. For contract quotes each
    /// distribution's `total_price` and `final_total_price` are computed only if
    /// not yet materialized, and stored back on the snapshot once every
    /// distribution has priced.
    pub fn final_total_price(&self, quote: &mut Quote) -> Result<FinalTotals, CalculationError> {
        let _span = info_span!("quote_final_total", quote_id = %quote.id.0).entered();

        match contract_type(quote)? {
            ContractType::Pack => {
                let summary = self.pack_summary(quote, None, None)?.quote;
                Ok(FinalTotals {
                    total_price: summary.total_price,
                    final_total_price: summary.final_total_price,
                })
            }
            ContractType::Contract => self.contract_final_total(quote),
        }
    }

    fn contract_final_total(&self, quote: &mut Quote) -> Result<FinalTotals, CalculationError> {
        if quote.distributions.is_empty() {
            return Err(CalculationError::MissingDistributions { quote_id: quote.id.clone() });
        }

        let entity = entity_label(quote);
        let mut totals =
            FinalTotals { total_price: Decimal::ZERO, final_total_price: Decimal::ZERO };
        let mut resolved = Vec::with_capacity(quote.distributions.len());

        for distribution in &quote.distributions {
            let total_price = match distribution.total_price {
                Some(value) => value,
                None => self.distributions.total_price(distribution)?,
            };
            let final_total_price = match distribution.final_total_price {
                Some(value) => value,
                None => self.distributions.price_summary(distribution)?.final_total_price,
            };

            totals.total_price =
                totals.total_price.checked_add(total_price).ok_or_else(|| overflow(&entity))?;
            totals.final_total_price = totals
                .final_total_price
                .checked_add(final_total_price)
                .ok_or_else(|| overflow(&entity))?;
            resolved.push((total_price, final_total_price));
        }

        let mut materialized = 0usize;
        for (distribution, (total_price, final_total_price)) in
            quote.distributions.iter_mut().zip(resolved)
        {
            if distribution.total_price.is_none() {
                distribution.total_price = Some(total_price);
                materialized += 1;
            }
            if distribution.final_total_price.is_none() {
                distribution.final_total_price = Some(final_total_price);
                materialized += 1;
            }
        }

        info!(
            event_name = "pricing.final_total_materialized",
            quote_id = %quote.id.0,
            materialized_fields = materialized,
            final_total_price = %totals.final_total_price,
            "contract final total computed"
        );

        Ok(totals)
    }

    fn pack_summary(
        &self,
        quote: &Quote,
        selection: Option<&DiscountSelection>,
        change: Option<MarginTaxChange>,
    ) -> Result<QuotePriceSummary, CalculationError> {
        let input = quote.terms.price_input(&quote.rows).map(|input| match change {
            Some(change) => input.with_margin_and_tax(change),
            None => input,
        });

        let application = run_pipeline(
            self.distributions.validator(),
            &entity_label(quote),
            &quote.terms,
            input,
            selection,
        )?;

        Ok(QuotePriceSummary { quote: application.summary, distributions: Vec::new() })
    }

    fn contract_summary(&self, quote: &Quote) -> Result<QuotePriceSummary, CalculationError> {
        if quote.distributions.is_empty() {
            return Err(CalculationError::MissingDistributions { quote_id: quote.id.clone() });
        }

        let distributions = quote
            .distributions
            .iter()
            .enumerate()
            .map(|(index, distribution)| {
                Ok(DistributionPriceSummary {
                    distribution_id: distribution.id.clone(),
                    index,
                    summary: self.distributions.price_summary(distribution)?,
                })
            })
            .collect::<Result<Vec<_>, CalculationError>>()?;

        let summary = aggregate(&distributions).ok_or_else(|| overflow(&entity_label(quote)))?;
        Ok(QuotePriceSummary { quote: summary, distributions })
    }
}

/// Sums distributor summaries field by field and recomputes the margins from
/// the sums. Stage margins are per distribution and stay unset here. `None`
/// when a sum leaves the decimal range.
pub fn aggregate(distributions: &[DistributionPriceSummary]) -> Option<PriceSummary> {
    let mut total_price = Decimal::ZERO;
    let mut buy_price = Decimal::ZERO;
    let mut total_price_after_margin = Decimal::ZERO;
    let mut final_total_price = Decimal::ZERO;
    let mut final_total_price_excluding_tax = Decimal::ZERO;
    let mut applicable_discounts_value = Decimal::ZERO;

    for entry in distributions {
        let summary = &entry.summary;
        total_price = total_price.checked_add(summary.total_price)?;
        buy_price = buy_price.checked_add(summary.buy_price)?;
        total_price_after_margin =
            total_price_after_margin.checked_add(summary.total_price_after_margin)?;
        final_total_price = final_total_price.checked_add(summary.final_total_price)?;
        final_total_price_excluding_tax = final_total_price_excluding_tax
            .checked_add(summary.final_total_price_excluding_tax)?;
        applicable_discounts_value =
            applicable_discounts_value.checked_add(summary.applicable_discounts_value)?;
    }

    Some(
        PriceSummary::new(total_price, buy_price, margin_percentage(total_price, buy_price)?)
            .with_total_price_after_margin(total_price_after_margin)
            .with_final_total_price(final_total_price)
            .with_final_total_price_excluding_tax(final_total_price_excluding_tax)
            .with_applicable_discounts_value(applicable_discounts_value)
            .with_final_margin(margin_percentage(final_total_price_excluding_tax, buy_price)?),
    )
}

fn entity_label(quote: &Quote) -> String {
    format!("quote {}", quote.id.0)
}

fn contract_type(quote: &Quote) -> Result<ContractType, CalculationError> {
    quote
        .contract_type
        .ok_or_else(|| CalculationError::UnsupportedContractType { quote_id: quote.id.clone() })
}

fn require_pack(quote: &Quote) -> Result<(), CalculationError> {
    match contract_type(quote)? {
        ContractType::Pack => Ok(()),
        ContractType::Contract => {
            Err(CalculationError::UnsupportedContractType { quote_id: quote.id.clone() })
        }
    }
}
