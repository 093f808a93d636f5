//! Margin, discount and tax pipeline.
//!
//! An entity either takes the custom-discount path or runs its predefined
//! discounts as an ordered list of stages. Each stage discounts the price left by
//! the stages before it, so the order multi-year, pre-pay, promotional, special
//! negotiation is part of the result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpq::margin::{margin_percentage, total_price_after_margin, total_price_after_tax};
use crate::domain::discount::{
    ApplicablePredefinedDiscounts, CustomDiscount, DiscountKind, DiscountMode, MultiYearDiscount,
    PrePayDiscount, PredefinedDiscount, PromotionalDiscount, SpecialNegotiationDiscount,
};
use crate::domain::price::{PriceInput, PriceSummary};

/// What a single stage did to the running price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub kind: DiscountKind,
    pub price_before: Decimal,
    pub applicable_value: Decimal,
    pub price_after: Decimal,
    pub margin_after: Decimal,
}

/// Stage arithmetic returns `None` when a value leaves the `Decimal` range.
pub trait DiscountStage {
    fn kind(&self) -> DiscountKind;

    /// Amount this stage takes off `running_price`.
    fn applicable_value(&self, running_price: Decimal) -> Option<Decimal>;

    fn apply(&self, running_price: Decimal, buy_price: Decimal) -> Option<StageOutcome> {
        let applicable_value = self.applicable_value(running_price)?;
        let price_after = running_price.checked_sub(applicable_value)?;

        Some(StageOutcome {
            kind: self.kind(),
            price_before: running_price,
            applicable_value,
            price_after,
            margin_after: margin_percentage(price_after, buy_price)?,
        })
    }
}

fn percent_of(running_price: Decimal, value: Decimal) -> Option<Decimal> {
    running_price.checked_mul(value.checked_div(Decimal::ONE_HUNDRED)?)
}

impl DiscountStage for MultiYearDiscount {
    fn kind(&self) -> DiscountKind {
        DiscountKind::MultiYear
    }

    fn applicable_value(&self, running_price: Decimal) -> Option<Decimal> {
        percent_of(running_price, self.value)
    }
}

impl DiscountStage for PrePayDiscount {
    fn kind(&self) -> DiscountKind {
        DiscountKind::PrePay
    }

    fn applicable_value(&self, running_price: Decimal) -> Option<Decimal> {
        percent_of(running_price, self.value)
    }
}

impl DiscountStage for PromotionalDiscount {
    fn kind(&self) -> DiscountKind {
        DiscountKind::Promotional
    }

    fn applicable_value(&self, running_price: Decimal) -> Option<Decimal> {
        if self.minimum_limit > running_price {
            return Some(Decimal::ZERO);
        }
        percent_of(running_price, self.value)
    }
}

impl DiscountStage for SpecialNegotiationDiscount {
    fn kind(&self) -> DiscountKind {
        DiscountKind::SpecialNegotiation
    }

    fn applicable_value(&self, running_price: Decimal) -> Option<Decimal> {
        percent_of(running_price, self.value)
    }
}

impl DiscountStage for PredefinedDiscount {
    fn kind(&self) -> DiscountKind {
        PredefinedDiscount::kind(self)
    }

    fn applicable_value(&self, running_price: Decimal) -> Option<Decimal> {
        match self {
            Self::MultiYear(discount) => discount.applicable_value(running_price),
            Self::PrePay(discount) => discount.applicable_value(running_price),
            Self::Promotional(discount) => discount.applicable_value(running_price),
            Self::SpecialNegotiation(discount) => discount.applicable_value(running_price),
        }
    }
}

/// Result of running an entity through the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountApplication {
    pub summary: PriceSummary,
    pub stages: Vec<StageOutcome>,
    /// Present on the custom-discount path, with its applicable value filled.
    pub custom_discount: Option<CustomDiscount>,
    /// Executed predefined discounts with their applicable values filled.
    pub predefined_discounts: ApplicablePredefinedDiscounts,
}

/// Runs margin, the selected discount path, and tax over `input`.
///
/// Returns `None` if any intermediate value overflows.
pub fn apply(input: &PriceInput, mode: &DiscountMode) -> Option<DiscountApplication> {
    let raw_margin = margin_percentage(input.total_price, input.buy_price)?;
    let price_after_margin =
        total_price_after_margin(input.total_price, input.margin_value, Decimal::ZERO)?;
    let summary = PriceSummary::new(input.total_price, input.buy_price, raw_margin)
        .with_total_price_after_margin(price_after_margin);

    match mode {
        DiscountMode::Custom(custom) => apply_custom(input, summary, custom),
        DiscountMode::Predefined(discounts) => apply_predefined(input, summary, discounts),
    }
}

fn apply_custom(
    input: &PriceInput,
    summary: PriceSummary,
    custom: &CustomDiscount,
) -> Option<DiscountApplication> {
    let price_after_margin = summary.total_price_after_margin;
    let discounted = total_price_after_margin(input.total_price, input.margin_value, custom.value)?;
    let applicable_value = price_after_margin.checked_sub(discounted)?;
    let final_margin = margin_percentage(discounted, input.buy_price)?;
    let final_total_price = total_price_after_tax(discounted, input.tax_value)?;

    debug!(
        event_name = "pricing.custom_discount_applied",
        custom_discount = %custom.value,
        applicable_value = %applicable_value,
        final_margin = %final_margin,
        "custom discount applied"
    );

    let summary = summary
        .with_applicable_discounts_value(applicable_value)
        .with_margin_after_custom_discount(final_margin)
        .with_final_margin(final_margin)
        .with_final_total_price_excluding_tax(discounted)
        .with_final_total_price(final_total_price);

    Some(DiscountApplication {
        summary,
        stages: Vec::new(),
        custom_discount: Some(custom.clone().with_applicable_value(applicable_value)),
        predefined_discounts: ApplicablePredefinedDiscounts::default(),
    })
}

fn apply_predefined(
    input: &PriceInput,
    summary: PriceSummary,
    discounts: &ApplicablePredefinedDiscounts,
) -> Option<DiscountApplication> {
    let price_after_margin = summary.total_price_after_margin;
    let mut running_price = price_after_margin;
    let mut summary = summary;
    let mut stages = Vec::new();
    let mut applied = ApplicablePredefinedDiscounts::default();

    for discount in discounts.in_application_order() {
        let outcome = discount.apply(running_price, input.buy_price)?;

        debug!(
            event_name = "pricing.discount_stage_applied",
            stage = outcome.kind.as_str(),
            price_before = %outcome.price_before,
            applicable_value = %outcome.applicable_value,
            margin_after = %outcome.margin_after,
            "discount stage applied"
        );

        running_price = outcome.price_after;
        summary = record_stage_margin(summary, &outcome);
        applied.insert(discount.with_applicable_value(outcome.applicable_value));
        stages.push(outcome);
    }

    let summary = summary
        .with_applicable_discounts_value(price_after_margin.checked_sub(running_price)?)
        .with_final_margin(margin_percentage(running_price, input.buy_price)?)
        .with_final_total_price_excluding_tax(running_price)
        .with_final_total_price(total_price_after_tax(running_price, input.tax_value)?);

    Some(DiscountApplication {
        summary,
        stages,
        custom_discount: None,
        predefined_discounts: applied,
    })
}

fn record_stage_margin(summary: PriceSummary, outcome: &StageOutcome) -> PriceSummary {
    match outcome.kind {
        DiscountKind::MultiYear => {
            summary.with_margin_after_multi_year_discount(outcome.margin_after)
        }
        DiscountKind::PrePay => summary.with_margin_after_pre_pay_discount(outcome.margin_after),
        DiscountKind::Promotional => {
            summary.with_margin_after_promotional_discount(outcome.margin_after)
        }
        DiscountKind::SpecialNegotiation => {
            summary.with_margin_after_sn_discount(outcome.margin_after)
        }
        DiscountKind::Custom => summary.with_margin_after_custom_discount(outcome.margin_after),
    }
}
