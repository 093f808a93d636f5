use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Numeric snapshot an entity hands to the engine at the start of a calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceInput {
    pub total_price: Decimal,
    pub buy_price: Decimal,
    pub margin_value: Decimal,
    pub tax_value: Decimal,
}

impl PriceInput {
    pub fn new(
        total_price: Decimal,
        buy_price: Decimal,
        margin_value: Decimal,
        tax_value: Decimal,
    ) -> Self {
        Self { total_price, buy_price, margin_value, tax_value }
    }

    pub fn with_margin_and_tax(self, change: MarginTaxChange) -> Self {
        Self { margin_value: change.margin_value, tax_value: change.tax_value, ..self }
    }
}

/// Newly supplied margin/tax pair for interactive recomputation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginTaxChange {
    pub margin_value: Decimal,
    pub tax_value: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    HalfUp,
    HalfEven,
    Truncate,
}

impl RoundingMode {
    pub fn strategy(self) -> RoundingStrategy {
        match self {
            Self::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Self::HalfEven => RoundingStrategy::MidpointNearestEven,
            Self::Truncate => RoundingStrategy::ToZero,
        }
    }
}

/// Output of every calculation path.
///
/// Values carry full `Decimal` precision; use [`PriceSummary::rounded`] for display.
/// The `with_*` methods consume the summary and return the updated copy, so a
/// summary is never changed after the calculation that produced it returns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub total_price: Decimal,
    pub buy_price: Decimal,
    pub total_price_after_margin: Decimal,
    pub final_total_price: Decimal,
    pub final_total_price_excluding_tax: Decimal,
    pub applicable_discounts_value: Decimal,
    pub raw_margin: Decimal,
    pub final_margin: Decimal,
    pub margin_after_multi_year_discount: Option<Decimal>,
    pub margin_after_pre_pay_discount: Option<Decimal>,
    pub margin_after_promotional_discount: Option<Decimal>,
    pub margin_after_sn_discount: Option<Decimal>,
    pub margin_after_custom_discount: Option<Decimal>,
}

impl PriceSummary {
    pub fn new(total_price: Decimal, buy_price: Decimal, raw_margin: Decimal) -> Self {
        Self { total_price, buy_price, raw_margin, ..Self::default() }
    }

    pub fn with_total_price_after_margin(mut self, value: Decimal) -> Self {
        self.total_price_after_margin = value;
        self
    }

    pub fn with_final_total_price(mut self, value: Decimal) -> Self {
        self.final_total_price = value;
        self
    }

    pub fn with_final_total_price_excluding_tax(mut self, value: Decimal) -> Self {
        self.final_total_price_excluding_tax = value;
        self
    }

    pub fn with_applicable_discounts_value(mut self, value: Decimal) -> Self {
        self.applicable_discounts_value = value;
        self
    }

    pub fn with_final_margin(mut self, value: Decimal) -> Self {
        self.final_margin = value;
        self
    }

    pub fn with_margin_after_multi_year_discount(mut self, value: Decimal) -> Self {
        self.margin_after_multi_year_discount = Some(value);
        self
    }

    pub fn with_margin_after_pre_pay_discount(mut self, value: Decimal) -> Self {
        self.margin_after_pre_pay_discount = Some(value);
        self
    }

    pub fn with_margin_after_promotional_discount(mut self, value: Decimal) -> Self {
        self.margin_after_promotional_discount = Some(value);
        self
    }

    pub fn with_margin_after_sn_discount(mut self, value: Decimal) -> Self {
        self.margin_after_sn_discount = Some(value);
        self
    }

    pub fn with_margin_after_custom_discount(mut self, value: Decimal) -> Self {
        self.margin_after_custom_discount = Some(value);
        self
    }

    pub fn tax_value(&self) -> Decimal {
        self.final_total_price - self.final_total_price_excluding_tax
    }

    /// Display copy with every value rounded to `scale` decimal places.
    pub fn rounded(&self, scale: u32, mode: RoundingMode) -> Self {
        let strategy = mode.strategy();
        let round = |value: Decimal| value.round_dp_with_strategy(scale, strategy);
        let round_opt = |value: Option<Decimal>| value.map(round);

        Self {
            total_price: round(self.total_price),
            buy_price: round(self.buy_price),
            total_price_after_margin: round(self.total_price_after_margin),
            final_total_price: round(self.final_total_price),
            final_total_price_excluding_tax: round(self.final_total_price_excluding_tax),
            applicable_discounts_value: round(self.applicable_discounts_value),
            raw_margin: round(self.raw_margin),
            final_margin: round(self.final_margin),
            margin_after_multi_year_discount: round_opt(self.margin_after_multi_year_discount),
            margin_after_pre_pay_discount: round_opt(self.margin_after_pre_pay_discount),
            margin_after_promotional_discount: round_opt(self.margin_after_promotional_discount),
            margin_after_sn_discount: round_opt(self.margin_after_sn_discount),
            margin_after_custom_discount: round_opt(self.margin_after_custom_discount),
        }
    }
}
