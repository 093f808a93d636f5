use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::discount::{ApplicablePredefinedDiscounts, DiscountMode, PredefinedDiscount};
use crate::domain::price::PriceInput;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistributionId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    Pack,
    Contract,
}

/// A pack asset row or a distributor mapped row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRow {
    #[serde(default)]
    pub id: Option<String>,
    pub price: Decimal,
    #[serde(default = "selected_by_default")]
    pub is_selected: bool,
}

fn selected_by_default() -> bool {
    true
}

fn unit_exchange_rate() -> Decimal {
    Decimal::ONE
}

impl PriceRow {
    pub fn new(price: Decimal) -> Self {
        Self { id: None, price, is_selected: true }
    }
}

/// Margin, tax and discount configuration owned by a pack quote or a distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTerms {
    #[serde(default)]
    pub buy_price: Decimal,
    #[serde(default)]
    pub margin_value: Decimal,
    #[serde(default)]
    pub tax_value: Decimal,
    #[serde(default = "unit_exchange_rate")]
    pub exchange_rate: Decimal,
    #[serde(default)]
    pub custom_discount: Option<Decimal>,
    /// Attached predefined discounts in attachment order. A second discount of
    /// the same kind is a validation error.
    #[serde(default)]
    pub predefined_discounts: Vec<PredefinedDiscount>,
}

impl Default for PricingTerms {
    fn default() -> Self {
        Self {
            buy_price: Decimal::ZERO,
            margin_value: Decimal::ZERO,
            tax_value: Decimal::ZERO,
            exchange_rate: Decimal::ONE,
            custom_discount: None,
            predefined_discounts: Vec::new(),
        }
    }
}

impl PricingTerms {
    /// Sum of selected rows, converted with the exchange rate. `None` on overflow.
    pub fn total_price(&self, rows: &[PriceRow]) -> Option<Decimal> {
        rows.iter()
            .filter(|row| row.is_selected)
            .try_fold(Decimal::ZERO, |sum, row| sum.checked_add(row.price))?
            .checked_mul(self.exchange_rate)
    }

    pub fn price_input(&self, rows: &[PriceRow]) -> Option<PriceInput> {
        Some(PriceInput {
            total_price: self.total_price(rows)?,
            buy_price: self.buy_price.checked_mul(self.exchange_rate)?,
            margin_value: self.margin_value,
            tax_value: self.tax_value,
        })
    }

    /// Attached discounts slotted by kind; with duplicates the last one wins.
    pub fn applicable_discounts(&self) -> ApplicablePredefinedDiscounts {
        let mut bag = ApplicablePredefinedDiscounts::default();
        for discount in &self.predefined_discounts {
            bag.insert(discount.clone());
        }
        bag
    }

    pub fn discount_mode(&self) -> DiscountMode {
        DiscountMode::resolve(self.custom_discount, &self.applicable_discounts())
    }
}

/// Per-distributor sub-quote of a contract quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub id: DistributionId,
    #[serde(default)]
    pub rows: Vec<PriceRow>,
    #[serde(flatten)]
    pub terms: PricingTerms,
    /// Materialized by the final-total fast path; `None` until computed.
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub final_total_price: Option<Decimal>,
}

impl Distribution {
    pub fn new(id: impl Into<String>, rows: Vec<PriceRow>, terms: PricingTerms) -> Self {
        Self {
            id: DistributionId(id.into()),
            rows,
            terms,
            total_price: None,
            final_total_price: None,
        }
    }

    pub fn price_input(&self) -> Option<PriceInput> {
        self.terms.price_input(&self.rows)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    #[serde(default)]
    pub contract_type: Option<ContractType>,
    /// Pack asset rows; unused for contract quotes.
    #[serde(default)]
    pub rows: Vec<PriceRow>,
    /// Pack pricing terms; unused for contract quotes.
    #[serde(default)]
    pub terms: PricingTerms,
    #[serde(default)]
    pub distributions: Vec<Distribution>,
}

impl Quote {
    pub fn pack(id: impl Into<String>, rows: Vec<PriceRow>, terms: PricingTerms) -> Self {
        Self {
            id: QuoteId(id.into()),
            contract_type: Some(ContractType::Pack),
            rows,
            terms,
            distributions: Vec::new(),
        }
    }

    pub fn contract(id: impl Into<String>, distributions: Vec<Distribution>) -> Self {
        Self {
            id: QuoteId(id.into()),
            contract_type: Some(ContractType::Contract),
            rows: Vec::new(),
            terms: PricingTerms::default(),
            distributions,
        }
    }

    pub fn distribution(&self, id: &DistributionId) -> Option<&Distribution> {
        self.distributions.iter().find(|distribution| &distribution.id == id)
    }
}
