use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ConstraintViolation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    MultiYear,
    PrePay,
    Promotional,
    SpecialNegotiation,
    Custom,
}

impl DiscountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MultiYear => "multi_year",
            Self::PrePay => "pre_pay",
            Self::Promotional => "promotional",
            Self::SpecialNegotiation => "special_negotiation",
            Self::Custom => "custom",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiYearDiscount {
    #[serde(default)]
    pub id: Option<String>,
    pub value: Decimal,
    #[serde(default)]
    pub applicable_value: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrePayDiscount {
    #[serde(default)]
    pub id: Option<String>,
    pub value: Decimal,
    #[serde(default)]
    pub applicable_value: Option<Decimal>,
}

/// Percentage discount that only fires while the running price is at or above
/// `minimum_limit`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionalDiscount {
    #[serde(default)]
    pub id: Option<String>,
    pub value: Decimal,
    pub minimum_limit: Decimal,
    #[serde(default)]
    pub applicable_value: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialNegotiationDiscount {
    #[serde(default)]
    pub id: Option<String>,
    pub value: Decimal,
    #[serde(default)]
    pub applicable_value: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDiscount {
    pub value: Decimal,
    #[serde(default)]
    pub applicable_value: Option<Decimal>,
}

impl MultiYearDiscount {
    pub fn new(value: Decimal) -> Self {
        Self { id: None, value, applicable_value: None }
    }

    pub fn with_applicable_value(self, applicable_value: Decimal) -> Self {
        Self { applicable_value: Some(applicable_value), ..self }
    }
}

impl PrePayDiscount {
    pub fn new(value: Decimal) -> Self {
        Self { id: None, value, applicable_value: None }
    }

    pub fn with_applicable_value(self, applicable_value: Decimal) -> Self {
        Self { applicable_value: Some(applicable_value), ..self }
    }
}

impl PromotionalDiscount {
    pub fn new(value: Decimal, minimum_limit: Decimal) -> Self {
        Self { id: None, value, minimum_limit, applicable_value: None }
    }

    pub fn with_applicable_value(self, applicable_value: Decimal) -> Self {
        Self { applicable_value: Some(applicable_value), ..self }
    }
}

impl SpecialNegotiationDiscount {
    pub fn new(value: Decimal) -> Self {
        Self { id: None, value, applicable_value: None }
    }

    pub fn with_applicable_value(self, applicable_value: Decimal) -> Self {
        Self { applicable_value: Some(applicable_value), ..self }
    }
}

impl CustomDiscount {
    pub fn new(value: Decimal) -> Self {
        Self { value, applicable_value: None }
    }

    pub fn with_applicable_value(self, applicable_value: Decimal) -> Self {
        Self { applicable_value: Some(applicable_value), ..self }
    }
}

/// One predefined discount as attached to a quote or distribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredefinedDiscount {
    MultiYear(MultiYearDiscount),
    PrePay(PrePayDiscount),
    Promotional(PromotionalDiscount),
    SpecialNegotiation(SpecialNegotiationDiscount),
}

impl PredefinedDiscount {
    pub fn kind(&self) -> DiscountKind {
        match self {
            Self::MultiYear(_) => DiscountKind::MultiYear,
            Self::PrePay(_) => DiscountKind::PrePay,
            Self::Promotional(_) => DiscountKind::Promotional,
            Self::SpecialNegotiation(_) => DiscountKind::SpecialNegotiation,
        }
    }

    pub fn value(&self) -> Decimal {
        match self {
            Self::MultiYear(discount) => discount.value,
            Self::PrePay(discount) => discount.value,
            Self::Promotional(discount) => discount.value,
            Self::SpecialNegotiation(discount) => discount.value,
        }
    }

    pub fn with_applicable_value(self, applicable_value: Decimal) -> Self {
        match self {
            Self::MultiYear(d) => Self::MultiYear(d.with_applicable_value(applicable_value)),
            Self::PrePay(d) => Self::PrePay(d.with_applicable_value(applicable_value)),
            Self::Promotional(d) => Self::Promotional(d.with_applicable_value(applicable_value)),
            Self::SpecialNegotiation(d) => {
                Self::SpecialNegotiation(d.with_applicable_value(applicable_value))
            }
        }
    }
}

/// At most one discount of each predefined kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicablePredefinedDiscounts {
    #[serde(default)]
    pub multi_year: Option<MultiYearDiscount>,
    #[serde(default)]
    pub pre_pay: Option<PrePayDiscount>,
    #[serde(default)]
    pub promotional: Option<PromotionalDiscount>,
    #[serde(default)]
    pub special_negotiation: Option<SpecialNegotiationDiscount>,
}

impl ApplicablePredefinedDiscounts {
    /// Builds the bag from an association list in any order.
    ///
    /// A second discount of an already filled kind is reported as a violation
    /// instead of silently replacing the first one.
    pub fn from_attached(
        attached: impl IntoIterator<Item = PredefinedDiscount>,
    ) -> Result<Self, Vec<ConstraintViolation>> {
        let mut bag = Self::default();
        let mut violations = Vec::new();

        for discount in attached {
            let kind = discount.kind();
            if bag.insert(discount) {
                violations.push(ConstraintViolation::new(
                    format!("predefined_discounts.{}", kind.as_str()),
                    "duplicate_discount_kind",
                    format!("more than one {} discount is attached", kind.as_str()),
                ));
            }
        }

        if violations.is_empty() {
            Ok(bag)
        } else {
            Err(violations)
        }
    }

    /// Puts the discount into its slot; returns whether the slot was already filled.
    pub fn insert(&mut self, discount: PredefinedDiscount) -> bool {
        match discount {
            PredefinedDiscount::MultiYear(d) => self.multi_year.replace(d).is_some(),
            PredefinedDiscount::PrePay(d) => self.pre_pay.replace(d).is_some(),
            PredefinedDiscount::Promotional(d) => self.promotional.replace(d).is_some(),
            PredefinedDiscount::SpecialNegotiation(d) => {
                self.special_negotiation.replace(d).is_some()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.multi_year.is_none()
            && self.pre_pay.is_none()
            && self.promotional.is_none()
            && self.special_negotiation.is_none()
    }

    /// Present discounts in application order: multi-year, pre-pay, promotional,
    /// special negotiation.
    pub fn in_application_order(&self) -> Vec<PredefinedDiscount> {
        let mut ordered = Vec::with_capacity(4);
        if let Some(discount) = &self.multi_year {
            ordered.push(PredefinedDiscount::MultiYear(discount.clone()));
        }
        if let Some(discount) = &self.pre_pay {
            ordered.push(PredefinedDiscount::PrePay(discount.clone()));
        }
        if let Some(discount) = &self.promotional {
            ordered.push(PredefinedDiscount::Promotional(discount.clone()));
        }
        if let Some(discount) = &self.special_negotiation {
            ordered.push(PredefinedDiscount::SpecialNegotiation(discount.clone()));
        }
        ordered
    }
}

/// The discount path an entity takes. A custom discount, when present, wins over
/// anything attached as predefined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscountMode {
    Custom(CustomDiscount),
    Predefined(ApplicablePredefinedDiscounts),
}

impl DiscountMode {
    pub fn resolve(
        custom_discount: Option<Decimal>,
        predefined: &ApplicablePredefinedDiscounts,
    ) -> Self {
        match custom_discount {
            Some(value) => Self::Custom(CustomDiscount::new(value)),
            None => Self::Predefined(predefined.clone()),
        }
    }
}

/// Discount selection supplied when recomputing after a discount change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSelection {
    #[serde(default)]
    pub custom_discount: Option<Decimal>,
    #[serde(default)]
    pub predefined_discounts: ApplicablePredefinedDiscounts,
}

impl DiscountSelection {
    pub fn mode(&self) -> DiscountMode {
        DiscountMode::resolve(self.custom_discount, &self.predefined_discounts)
    }
}
