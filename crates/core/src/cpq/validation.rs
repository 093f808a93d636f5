use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::discount::{ApplicablePredefinedDiscounts, DiscountMode, PredefinedDiscount};
use crate::domain::price::PriceInput;
use crate::errors::{CalculationError, ConstraintViolation};

/// Structural checks run before any arithmetic. A non-empty list aborts the
/// calculation for the entity.
pub trait PriceValidator: Send + Sync {
    fn validate_price_input(&self, input: &PriceInput) -> Vec<ConstraintViolation>;

    fn validate_discounts(&self, mode: &DiscountMode) -> Vec<ConstraintViolation>;

    /// Attached discounts as stored on the terms; at most one per kind.
    fn validate_attached(&self, attached: &[PredefinedDiscount]) -> Vec<ConstraintViolation> {
        ApplicablePredefinedDiscounts::from_attached(attached.iter().cloned())
            .err()
            .unwrap_or_default()
    }

    fn validate_exchange_rate(&self, exchange_rate: Decimal) -> Vec<ConstraintViolation> {
        if exchange_rate > Decimal::ZERO {
            return Vec::new();
        }
        vec![ConstraintViolation::new(
            "exchange_rate",
            "non_positive_exchange_rate",
            format!("exchange rate must be greater than zero, got {exchange_rate}"),
        )]
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPriceValidator;

impl PriceValidator for DeterministicPriceValidator {
    fn validate_price_input(&self, input: &PriceInput) -> Vec<ConstraintViolation> {
        let checks = [
            ("total_price", input.total_price, "negative_total_price"),
            ("buy_price", input.buy_price, "negative_buy_price"),
            ("margin_value", input.margin_value, "negative_margin"),
            ("tax_value", input.tax_value, "negative_tax"),
        ];

        checks
            .into_iter()
            .filter(|(_, value, _)| *value < Decimal::ZERO)
            .map(|(field, value, code)| {
                let message = format!("{field} must not be negative, got {value}");
                ConstraintViolation::new(field, code, message)
            })
            .collect()
    }

    fn validate_discounts(&self, mode: &DiscountMode) -> Vec<ConstraintViolation> {
        match mode {
            DiscountMode::Custom(custom) => {
                percentage_violation("custom_discount", custom.value).into_iter().collect()
            }
            DiscountMode::Predefined(discounts) => {
                let mut violations = Vec::new();
                for discount in discounts.in_application_order() {
                    let field = format!("predefined_discounts.{}", discount.kind().as_str());
                    violations
                        .extend(percentage_violation(&format!("{field}.value"), discount.value()));

                    if let PredefinedDiscount::Promotional(promotional) = &discount {
                        if promotional.minimum_limit < Decimal::ZERO {
                            violations.push(ConstraintViolation::new(
                                format!("{field}.minimum_limit"),
                                "negative_minimum_limit",
                                format!(
                                    "promotional minimum limit must not be negative, got {}",
                                    promotional.minimum_limit
                                ),
                            ));
                        }
                    }
                }
                violations
            }
        }
    }
}

fn percentage_violation(field: &str, value: Decimal) -> Option<ConstraintViolation> {
    if value >= Decimal::ZERO && value <= Decimal::ONE_HUNDRED {
        return None;
    }
    Some(ConstraintViolation::new(
        field,
        "discount_out_of_range",
        format!("discount percentage must be within 0..=100, got {value}"),
    ))
}

/// Runs every check and turns a non-empty violation list into a typed error.
pub fn ensure_valid<V>(
    validator: &V,
    entity: &str,
    exchange_rate: Decimal,
    attached: &[PredefinedDiscount],
    input: &PriceInput,
    mode: &DiscountMode,
) -> Result<(), CalculationError>
where
    V: PriceValidator + ?Sized,
{
    let mut violations = validator.validate_exchange_rate(exchange_rate);
    violations.extend(validator.validate_attached(attached));
    violations.extend(validator.validate_price_input(input));
    violations.extend(validator.validate_discounts(mode));

    if violations.is_empty() {
        return Ok(());
    }

    warn!(
        event_name = "pricing.validation_failed",
        entity = entity,
        violation_count = violations.len(),
        codes = %violations.iter().map(|v| v.code.as_str()).collect::<Vec<_>>().join(","),
        "pricing input rejected"
    );

    Err(CalculationError::Validation { entity: entity.to_owned(), violations })
}
