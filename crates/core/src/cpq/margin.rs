//! Margin and tax arithmetic every calculation path composes.
//!
//! Margin and discount values are percentages (`25` means 25%); tax is an
//! absolute amount added on top of the discounted price. Every function returns
//! `None` when the result does not fit in a `Decimal`.

use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Denominator that inflates a buy-side total into a sell-side price.
///
/// With `m = (margin_value - custom_discount) / 100` the divider is `1 - m` for
/// `m < 1` and `1 / (m + 1)` otherwise, so it stays positive for any margin.
pub fn margin_divider(margin_value: Decimal, custom_discount: Decimal) -> Option<Decimal> {
    let m = margin_value.checked_sub(custom_discount)?.checked_div(HUNDRED)?;

    if m >= Decimal::ONE {
        Decimal::ONE.checked_div(m.checked_add(Decimal::ONE)?)
    } else {
        Decimal::ONE.checked_sub(m)
    }
}

pub fn total_price_after_margin(
    total_price: Decimal,
    margin_value: Decimal,
    custom_discount: Decimal,
) -> Option<Decimal> {
    total_price.checked_div(margin_divider(margin_value, custom_discount)?)
}

/// Margin of `total_price` over `buy_price` in percent; zero for a zero total.
pub fn margin_percentage(total_price: Decimal, buy_price: Decimal) -> Option<Decimal> {
    if total_price.is_zero() {
        return Some(Decimal::ZERO);
    }

    total_price.checked_sub(buy_price)?.checked_div(total_price)?.checked_mul(HUNDRED)
}

pub fn total_price_after_tax(total_price: Decimal, tax_value: Decimal) -> Option<Decimal> {
    total_price.checked_add(tax_value)
}
