//! Price formatting and cart totals.
//!
//! Amounts are whole currency units held in [`Decimal`]. Display strings use
//! the fa-IR convention: Persian digits, `٬` as the thousands separator and
//! no fractional digits.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::domain::value_objects::Percentage;

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];
const GROUP_SEPARATOR: char = '\u{066C}';
const MINUS_SIGN: char = '\u{2212}';

/// Rounds to whole currency units, half away from zero.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Renders an amount for display, e.g. `4500` becomes `۴٬۵۰۰`.
pub fn format_price(amount: Decimal) -> String {
    let rounded = round_amount(amount);
    let digits = rounded.abs().trunc().to_string();
    let mut out = String::with_capacity(digits.len() * 3);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push(MINUS_SIGN);
    }
    let len = digits.len();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        match c.to_digit(10) {
            Some(d) => out.push(PERSIAN_DIGITS[d as usize]),
            None => out.push(c),
        }
    }
    out
}

/// An amount that does not fit in a [`Decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountOverflow;

impl std::error::Error for AmountOverflow {}
impl std::fmt::Display for AmountOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Amount is too large") }
}

impl From<AmountOverflow> for crate::EcommerceError {
    fn from(_: AmountOverflow) -> Self { crate::EcommerceError::InvalidQuantity }
}

/// `subtotal * percentage / 100`, rounded to whole currency units.
pub fn discount_amount(subtotal: Decimal, percentage: Percentage) -> Result<Decimal, AmountOverflow> {
    let scaled = subtotal.checked_mul(percentage.value()).ok_or(AmountOverflow)?;
    Ok(round_amount(scaled / Decimal::ONE_HUNDRED))
}

/// One input line to [`compute_totals`].
///
/// Lines whose price or quantity is not a usable number are kept as
/// `Skipped`: they contribute nothing to the totals and are not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TotalsLine {
    Valid { unit_price: Decimal, quantity: u32 },
    Skipped,
}

impl TotalsLine {
    pub fn priced(unit_price: Decimal, quantity: u32) -> Self {
        if unit_price.is_sign_negative() || quantity == 0 {
            return Self::Skipped;
        }
        Self::Valid { unit_price, quantity }
    }

    /// Classifies raw textual input.
    pub fn parse(unit_price: &str, quantity: &str) -> Self {
        match (unit_price.trim().parse::<Decimal>(), quantity.trim().parse::<u32>()) {
            (Ok(price), Ok(qty)) => Self::priced(price, qty),
            _ => Self::Skipped,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_price: Decimal,
    pub total_quantity: u32,
    pub formatted_price: String,
}

pub fn compute_totals<I>(lines: I) -> Result<Totals, AmountOverflow>
where
    I: IntoIterator<Item = TotalsLine>,
{
    let (total_price, total_quantity) = lines.into_iter().try_fold(
        (Decimal::ZERO, 0u32),
        |(price, qty), line| match line {
            TotalsLine::Valid { unit_price, quantity } => {
                let line_total = unit_price.checked_mul(Decimal::from(quantity)).ok_or(AmountOverflow)?;
                Ok((
                    price.checked_add(line_total).ok_or(AmountOverflow)?,
                    qty.checked_add(quantity).ok_or(AmountOverflow)?,
                ))
            }
            TotalsLine::Skipped => Ok((price, qty)),
        },
    )?;
    Ok(Totals { total_price, total_quantity, formatted_price: format_price(total_price) })
}
