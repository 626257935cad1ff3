use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};

use crate::error::ApiError;

/// Half a cent: balances closer than this to zero count as settled.
pub const EPSILON: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// One cent, the smallest amount a payment can carry.
pub const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest amount a single expense may carry. Sums of any realistic number
/// of such expenses stay far inside the range of [`Decimal`].
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Rounds to 2 fractional digits, halves away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn is_settled(value: Decimal) -> bool {
    value.abs() < EPSILON
}

/// Reads a non-negative amount from a JSON number or numeric string and
/// rounds it to cents.
pub fn parse_amount(value: &serde_json::Value) -> Result<Decimal, ApiError> {
    let text = match value {
        serde_json::Value::Number(number) => number.to_string(),
        serde_json::Value::String(text) => text.trim().to_string(),
        _ => return Err(ApiError::InvalidAmount),
    };
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ApiError::InvalidAmount)?;
    check_amount(round_cents(amount))
}

// Stored amounts are whole cents between zero and MAX_AMOUNT.
pub fn check_amount(amount: Decimal) -> Result<Decimal, ApiError> {
    let negative = amount.is_sign_negative() && !amount.is_zero();
    if negative || amount > MAX_AMOUNT || amount != round_cents(amount) {
        return Err(ApiError::InvalidAmount);
    }
    Ok(amount)
}

/// Adds up `values`, or `None` when the sum leaves the range of [`Decimal`].
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, value| sum.checked_add(value))
}

/// `serialize_with` helper emitting an amount rounded to cents.
pub fn serialize_cents<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Serialize::serialize(&round_cents(*value), serializer)
}
