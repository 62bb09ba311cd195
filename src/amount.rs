// src/amount.rs
use alloy::primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::AmountError;

// Largest scale rust_decimal supports
const MAX_DECIMAL_SCALE: u32 = 28;

/// Render a raw fixed-point amount exactly, e.g. `1500000000000000000` with 18
/// decimals becomes `"1.5"`. Trailing zeros of the fraction are dropped.
pub fn format_units(raw: U256, decimals: u32) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Convert a raw amount to a `Decimal` for display. Display only: health
/// classification works on the raw integers.
pub fn to_decimal(raw: U256, decimals: u32) -> Result<Decimal, AmountError> {
    if decimals > MAX_DECIMAL_SCALE {
        return Err(AmountError::Scale(decimals));
    }

    let text = format_units(raw, decimals);
    Decimal::from_str(&text).map_err(|_| AmountError::Overflow(raw.to_string()))
}
