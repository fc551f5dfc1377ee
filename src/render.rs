//! Rendering computable reals as decimal or hexadecimal strings.
//!
//! The value is scaled by `B^digits` (a multiplication by `10^digits`, or a
//! left shift by `4*digits` for hex), evaluated at precision zero to get a
//! rounded integer, and the digit string is assembled around the fraction
//! point.

use num_bigint::BigInt;
use num_traits::Signed;

use crate::approx::Prec;
use crate::error::EvalError;
use crate::real::Real;
use crate::settings::EvalSettings;

pub fn to_decimal(value: &Real, digits: u32, cx: &EvalSettings) -> Result<String, EvalError> {
    let scale = BigInt::from(10u32).pow(digits);
    let scaled = value.clone() * Real::integer(scale);
    let approximation = scaled.approximate(0, cx)?;
    Ok(format_scaled(&approximation.value, digits, 10))
}

pub fn to_hex(value: &Real, digits: u32, cx: &EvalSettings) -> Result<String, EvalError> {
    let scaled = value.clone().shift(4 * digits as Prec);
    let approximation = scaled.approximate(0, cx)?;
    Ok(format_scaled(&approximation.value, digits, 16))
}

fn format_scaled(value: &BigInt, digits: u32, radix: u32) -> String {
    let negative = value.is_negative();
    let mut text = value.magnitude().to_str_radix(radix);
    let digits = digits as usize;
    if text.len() <= digits {
        let mut padded = String::from("0.");
        for _ in 0..digits - text.len() {
            padded.push('0');
        }
        padded.push_str(&text);
        text = padded;
    } else if digits > 0 {
        text.insert(text.len() - digits, '.');
    }
    if negative {
        text.insert(0, '-');
    }
    text
}
