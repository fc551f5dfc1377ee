//! Shared helpers for the test suites.

use num_bigint::BigInt;

use crate::parser::parse_expression;
use crate::real::Real;
use crate::settings::EvalSettings;

/// Fresh default settings for a test.
pub fn settings() -> EvalSettings {
    EvalSettings::default()
}

/// An exact integer value.
pub fn int(value: i64) -> Real {
    Real::from_i64(value)
}

/// Parses a literal or expression; panics on malformed test input.
pub fn dec(input: &str) -> Real {
    let cx = EvalSettings::default();
    parse_expression(input, cx.factory()).expect("test expression should parse")
}

/// Evaluates at precision 0 and returns the rounded integer.
pub fn eval_int(value: &Real, cx: &EvalSettings) -> BigInt {
    value
        .approximate(0, cx)
        .expect("test value should evaluate")
        .value
}
