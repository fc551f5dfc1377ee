#![allow(dead_code)]

use exact_real::{parse_expression, EvalSettings};

/// Parses and renders an expression with fresh settings, so each iteration
/// pays the full evaluation cost instead of hitting a warm cache.
pub fn render_fresh(input: &str, digits: u32) -> String {
    let cx = EvalSettings::default();
    let value = parse_expression(input, cx.factory()).expect("bench expression should parse");
    value
        .to_decimal(digits, &cx)
        .expect("bench expression should render")
}
