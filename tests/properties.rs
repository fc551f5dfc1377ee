//! End-to-end properties of the evaluation engine, driven through the
//! parser and the string renderer.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use exact_real::{parse_expression, CancelToken, EvalError, EvalSettings, Real};

fn settings() -> EvalSettings {
    EvalSettings::default()
}

fn render(cx: &EvalSettings, input: &str, digits: u32) -> String {
    let value = parse_expression(input, cx.factory()).expect("expression should parse");
    value.to_decimal(digits, cx).expect("value should render")
}

/// Renders both expressions and compares them with the final digit dropped,
/// so a one-ulp disagreement in the last place cannot flake the test.
fn assert_same_prefix(cx: &EvalSettings, left: &str, right: &str, digits: u32) {
    let a = render(cx, left, digits);
    let b = render(cx, right, digits);
    assert_eq!(
        a[..a.len() - 1],
        b[..b.len() - 1],
        "{left} and {right} disagree: {a} vs {b}"
    );
}

#[test]
fn pi_to_sixty_four_digits() {
    let cx = settings();
    assert_eq!(
        render(&cx, "pi", 64),
        "3.1415926535897932384626433832795028841971693993751058209749445923"
    );
}

#[test]
fn sin_of_half_pi_is_exactly_one() {
    let cx = settings();
    assert_eq!(
        render(&cx, "sin(0.5*pi)", 64),
        format!("1.{}", "0".repeat(64))
    );
}

#[test]
fn atan_of_sin_of_tiny_argument_is_zero() {
    let cx = settings();
    assert_eq!(
        render(&cx, "atan(sin(1E-100))", 64),
        format!("0.{}", "0".repeat(64))
    );
}

#[test]
fn one_over_a_million() {
    let cx = settings();
    assert_eq!(render(&cx, "1 / 1000000", 6), "0.000001");
}

#[test]
fn sqrt_two_to_ten_digits() {
    let cx = settings();
    assert_eq!(render(&cx, "sqrt(2)", 10), "1.4142135624");
}

#[test]
fn exp_of_one_hundred_to_ten_digits() {
    let cx = settings();
    assert_eq!(
        render(&cx, "exp(100)", 10),
        "26881171418161354484126255515800135873611118.7737419224"
    );
}

#[test]
fn ln_of_exp_of_one_thousand() {
    let cx = settings();
    assert_eq!(render(&cx, "ln(exp(1000))", 0), "1000");
}

#[test]
fn division_by_effective_zero_fails() {
    let cx = settings();
    let value = parse_expression("1/1.0E-10000", cx.factory()).expect("expression should parse");
    assert_eq!(value.to_decimal(4, &cx), Err(EvalError::DivideByZero));
}

#[test]
fn rendering_prefixes_are_stable() {
    let cx = settings();
    for input in ["sqrt(2)", "pi", "exp(1)", "1/7", "ln(3)"] {
        let short = render(&cx, input, 12);
        let long = render(&cx, input, 48);
        assert_eq!(
            short[..short.len() - 1],
            long[..short.len() - 1],
            "{input}: {short} is not a prefix of {long}"
        );
    }
}

#[test]
fn ln_and_exp_are_inverse() {
    let cx = settings();
    assert_same_prefix(&cx, "ln(exp(3))", "3", 30);
    assert_same_prefix(&cx, "exp(ln(10))", "10", 30);
    assert_same_prefix(&cx, "ln(exp(0.25))", "0.25", 30);
}

#[test]
fn sqrt_squares_back() {
    let cx = settings();
    assert_same_prefix(&cx, "sqrt(7)^2", "7", 30);
    assert_same_prefix(&cx, "sqrt(2)*sqrt(2)", "2", 30);
}

#[test]
fn pythagorean_identity() {
    let cx = settings();
    assert_same_prefix(&cx, "sin(1)^2 + cos(1)^2", "1", 40);
    assert_same_prefix(&cx, "sin(0.3)^2 + cos(0.3)^2", "1", 40);
}

#[test]
fn arcsine_and_arctangent_invert() {
    let cx = settings();
    assert_same_prefix(&cx, "sin(asin(0.5))", "0.5", 30);
    assert_same_prefix(&cx, "atan(tan(0.5))", "0.5", 30);
    assert_same_prefix(&cx, "sin(asin(0.25))", "0.25", 30);
}

#[test]
fn negation_and_reciprocal_are_involutions() {
    let cx = settings();
    assert_same_prefix(&cx, "0 - (0 - sqrt(3))", "sqrt(3)", 30);
    assert_same_prefix(&cx, "1/(1/sqrt(3))", "sqrt(3)", 30);
}

#[test]
fn shifts_compose() {
    let cx = settings();
    // (x * 2^3) * 2^-5 == x * 2^-2
    let x = Real::from_i64(7).sqrt();
    let composed = x.clone().shift(3).shift(-5);
    let direct = x.shift(-2);
    let a = composed.to_decimal(20, &cx).expect("composed should render");
    let b = direct.to_decimal(20, &cx).expect("direct should render");
    assert_eq!(a, b);
}

#[test]
fn msd_answers_are_stable_across_bounds() {
    let cx = settings();
    let value = parse_expression("sqrt(2) / 4", cx.factory()).expect("expression should parse");
    let first = value.msd(-20, &cx).expect("msd should succeed");
    assert_eq!(first, Some(-2));
    for bound in [-40, -100, -500] {
        assert_eq!(value.msd(bound, &cx).expect("msd should succeed"), first);
    }
}

#[test]
fn negated_divisions_render_identically() {
    let cx = settings();
    for digits in [1, 8, 20] {
        let expected = format!("-0.5{}", "0".repeat(digits as usize - 1));
        assert_eq!(render(&cx, "-(1/2)", digits), expected);
        assert_eq!(render(&cx, "1/(-2)", digits), expected);
        assert_eq!(render(&cx, "-((-1)/(-2))", digits), expected);
    }
}

#[test]
fn hex_rendering_matches_binary_shifts() {
    let cx = settings();
    let value = parse_expression("1/16", cx.factory()).expect("expression should parse");
    assert_eq!(value.to_hex(2, &cx).expect("render"), "0.10");
}

#[test]
fn cancellation_surfaces_and_leaves_engine_usable() {
    let cx = settings();
    let expensive = parse_expression("exp(100000)", cx.factory()).expect("expression should parse");
    let cancelled = cx.with_token(Arc::new(CancelToken::with_timeout(Duration::from_millis(
        50,
    ))));
    assert_eq!(
        expensive.to_decimal(10000, &cancelled),
        Err(EvalError::Cancelled)
    );
    // The same settings evaluate fresh expressions afterwards.
    assert_eq!(render(&cx, "1+1", 2), "2.00");
}

#[test]
fn parallel_and_sequential_evaluation_agree() {
    let sequential = settings();
    let parallel = sequential.with_parallel(true);
    for input in ["sqrt(2) + pi", "exp(2) * ln(5)", "sin(1) - cos(1)"] {
        assert_eq!(render(&sequential, input, 24), render(&parallel, input, 24));
    }
}

#[test]
fn randomized_rational_identities() {
    let cx = settings();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..16 {
        let numerator = rng.gen_range(1i64..1000);
        let denominator = rng.gen_range(1i64..1000);
        let x = Real::from_i64(numerator) / Real::from_i64(denominator);

        // x + (-x) renders as zero
        let sum = x.clone() + (-x.clone());
        assert_eq!(
            sum.to_decimal(12, &cx).expect("sum should render"),
            "0.000000000000"
        );

        // (1/x) * x stays within one ulp of 1
        let product = x.clone().inverse() * x;
        let text = product.to_decimal(12, &cx).expect("product should render");
        assert!(
            text.starts_with("1.00000000000") || text.starts_with("0.99999999999"),
            "expected ~1, got {text}"
        );
    }
}
