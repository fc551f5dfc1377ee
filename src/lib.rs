//! Arbitrary-precision computable-real arithmetic.
//!
//! A computable real is represented by a procedure: given a binary
//! precision `p`, it yields a rounded integer `v` with
//! `|x - v * 2^p| < 2^p`. This crate composes such procedures into a lazy
//! evaluation DAG covering the constants pi and e, field arithmetic,
//! roots, exponentials, logarithms and trigonometric functions, and
//! renders any node as a decimal or hexadecimal string to a chosen number
//! of fraction digits.
//!
//! ```
//! use exact_real::{parse_expression, EvalSettings};
//!
//! let cx = EvalSettings::default();
//! let value = parse_expression("sqrt(2)", cx.factory())?;
//! assert_eq!(value.to_decimal(10, &cx)?, "1.4142135624");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod approx;
pub mod cache;
pub mod concurrency;
pub mod error;
pub mod node;
pub mod ops;
pub mod parser;
pub mod real;
pub mod render;
pub mod repl;
pub mod settings;
pub mod test_utils;

pub use approx::{check_precision, shift_no_round, shift_rounded, Approximation, Prec};
pub use concurrency::CancelToken;
pub use error::{EvalError, ParseError};
pub use parser::parse_expression;
pub use real::Real;
pub use settings::{ConstFactory, EvalSettings, DEFAULT_DIVISION_LIMIT};
