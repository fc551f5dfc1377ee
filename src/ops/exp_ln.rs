//! Exponential and natural logarithm.
//!
//! Both follow the engine's two-phase shape: a one-shot argument reduction,
//! built under a mutex on first evaluation, produces a subordinate graph
//! whose innermost node runs the iterative kernel on a small argument.
//!
//! - `exp` reduces by sign (`exp(-x) = 1/exp(x)`), by halving
//!   (`exp(x) = exp(x/2)^2`) and by one e-shift (`exp(x) = exp(x+1)/e`)
//!   until the argument lies in `[1, 2]`, then sums the Taylor series.
//! - `ln` reduces through reciprocals and square roots until the argument
//!   lies in `[1/8, 128]`, then runs Newton on `f(z) = exp(z) - a`.

use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};
use parking_lot::Mutex;

use crate::approx::{check_precision, shift_no_round, shift_rounded, Approximation, Prec};
use crate::cache::{eval_with_cache, ApproxCache};
use crate::concurrency::POLL_INTERVAL;
use crate::error::EvalError;
use crate::node::{search_msd, NodeHandle, RealNode};
use crate::real::Real;
use crate::settings::EvalSettings;

/// `exp(inner)` with lazy argument reduction.
pub struct ExpNode {
    inner: NodeHandle,
    cache: ApproxCache,
    reduced: Mutex<Option<Real>>,
}

impl ExpNode {
    pub fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            cache: ApproxCache::new(),
            reduced: Mutex::new(None),
        }
    }

    fn reduced(&self, cx: &EvalSettings) -> Result<Real, EvalError> {
        let mut slot = self.reduced.lock();
        if let Some(r) = slot.as_ref() {
            return Ok(r.clone());
        }
        let r = self.build_reduction(cx)?;
        *slot = Some(r.clone());
        Ok(r)
    }

    fn build_reduction(&self, cx: &EvalSettings) -> Result<Real, EvalError> {
        let probe = self.inner.evaluate(-10, cx)?;
        let arg = Real::from_node(Arc::clone(&self.inner));
        if probe.is_negative() {
            return Ok((-arg).exp().inverse());
        }
        if probe.value > BigInt::from(1i64 << 11) {
            let half = arg.shift(-1).exp();
            return Ok(half.clone() * half);
        }
        if probe.value < BigInt::from(1i64 << 10) {
            let kernel: NodeHandle =
                Arc::new(ExpKernelNode::new(Arc::clone((arg + Real::from_i64(1)).node())));
            return Ok(Real::from_node(kernel) * cx.factory().inv_e());
        }
        Ok(Real::from_node(Arc::new(ExpKernelNode::new(Arc::clone(
            &self.inner,
        )))))
    }
}

impl RealNode for ExpNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        eval_with_cache(&self.cache, p, cx, || {
            self.reduced(cx)?.node().evaluate(p, cx)
        })
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        if let Some(m) = self.cache.cached_msd() {
            return Ok(Some(m));
        }
        search_msd(&|q| self.evaluate(q, cx), p, cx)
    }
}

/// Taylor kernel for `exp` on a reduced argument.
pub(crate) struct ExpKernelNode {
    inner: NodeHandle,
    cache: ApproxCache,
}

impl ExpKernelNode {
    pub(crate) fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            cache: ApproxCache::new(),
        }
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        let q = (p - 64).min(-32);
        check_precision(q)?;
        let x = self.inner.evaluate(q, cx)?;
        let one = BigInt::one() << ((-q) as usize);
        let mut term = one.clone();
        let mut sum = one;
        let mut k: u64 = 0;
        loop {
            if k as usize % POLL_INTERVAL == 0 {
                cx.token().checkpoint()?;
            }
            k += 1;
            term = shift_no_round(&(&term * &x.value), q) / BigInt::from(k);
            if term.is_zero() {
                break;
            }
            sum += &term;
        }
        Ok(Approximation::new(shift_rounded(&sum, q - p), p))
    }
}

impl RealNode for ExpKernelNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        eval_with_cache(&self.cache, p, cx, || self.kernel(p, cx))
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        if let Some(m) = self.cache.cached_msd() {
            return Ok(Some(m));
        }
        search_msd(&|q| self.evaluate(q, cx), p, cx)
    }
}

/// `ln(inner)` with lazy argument reduction.
pub struct LnNode {
    inner: NodeHandle,
    cache: ApproxCache,
    reduced: Mutex<Option<Real>>,
}

impl LnNode {
    pub fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            cache: ApproxCache::new(),
            reduced: Mutex::new(None),
        }
    }

    fn reduced(&self, cx: &EvalSettings) -> Result<Real, EvalError> {
        let mut slot = self.reduced.lock();
        if let Some(r) = slot.as_ref() {
            return Ok(r.clone());
        }
        let r = self.build_reduction(cx)?;
        *slot = Some(r.clone());
        Ok(r)
    }

    fn build_reduction(&self, cx: &EvalSettings) -> Result<Real, EvalError> {
        let arg = Real::from_node(Arc::clone(&self.inner));
        // Very large operands halve in log space after a coarse sign check;
        // an evaluation at m - 4 sees only the top few bits but is
        // guaranteed nonzero, so the sign is reliable.
        if let Some(m) = self.inner.msd(6, cx)? {
            if m > 13 {
                if self.inner.evaluate(m - 4, cx)?.is_negative() {
                    return Err(EvalError::LnNonPositive);
                }
                return Ok(arg.sqrt().ln().shift(1));
            }
        }
        let probe = self.inner.evaluate(-5, cx)?;
        if probe.is_negative() {
            return Err(EvalError::LnNonPositive);
        }
        if probe.value < BigInt::from(4) {
            return Ok(-(arg.inverse().ln()));
        }
        if probe.value > BigInt::from(4096) {
            return Ok(arg.sqrt().ln().shift(1));
        }
        Ok(Real::from_node(Arc::new(LnKernelNode::new(Arc::clone(
            &self.inner,
        )))))
    }
}

impl RealNode for LnNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        eval_with_cache(&self.cache, p, cx, || {
            self.reduced(cx)?.node().evaluate(p, cx)
        })
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        if let Some(m) = self.cache.cached_msd() {
            return Ok(Some(m));
        }
        search_msd(&|q| self.evaluate(q, cx), p, cx)
    }
}

/// Newton kernel for `ln` on an operand in `[1/8, 128]`:
/// `z <- z - 1 + a * exp(-z)`, seeded from a double-precision logarithm.
pub(crate) struct LnKernelNode {
    inner: NodeHandle,
    cache: ApproxCache,
}

impl LnKernelNode {
    pub(crate) fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            cache: ApproxCache::new(),
        }
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p - 6)?;
        let seed_input = self.inner.evaluate(-50, cx)?;
        if !seed_input.value.to_f64().is_some_and(|d| d > 0.0) {
            return Err(EvalError::LnNonPositive);
        }
        let seed_value = seed_input.to_f64();
        let mut z = BigInt::from((seed_value.ln() * 2f64.powi(40)) as i64);
        let mut scale: Prec = -40;
        // Absolute accuracy of the current iterate, in bits below 2^0.
        let mut accuracy: Prec = 36;

        let arg = Real::from_node(Arc::clone(&self.inner));
        while accuracy < -p + 8 {
            cx.token().checkpoint()?;
            let next_accuracy = (accuracy * 2 - 8).min(-p + 16);
            let next_scale = -next_accuracy - 4;
            check_precision(next_scale)?;

            // Correction term a * exp(-z), evaluated through the graph.
            let iterate = Real::from_scaled(z.clone(), scale);
            let correction = (arg.clone() * (-iterate).exp()).approximate(next_scale, cx)?;

            let one = BigInt::one() << ((-next_scale) as usize);
            let aligned = shift_no_round(&z, scale - next_scale);
            z = aligned - one + correction.value;
            scale = next_scale;
            accuracy = next_accuracy;
        }
        Ok(Approximation::new(shift_rounded(&z, scale - (p - 6)), p - 6))
    }
}

impl RealNode for LnKernelNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        eval_with_cache(&self.cache, p, cx, || self.kernel(p, cx))
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        if let Some(m) = self.cache.cached_msd() {
            return Ok(Some(m));
        }
        search_msd(&|q| self.evaluate(q, cx), p, cx)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::test_utils::{int, settings};

    fn close_to_f64(actual: &Approximation, expected: f64, tolerance_bits: i32) {
        let got = actual.to_f64();
        let err = (got - expected).abs();
        assert!(
            err <= 2f64.powi(tolerance_bits),
            "expected {expected}, got {got}"
        );
    }

    #[test]
    fn exp_of_zero_is_one() {
        let cx = settings();
        let a = int(0).exp().approximate(-20, &cx).expect("exp(0)");
        assert_eq!(a.value, BigInt::one() << 20);
    }

    #[test]
    fn exp_of_one_matches_e() {
        let cx = settings();
        let a = int(1).exp().approximate(-40, &cx).expect("exp(1)");
        close_to_f64(&a, std::f64::consts::E, -36);
    }

    #[test]
    fn exp_of_negative_inverts() {
        let cx = settings();
        let a = int(-1).exp().approximate(-40, &cx).expect("exp(-1)");
        close_to_f64(&a, 1.0 / std::f64::consts::E, -36);
    }

    #[test]
    fn exp_of_large_argument_squares_up() {
        let cx = settings();
        let a = int(10).exp().approximate(-20, &cx).expect("exp(10)");
        close_to_f64(&a, 22026.465794806718, -4);
    }

    #[test]
    fn ln_of_one_is_zero() {
        let cx = settings();
        let a = int(1).ln().approximate(-30, &cx).expect("ln(1)");
        assert!(a.value.magnitude().bits() <= 2, "got {}", a.value);
    }

    #[test]
    fn ln_of_e_region_value() {
        let cx = settings();
        let a = int(5).ln().approximate(-40, &cx).expect("ln(5)");
        close_to_f64(&a, 5f64.ln(), -34);
    }

    #[test]
    fn ln_of_large_value_halves_in_log_space() {
        let cx = settings();
        let a = int(1_000_000).ln().approximate(-30, &cx).expect("ln(1e6)");
        close_to_f64(&a, 1_000_000f64.ln(), -24);
    }

    #[test]
    fn ln_of_small_value_negates_reciprocal() {
        let cx = settings();
        let sixteenth = int(1).shift(-4);
        let a = sixteenth.ln().approximate(-30, &cx).expect("ln(1/16)");
        close_to_f64(&a, (1.0 / 16.0f64).ln(), -24);
    }

    #[test]
    fn ln_of_negative_fails() {
        let cx = settings();
        let result = int(-3).ln().approximate(-10, &cx);
        assert_eq!(result, Err(EvalError::LnNonPositive));
    }

    #[test]
    fn ln_of_large_negative_fails() {
        // Magnitude large enough to reach the log-space halving branch,
        // which must still report the sign failure rather than handing a
        // negative operand to the square root.
        let cx = settings();
        let result = int(-100_000).ln().approximate(-10, &cx);
        assert_eq!(result, Err(EvalError::LnNonPositive));
    }

    #[test]
    fn ln_of_zero_fails_through_division_limit() {
        let cx = settings();
        let result = int(0).ln().approximate(-10, &cx);
        assert_eq!(result, Err(EvalError::DivideByZero));
    }

    #[test]
    fn exp_then_ln_round_trips() {
        let cx = settings();
        let value = int(3);
        let a = value.exp().ln().approximate(-30, &cx).expect("ln(exp(3))");
        close_to_f64(&a, 3.0, -24);
    }
}
