//! Newton reciprocal.
//!
//! The operand's MSD is probed against the configured division limit; a
//! magnitude that cannot be bounded away from zero inside the limit's
//! usable window fails with `DivideByZero`. A double-precision divide
//! seeds roughly thirty good bits, and the iteration `z <- 2z - a*z^2`
//! doubles them each step until the requested precision (plus guard bits)
//! is covered.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use parking_lot::Mutex;

use crate::approx::{check_precision, shift_no_round, shift_rounded, Approximation, Prec};
use crate::cache::{eval_with_cache, ApproxCache};
use crate::error::EvalError;
use crate::node::{NodeHandle, RealNode};
use crate::settings::EvalSettings;

/// Bits of agreement demanded between consecutive iterates.
const CONVERGENCE_BITS: u64 = 30;

pub struct InvNode {
    inner: NodeHandle,
    cache: ApproxCache,
    operand_msd: Mutex<Option<Prec>>,
}

impl InvNode {
    pub fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            cache: ApproxCache::new(),
            operand_msd: Mutex::new(None),
        }
    }

    /// Operand MSD, memoized. The probe searches down to half the
    /// configured division limit: product-shaped operands reveal their
    /// magnitude only when evaluated at roughly twice their own scale, so
    /// the usable denominator window under a limit `L` is `[L/2, inf)`.
    /// An operand that stays invisible there is declared zero.
    fn operand_msd(&self, cx: &EvalSettings) -> Result<Prec, EvalError> {
        if let Some(m) = *self.operand_msd.lock() {
            return Ok(m);
        }
        let m = self
            .inner
            .msd(cx.division_limit() / 2, cx)?
            .ok_or(EvalError::DivideByZero)?;
        if m < cx.division_limit() {
            return Err(EvalError::DivideByZero);
        }
        *self.operand_msd.lock() = Some(m);
        Ok(m)
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        let opmsd = self.operand_msd(cx)?;

        // Seed: fifty operand bits through a double divide leave ~30 good
        // bits at scale -opmsd + 1 - 30.
        check_precision(opmsd - 50)?;
        let seed_input = self.inner.evaluate(opmsd - 50, cx)?;
        let denominator = seed_input
            .value
            .to_f64()
            .ok_or(EvalError::Internal("reciprocal seed out of f64 range"))?;
        if denominator == 0.0 {
            return Err(EvalError::DivideByZero);
        }
        let seed = ((2f64.powi(49) / denominator) * 2f64.powi(30)) as i64;
        let mut z = BigInt::from(seed);
        let mut scale: Prec = -opmsd + 1 - 30;
        let mut good_bits: Prec = 30;

        let needed = (opmsd.abs() - p + 32).max(31);
        loop {
            cx.token().checkpoint()?;
            let target_bits = (good_bits * 2 - 2).min(needed);
            let next_scale = -opmsd + 1 - target_bits;
            check_precision(next_scale)?;

            // Operand sharp enough for this step's bit count.
            let operand_p = opmsd - target_bits - 3;
            check_precision(operand_p)?;
            let a = self.inner.evaluate(operand_p, cx)?;

            // z' = 2z - a*z^2 at the raw product scale, rounded to the new scale.
            let product = &a.value * &z * &z;
            let raw_scale = operand_p + 2 * scale;
            let doubled = shift_no_round(&z, scale - raw_scale + 1);
            let next_raw = doubled - product;
            let next = shift_rounded(&next_raw, raw_scale - next_scale);

            let aligned = shift_no_round(&z, scale - next_scale);
            let settled = (&next - aligned).magnitude().bits() <= CONVERGENCE_BITS;

            z = next;
            scale = next_scale;
            good_bits = target_bits;
            if good_bits >= needed && settled {
                break;
            }
        }
        Ok(Approximation::new(z, scale))
    }
}

impl RealNode for InvNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        eval_with_cache(&self.cache, p, cx, || self.kernel(p, cx))
    }

    fn msd(&self, _p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        Ok(Some(-self.operand_msd(cx)?))
    }

    fn as_inverse(&self) -> Option<NodeHandle> {
        Some(std::sync::Arc::clone(&self.inner))
    }
}
