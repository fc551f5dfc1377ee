//! Newton square root.
//!
//! The operand's MSD is probed at `2p - 8`; anything smaller makes the root
//! round to zero at the requested precision. The seed comes from a
//! double-precision square root of roughly eighty operand bits, and the
//! iteration `z <- (z^2 + a) / (2z)` doubles the good bits per step, with
//! the operand refetched at the doubled scale each time.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::approx::{
    check_precision, shift_no_round, Approximation, Prec, MAX_PRECISION, MIN_PRECISION,
};
use crate::cache::{eval_with_cache, ApproxCache};
use crate::error::EvalError;
use crate::node::{NodeHandle, RealNode};
use crate::settings::EvalSettings;

/// Bits of agreement demanded between consecutive iterates.
const CONVERGENCE_BITS: u64 = 30;

pub struct SqrtNode {
    inner: NodeHandle,
    cache: ApproxCache,
}

impl SqrtNode {
    pub fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            cache: ApproxCache::new(),
        }
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        let probe_bound = (2 * p - 8).clamp(MIN_PRECISION, MAX_PRECISION);
        let opmsd = match self.inner.msd(probe_bound, cx)? {
            Some(m) if m >= probe_bound => m,
            _ => return Ok(Approximation::zero(p)),
        };
        let result_msd = opmsd.div_euclid(2);

        // Seed: ~80 operand bits, fetched at an even precision so the scale
        // halves cleanly, pushed through a double-precision square root.
        let seed_p = (opmsd - 80) & !1;
        check_precision(seed_p)?;
        let seed_input = self.inner.evaluate(seed_p, cx)?;
        if seed_input.is_negative() {
            return Err(EvalError::SqrtOfNegative);
        }
        let operand_f64 = seed_input
            .value
            .to_f64()
            .ok_or(EvalError::Internal("sqrt seed out of f64 range"))?;
        let mut z = BigInt::from(operand_f64.sqrt() as i64);
        let mut scale: Prec = seed_p / 2;
        let mut good_bits: Prec = 40;

        let needed = (result_msd - p + 32).max(31);
        loop {
            cx.token().checkpoint()?;
            if good_bits >= needed {
                break;
            }
            let target_bits = (good_bits * 2 - 2).min(needed);
            let next_scale = result_msd + 1 - target_bits;
            check_precision(next_scale)?;
            let operand_p = 2 * next_scale;
            check_precision(operand_p)?;
            let a = self.inner.evaluate(operand_p, cx)?;
            if a.is_negative() {
                return Err(EvalError::SqrtOfNegative);
            }

            let aligned = shift_no_round(&z, scale - next_scale);
            let numerator = &aligned * &aligned + &a.value;
            let denominator = &aligned << 1;
            let next: BigInt = numerator / denominator;

            let settled = (&next - &aligned).magnitude().bits() <= CONVERGENCE_BITS;
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

impl RealNode for SqrtNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        eval_with_cache(&self.cache, p, cx, || self.kernel(p, cx))
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        if let Some(m) = self.cache.cached_msd() {
            return Ok(Some(m));
        }
        let bound = (2 * p).clamp(MIN_PRECISION, MAX_PRECISION);
        Ok(self.inner.msd(bound, cx)?.map(|m| m.div_euclid(2)))
    }
}
