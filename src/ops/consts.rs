//! The shared constants pi and e.
//!
//! Pi runs the Brent-Salamin arithmetic-geometric-mean iteration at twice
//! the requested precision and caches the result at that working precision,
//! so later coarser requests round from the cache instead of iterating
//! again. e sums the reciprocal factorials until the term underflows the
//! working scale.

use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::approx::{check_precision, shift_no_round, shift_rounded, Approximation, Prec};
use crate::cache::{eval_with_cache, ApproxCache};
use crate::concurrency::POLL_INTERVAL;
use crate::error::EvalError;
use crate::node::RealNode;
use crate::settings::EvalSettings;

/// Guard bits between the working precision and the claimed result.
const PI_GUARD_BITS: Prec = 16;

/// pi by Brent-Salamin: `A=1, B=sqrt(1/2), T=1/4, X=1`, then
/// `A <- (A+B)/2, B <- sqrt(B*Y), T <- T - X*(A-Y)^2, X <- 2X` until A and
/// B agree past the target precision; finally `pi ~ A^2 / T`.
pub struct PiNode {
    cache: ApproxCache,
}

impl PiNode {
    pub fn new() -> Self {
        Self {
            cache: ApproxCache::new(),
        }
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        let working = (2 * p - PI_GUARD_BITS).min(-PI_GUARD_BITS);
        check_precision(working)?;
        let bits = (-working) as usize;

        let mut a = BigInt::one() << bits;
        let mut b = (BigInt::one() << (2 * bits - 1)).sqrt();
        let mut t = BigInt::one() << (bits - 2);
        let mut x = BigInt::one();

        // |A - B| < 2^(p - 8), expressed in working-scale ulps.
        let stop_bits = (-p + 8).max(1) as u64;
        loop {
            cx.token().checkpoint()?;
            let y = a.clone();
            a = (&a + &b) >> 1;
            b = (&b * &y).sqrt();
            let d = &a - &y;
            t -= shift_no_round(&(&x * (&d * &d)), working);
            x <<= 1;
            if (&a - &b).magnitude().bits() <= stop_bits {
                break;
            }
        }
        let quotient = (&a * &a) / &t;
        Ok(Approximation::new(
            shift_rounded(&quotient, -PI_GUARD_BITS),
            working + PI_GUARD_BITS,
        ))
    }
}

impl Default for PiNode {
    fn default() -> Self {
        Self::new()
    }
}

impl RealNode for PiNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        eval_with_cache(&self.cache, p, cx, || self.kernel(p, cx))
    }

    fn msd(&self, _p: Prec, _cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        Ok(Some(1))
    }
}

/// e as the factorial series `sum 1/k!`.
pub struct ENode {
    cache: ApproxCache,
}

impl ENode {
    pub fn new() -> Self {
        Self {
            cache: ApproxCache::new(),
        }
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        let q = (2 * p).min(-64);
        check_precision(q)?;
        let one = BigInt::one() << ((-q) as usize);
        let mut term = one.clone();
        let mut sum = one;
        let mut k: u64 = 1;
        loop {
            if k as usize % POLL_INTERVAL == 0 {
                cx.token().checkpoint()?;
            }
            term /= BigInt::from(k);
            if term.is_zero() {
                break;
            }
            sum += &term;
            k += 1;
        }
        Ok(Approximation::new(shift_rounded(&sum, q - p), p))
    }
}

impl Default for ENode {
    fn default() -> Self {
        Self::new()
    }
}

impl RealNode for ENode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        eval_with_cache(&self.cache, p, cx, || self.kernel(p, cx))
    }

    fn msd(&self, _p: Prec, _cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        Ok(Some(1))
    }
}
