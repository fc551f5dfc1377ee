//! Structural nodes: shift, negation, absolute value, addition,
//! multiplication and integer powers.

use std::sync::Arc;

use num_traits::Signed;
use parking_lot::Mutex;

use crate::approx::{check_precision, shift_rounded, Approximation, Prec};
use crate::cache::{eval_with_cache, ApproxCache};
use crate::error::EvalError;
use crate::node::{evaluate_pair, search_msd, NodeHandle, RealNode};
use crate::real::Real;
use crate::settings::EvalSettings;

/// `inner * 2^amount`. Shift counts compose under addition; a shift by zero
/// is elided by the [`Real`] constructor.
pub struct ShiftNode {
    inner: NodeHandle,
    amount: Prec,
}

impl ShiftNode {
    pub fn new(inner: NodeHandle, amount: Prec) -> Self {
        Self { inner, amount }
    }
}

impl RealNode for ShiftNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        check_precision(p - self.amount)?;
        let operand = self.inner.evaluate(p - self.amount, cx)?;
        Ok(Approximation::new(operand.value, p))
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        check_precision(p - self.amount)?;
        Ok(self
            .inner
            .msd(p - self.amount, cx)?
            .map(|m| m + self.amount))
    }

    fn as_shift(&self) -> Option<(NodeHandle, Prec)> {
        Some((Arc::clone(&self.inner), self.amount))
    }
}

/// `-inner`.
pub struct NegNode {
    inner: NodeHandle,
}

impl NegNode {
    pub fn new(inner: NodeHandle) -> Self {
        Self { inner }
    }
}

impl RealNode for NegNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        let operand = self.inner.evaluate(p, cx)?;
        Ok(Approximation::new(-operand.value, p))
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        self.inner.msd(p, cx)
    }

    fn as_negate(&self) -> Option<NodeHandle> {
        Some(Arc::clone(&self.inner))
    }
}

/// `|inner|`.
pub struct AbsNode {
    inner: NodeHandle,
}

impl AbsNode {
    pub fn new(inner: NodeHandle) -> Self {
        Self { inner }
    }
}

impl RealNode for AbsNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        let operand = self.inner.evaluate(p, cx)?;
        Ok(Approximation::new(operand.value.abs(), p))
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        self.inner.msd(p, cx)
    }
}

/// Cached addition. Operands are evaluated two bits finer than the request;
/// the extra bits absorb each operand's one-ulp error so the rounded sum
/// stays within one ulp at the output scale.
pub struct AddNode {
    left: NodeHandle,
    right: NodeHandle,
    cache: ApproxCache,
}

impl AddNode {
    pub fn new(left: NodeHandle, right: NodeHandle) -> Self {
        Self {
            left,
            right,
            cache: ApproxCache::new(),
        }
    }
}

impl RealNode for AddNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        eval_with_cache(&self.cache, p, cx, || {
            check_precision(p - 2)?;
            let (a, b) = evaluate_pair(&self.left, p - 2, &self.right, p - 2, cx)?;
            let sum = a.value + b.value;
            Ok(Approximation::new(shift_rounded(&sum, -2), p))
        })
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        if let Some(m) = self.cache.cached_msd() {
            return Ok(Some(m));
        }
        search_msd(&|q| self.evaluate(q, cx), p, cx)
    }
}

/// Cached multiplication with MSD budgeting.
///
/// With `|a|` in `(2^(n-1), 2^(n+1))` and `|b|` in `(2^(m-1), 2^(m+1))`,
/// each factor is fetched with four guard bits against the other's
/// magnitude, and the scaled product is rounded once at the end. Operand
/// MSDs are memoized on the node once learned, and identical operand
/// handles (squaring) are evaluated only once.
pub struct MulNode {
    left: NodeHandle,
    right: NodeHandle,
    cache: ApproxCache,
    operand_msd: Mutex<[Option<Prec>; 2]>,
}

impl MulNode {
    pub fn new(left: NodeHandle, right: NodeHandle) -> Self {
        Self {
            left,
            right,
            cache: ApproxCache::new(),
            operand_msd: Mutex::new([None, None]),
        }
    }

    fn operand(&self, index: usize) -> &NodeHandle {
        if index == 0 {
            &self.left
        } else {
            &self.right
        }
    }

    fn operand_msd(
        &self,
        index: usize,
        bound: Prec,
        cx: &EvalSettings,
    ) -> Result<Option<Prec>, EvalError> {
        if let Some(m) = self.operand_msd.lock()[index] {
            return Ok(Some(m));
        }
        let found = self.operand(index).msd(bound, cx)?;
        if let Some(m) = found {
            self.operand_msd.lock()[index] = Some(m);
        }
        Ok(found)
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        let half = p / 2 - 1;
        let (known_index, known_msd) = match self.operand_msd(0, half, cx)? {
            Some(m) => (0, m),
            None => match self.operand_msd(1, half, cx)? {
                Some(m) => (1, m),
                None => return Ok(Approximation::zero(p)),
            },
        };
        let other_index = 1 - known_index;
        let known = self.operand(known_index);
        let other = self.operand(other_index);
        let squaring = Arc::ptr_eq(known, other);

        let other_msd = if squaring {
            known_msd
        } else {
            // Anything below this bound makes the product round to zero.
            match self.operand_msd(other_index, p - known_msd - 4, cx)? {
                Some(m) => m,
                None => return Ok(Approximation::zero(p)),
            }
        };
        if known_msd + other_msd - p < -4 {
            return Ok(Approximation::zero(p));
        }

        let known_p = p - other_msd - 4;
        let other_p = p - known_msd - 4;
        check_precision(known_p)?;
        check_precision(other_p)?;

        let product = if squaring {
            let a = known.evaluate(known_p, cx)?;
            (&a.value) * (&a.value)
        } else {
            let (a, b) = evaluate_pair(known, known_p, other, other_p, cx)?;
            a.value * b.value
        };
        Ok(Approximation::new(
            shift_rounded(&product, known_p + other_p - p),
            p,
        ))
    }
}

impl RealNode for MulNode {
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

/// `base^exponent` for a nonzero integer exponent, lowered on first use to
/// a square-and-multiply chain of multiplications. A negative exponent
/// lowers through the reciprocal of the base.
pub struct IntPowNode {
    base: NodeHandle,
    exponent: i64,
    reduced: Mutex<Option<Real>>,
}

impl IntPowNode {
    pub fn new(base: NodeHandle, exponent: i64) -> Self {
        debug_assert!(exponent != 0);
        Self {
            base,
            exponent,
            reduced: Mutex::new(None),
        }
    }

    fn reduced(&self) -> Real {
        let mut slot = self.reduced.lock();
        if let Some(chain) = slot.as_ref() {
            return chain.clone();
        }
        let base = if self.exponent < 0 {
            Real::from_node(Arc::clone(&self.base)).inverse()
        } else {
            Real::from_node(Arc::clone(&self.base))
        };
        let chain = build_pow_chain(base, self.exponent.unsigned_abs());
        *slot = Some(chain.clone());
        chain
    }
}

/// Square-and-multiply over shared subexpressions; squares are detected by
/// multiplication's identical-handle check, so each level is evaluated once.
fn build_pow_chain(base: Real, exponent: u64) -> Real {
    if exponent == 1 {
        return base;
    }
    let square = base.clone() * base.clone();
    let rest = build_pow_chain(square, exponent / 2);
    if exponent % 2 == 1 {
        base * rest
    } else {
        rest
    }
}

impl RealNode for IntPowNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        self.reduced().node().evaluate(p, cx)
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        self.reduced().node().msd(p, cx)
    }
}
