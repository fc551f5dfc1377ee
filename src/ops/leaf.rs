//! Terminal nodes.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::approx::{check_precision, shift_rounded, Approximation, Prec};
use crate::error::EvalError;
use crate::node::RealNode;
use crate::settings::EvalSettings;

/// The zero terminal: evaluates to zero at every precision and has no MSD.
pub struct ZeroNode;

impl RealNode for ZeroNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        Ok(Approximation::zero(p))
    }

    fn msd(&self, _p: Prec, _cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        Ok(None)
    }

    fn as_integer(&self) -> Option<BigInt> {
        Some(BigInt::zero())
    }

    fn is_zero(&self) -> bool {
        true
    }
}

/// An exact nonzero integer literal. The MSD is fixed at construction.
pub struct IntNode {
    value: BigInt,
    msd: Prec,
}

impl IntNode {
    /// `value` must be nonzero; zero goes through [`ZeroNode`].
    pub fn new(value: BigInt) -> Self {
        debug_assert!(!value.is_zero());
        let msd = value.magnitude().bits() as Prec - 1;
        Self { value, msd }
    }
}

impl RealNode for IntNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        Ok(Approximation::new(shift_rounded(&self.value, -p), p))
    }

    fn msd(&self, _p: Prec, _cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        Ok(Some(self.msd))
    }

    fn as_integer(&self) -> Option<BigInt> {
        Some(self.value.clone())
    }
}

/// Sentinel standing for the reciprocal of a value statically known to be
/// zero. Any attempt to evaluate it fails.
pub struct DivisionByZeroNode;

impl RealNode for DivisionByZeroNode {
    fn evaluate(&self, _p: Prec, _cx: &EvalSettings) -> Result<Approximation, EvalError> {
        Err(EvalError::DivideByZero)
    }

    fn msd(&self, _p: Prec, _cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        Err(EvalError::DivideByZero)
    }
}
