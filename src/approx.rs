//! Scaled-integer approximations of real numbers.
//!
//! An [`Approximation`] pairs a `BigInt` with a binary scale so that the
//! represented real `x` satisfies `|x - value * 2^precision| < 2^precision`.
//! More negative precisions mean more fractional bits. All evaluation in the
//! engine bottoms out in the two shift primitives defined here:
//! [`shift_no_round`] (plain arithmetic shift) and [`shift_rounded`] (shift
//! with a bias added before the final halving, so results round half-up for
//! both signs).

use std::fmt;

use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, Zero};

use crate::error::EvalError;

/// Binary precision (scale exponent) of an approximation.
pub type Prec = i64;

/// Largest magnitude a precision may take. Chosen so that `8 * precision`
/// stays well inside `i64` and every precision expression in the kernels is
/// overflow-free.
pub const MAX_PRECISION: Prec = 1 << 28;

/// Most negative allowed precision.
pub const MIN_PRECISION: Prec = -(1 << 28);

/// Rejects precisions outside the safe range.
pub fn check_precision(p: Prec) -> Result<(), EvalError> {
    if (MIN_PRECISION..=MAX_PRECISION).contains(&p) {
        Ok(())
    } else {
        Err(EvalError::PrecisionOverflow)
    }
}

/// Arithmetic shift: left for `n >= 0`, right (floor) for `n < 0`.
pub fn shift_no_round(value: &BigInt, n: Prec) -> BigInt {
    if n >= 0 {
        value << (n as usize)
    } else {
        value >> ((-n) as usize)
    }
}

/// Shift with rounding on right shifts.
///
/// For `n >= 0` this is a plain left shift. For `n < 0` the low bit just
/// below the cut is folded in as a bias before the final halving, which
/// rounds halves upward for positive and negative values alike.
pub fn shift_rounded(value: &BigInt, n: Prec) -> BigInt {
    if n >= 0 {
        value << (n as usize)
    } else if n == -1 {
        (value + BigInt::one()) >> 1
    } else {
        ((value >> ((-(n + 1)) as usize)) + BigInt::one()) >> 1
    }
}

/// An integer scaled by a power of two: the real it stands for lies within
/// one unit in the last place of `value * 2^precision`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Approximation {
    pub value: BigInt,
    pub precision: Prec,
}

impl Approximation {
    pub fn new(value: BigInt, precision: Prec) -> Self {
        Self { value, precision }
    }

    /// Zero at the given precision.
    pub fn zero(precision: Prec) -> Self {
        Self {
            value: BigInt::zero(),
            precision,
        }
    }

    /// Re-expresses this approximation at a coarser (or equal) precision,
    /// rounding away the dropped bits.
    pub fn rounded_to(&self, precision: Prec) -> Self {
        if precision == self.precision {
            return self.clone();
        }
        Self {
            value: shift_rounded(&self.value, self.precision - precision),
            precision,
        }
    }

    /// Position of the most significant bit: an `n` with
    /// `2^(n-1) < |x| < 2^(n+1)`, or `None` when the value is zero and the
    /// magnitude cannot be bounded away from zero at this precision.
    ///
    /// Negative values use the two's-complement bit length (the boundary sits
    /// one below at exact powers of two, and at -1 the length is zero), so a
    /// just-past-power-of-two negative reports the lower position.
    pub fn msd(&self) -> Option<Prec> {
        match self.value.sign() {
            Sign::NoSign => None,
            Sign::Plus => Some(self.precision + self.value.bits() as Prec - 1),
            Sign::Minus => {
                let bits = (self.value.magnitude() - 1u32).bits();
                Some(self.precision + bits as Prec - 1)
            }
        }
    }

    /// Like [`msd`](Self::msd), but only when the value's magnitude is at
    /// least 2. A value of +/-1 leaves the true magnitude too close to the
    /// rounding boundary for the MSD bracket to be trusted, so probes keep
    /// searching at finer precision instead.
    pub fn strong_msd(&self) -> Option<Prec> {
        if self.value.magnitude().bits() >= 2 {
            self.msd()
        } else {
            None
        }
    }

    /// Sign of the approximation: -1, 0 or 1.
    pub fn signum(&self) -> i8 {
        match self.value.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    /// The approximation as an `f64`, best effort. Values whose scaled
    /// magnitude exceeds the `f64` range saturate to infinity.
    pub fn to_f64(&self) -> f64 {
        use num_traits::ToPrimitive;
        let v = self.value.to_f64().unwrap_or(f64::INFINITY);
        v * 2f64.powi(self.precision.clamp(-1_000_000, 1_000_000) as i32)
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }
}

impl fmt::Display for Approximation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} * 2^{}", self.value, self.precision)
    }
}
