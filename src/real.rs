//! The public computable-real handle.
//!
//! A [`Real`] wraps a shared node in the lazy evaluation DAG. Constructing
//! one never computes anything: the graph stores construction-time
//! metadata only, and each node approximates itself on demand. Construction
//! applies the trivial algebraic identities (shift composition, folding
//! negation into integer literals, `x + (-x) = 0`, zero-absorbing
//! multiplication, collapsing double reciprocals) so the graph the parser
//! builds stays small.

use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::Zero;

use crate::approx::{check_precision, Approximation, Prec};
use crate::error::EvalError;
use crate::node::NodeHandle;
use crate::ops::{
    AbsNode, AcosNode, AddNode, AsinNode, AtanNode, CosNode, DivisionByZeroNode, ENode, ExpNode,
    IntNode, IntPowNode, InvNode, LnNode, MulNode, NegNode, PiNode, ShiftNode, SinNode, SqrtNode,
    TanNode, ZeroNode,
};
use crate::render;
use crate::settings::EvalSettings;

/// A computable real number backed by a shared evaluation graph.
#[derive(Clone)]
pub struct Real {
    node: NodeHandle,
}

impl Real {
    pub(crate) fn from_node(node: NodeHandle) -> Self {
        Self { node }
    }

    pub(crate) fn node(&self) -> &NodeHandle {
        &self.node
    }

    /// Whether two handles share the same underlying node.
    pub fn same_node(&self, other: &Real) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub fn zero() -> Self {
        Self::from_node(Arc::new(ZeroNode))
    }

    pub fn integer(value: BigInt) -> Self {
        if value.is_zero() {
            Self::zero()
        } else {
            Self::from_node(Arc::new(IntNode::new(value)))
        }
    }

    pub fn from_i64(value: i64) -> Self {
        Self::integer(BigInt::from(value))
    }

    /// `value * 2^scale`.
    pub(crate) fn from_scaled(value: BigInt, scale: Prec) -> Self {
        Self::integer(value).shift(scale)
    }

    /// The sentinel that fails every evaluation with `DivideByZero`.
    pub fn division_by_zero() -> Self {
        Self::from_node(Arc::new(DivisionByZeroNode))
    }

    pub fn pi() -> Self {
        Self::from_node(Arc::new(PiNode::new()))
    }

    pub fn e() -> Self {
        Self::from_node(Arc::new(ENode::new()))
    }

    /// `self * 2^amount`. Shifts compose; shifting by zero is the identity.
    pub fn shift(self, amount: Prec) -> Self {
        if amount == 0 || self.node.is_zero() {
            return self;
        }
        if let Some((inner, existing)) = self.node.as_shift() {
            return Self::from_node(Arc::new(ShiftNode::new(inner, existing + amount)));
        }
        Self::from_node(Arc::new(ShiftNode::new(self.node, amount)))
    }

    pub fn abs(self) -> Self {
        Self::from_node(Arc::new(AbsNode::new(self.node)))
    }

    /// `1/self`. A double reciprocal collapses to the original operand and
    /// the reciprocal of the zero terminal is the division-by-zero sentinel.
    pub fn inverse(self) -> Self {
        if let Some(inner) = self.node.as_inverse() {
            return Self::from_node(inner);
        }
        if self.node.is_zero() {
            return Self::division_by_zero();
        }
        Self::from_node(Arc::new(InvNode::new(self.node)))
    }

    pub fn sqrt(self) -> Self {
        Self::from_node(Arc::new(SqrtNode::new(self.node)))
    }

    pub fn exp(self) -> Self {
        Self::from_node(Arc::new(ExpNode::new(self.node)))
    }

    pub fn ln(self) -> Self {
        Self::from_node(Arc::new(LnNode::new(self.node)))
    }

    pub fn sin(self) -> Self {
        Self::from_node(Arc::new(SinNode::new(self.node)))
    }

    pub fn cos(self) -> Self {
        Self::from_node(Arc::new(CosNode::new(self.node)))
    }

    pub fn tan(self) -> Self {
        Self::from_node(Arc::new(TanNode::new(self.node)))
    }

    pub fn asin(self) -> Self {
        Self::from_node(Arc::new(AsinNode::new(self.node)))
    }

    pub fn acos(self) -> Self {
        Self::from_node(Arc::new(AcosNode::new(self.node)))
    }

    pub fn atan(self) -> Self {
        Self::from_node(Arc::new(AtanNode::new(self.node)))
    }

    /// `self^exponent` for integer exponents, lowered to square-and-multiply
    /// on first evaluation.
    pub fn pow_int(self, exponent: i64) -> Self {
        match exponent {
            0 => Self::from_i64(1),
            1 => self,
            _ => Self::from_node(Arc::new(IntPowNode::new(self.node, exponent))),
        }
    }

    /// `self^exponent = exp(exponent * ln(self))`.
    pub fn pow(self, exponent: Real) -> Self {
        (exponent * self.ln()).exp()
    }

    /// Evaluates to the requested binary precision.
    pub fn approximate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        self.node.evaluate(p, cx)
    }

    /// Most-significant-bit search down to precision `p`.
    pub fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        self.node.msd(p, cx)
    }

    /// Sign of the approximation at probe precision `p`.
    pub fn signum(&self, p: Prec, cx: &EvalSettings) -> Result<i8, EvalError> {
        Ok(self.approximate(p, cx)?.signum())
    }

    /// Renders `digits` decimal fraction digits.
    pub fn to_decimal(&self, digits: u32, cx: &EvalSettings) -> Result<String, EvalError> {
        render::to_decimal(self, digits, cx)
    }

    /// Renders `digits` hexadecimal fraction digits.
    pub fn to_hex(&self, digits: u32, cx: &EvalSettings) -> Result<String, EvalError> {
        render::to_hex(self, digits, cx)
    }
}

impl From<BigInt> for Real {
    fn from(value: BigInt) -> Self {
        Real::integer(value)
    }
}

impl From<i64> for Real {
    fn from(value: i64) -> Self {
        Real::from_i64(value)
    }
}

impl std::ops::Neg for Real {
    type Output = Self;

    fn neg(self) -> Self::Output {
        if self.node.is_zero() {
            return self;
        }
        if let Some(value) = self.node.as_integer() {
            return Self::integer(-value);
        }
        if let Some(inner) = self.node.as_negate() {
            return Self::from_node(inner);
        }
        Self::from_node(Arc::new(NegNode::new(self.node)))
    }
}

impl std::ops::Add for Real {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        if self.node.is_zero() {
            return rhs;
        }
        if rhs.node.is_zero() {
            return self;
        }
        // x + (-x) and (-x) + x collapse to zero.
        let cancels = match rhs.node.as_negate() {
            Some(inner) => Arc::ptr_eq(&inner, &self.node),
            None => false,
        } || match self.node.as_negate() {
            Some(inner) => Arc::ptr_eq(&inner, &rhs.node),
            None => false,
        };
        if cancels {
            return Self::zero();
        }
        Self::from_node(Arc::new(AddNode::new(self.node, rhs.node)))
    }
}

impl std::ops::Sub for Real {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl std::ops::Mul for Real {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        if self.node.is_zero() {
            return self;
        }
        if rhs.node.is_zero() {
            return rhs;
        }
        Self::from_node(Arc::new(MulNode::new(self.node, rhs.node)))
    }
}

#[allow(clippy::suspicious_arithmetic_impl)]
impl std::ops::Div for Real {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        self * rhs.inverse()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::test_utils::{eval_int, int, settings};

    #[test]
    fn integer_zero_is_the_zero_terminal() {
        let zero = Real::integer(BigInt::zero());
        assert!(zero.node().is_zero());
    }

    #[test]
    fn shift_by_zero_is_identity() {
        let x = int(5);
        let same = x.clone().shift(0);
        assert!(same.same_node(&x));
    }

    #[test]
    fn shifts_compose_into_one_node() {
        let x = int(5).shift(3).shift(-1);
        let (inner, amount) = x.node().as_shift().expect("composed shift");
        assert_eq!(amount, 2);
        assert!(inner.as_integer().is_some());
    }

    #[test]
    fn negating_an_integer_folds_the_literal() {
        let x = -int(5);
        assert_eq!(x.node().as_integer(), Some(BigInt::from(-5)));
    }

    #[test]
    fn double_negation_collapses() {
        let cx = settings();
        let x = int(3).sqrt();
        let back = -(-x.clone());
        assert!(back.same_node(&x));
        let a = back.approximate(-4, &cx).expect("evaluate");
        assert!(a.value > BigInt::zero());
    }

    #[test]
    fn adding_additive_inverse_collapses_to_zero() {
        let x = int(7).sqrt();
        let sum = x.clone() + (-x);
        assert!(sum.node().is_zero());
    }

    #[test]
    fn multiplying_by_zero_absorbs() {
        let product = Real::zero() * int(41).sqrt();
        assert!(product.node().is_zero());
        let product = int(41).sqrt() * Real::zero();
        assert!(product.node().is_zero());
    }

    #[test]
    fn inverse_of_zero_is_the_sentinel() {
        let cx = settings();
        let bad = Real::zero().inverse();
        assert_eq!(bad.approximate(0, &cx), Err(EvalError::DivideByZero));
    }

    #[test]
    fn subtraction_goes_through_negation() {
        let cx = settings();
        assert_eq!(eval_int(&(int(10) - int(4)), &cx), BigInt::from(6));
    }

    #[test]
    fn division_goes_through_reciprocal() {
        let cx = settings();
        let half = int(1) / int(2);
        let a = half.approximate(-4, &cx).expect("evaluate");
        assert_eq!(a.value, BigInt::from(8));
    }

    #[test]
    fn pow_with_real_exponent_matches_integer_power() {
        let cx = settings();
        let via_pow = int(2).pow(Real::from_i64(10));
        let a = via_pow.approximate(-8, &cx).expect("evaluate");
        assert_eq!(a.rounded_to(0).value, BigInt::from(1024));
    }

    #[test]
    fn signum_probes_the_sign() {
        let cx = settings();
        assert_eq!(int(-3).signum(-4, &cx).expect("signum"), -1);
        assert_eq!(int(3).signum(-4, &cx).expect("signum"), 1);
        assert_eq!(Real::zero().signum(-4, &cx).expect("signum"), 0);
    }
}
