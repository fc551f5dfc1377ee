//! Trigonometric operations.
//!
//! `sin`, `atan` and `asin` carry their own reduction + kernel pairs; `cos`,
//! `tan` and `acos` are derived algebraically on first use:
//!
//! - `cos(a) = sin(pi/2 + (-a))`
//! - `tan(a) = sin(a) / sqrt(1 - sin(a)^2)`
//! - `acos(a) = pi/2 - asin(a)`

use std::sync::Arc;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};
use parking_lot::Mutex;

use crate::approx::{check_precision, shift_no_round, shift_rounded, Approximation, Prec};
use crate::cache::{eval_with_cache, ApproxCache};
use crate::concurrency::POLL_INTERVAL;
use crate::error::EvalError;
use crate::node::{search_msd, NodeHandle, RealNode};
use crate::real::Real;
use crate::settings::EvalSettings;

/// `sin(inner)` with lazy argument reduction.
///
/// Arguments with magnitude past ~3 shed whole multiples of pi (flipping
/// sign for odd multiples); magnitudes between ~0.5 and 3 go through the
/// triple-angle identity `sin(3x) = 3 sin(x) - 4 sin(x)^3` on a third of
/// the argument. What remains feeds the Taylor kernel directly.
pub struct SinNode {
    inner: NodeHandle,
    cache: ApproxCache,
    reduced: Mutex<Option<Real>>,
}

impl SinNode {
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
        let probe = self.inner.evaluate(-3, cx)?;
        let arg = Real::from_node(Arc::clone(&self.inner));
        let magnitude = probe.value.abs();
        if magnitude >= BigInt::from(24) {
            // Shed floor(a / 3) multiples of pi; 3 underestimates pi, so the
            // remainder shrinks geometrically across recursive reductions.
            let n = probe.value.div_floor(&BigInt::from(24));
            let flip = n.is_odd();
            let shed = (arg - Real::integer(n) * cx.factory().pi()).sin();
            return Ok(if flip { -shed } else { shed });
        }
        if magnitude >= BigInt::from(4) {
            let third = arg * Real::from_i64(3).inverse();
            let s = third.sin();
            let cubed = s.clone() * s.clone() * s.clone();
            return Ok(s * Real::from_i64(3) - cubed.shift(2));
        }
        Ok(Real::from_node(Arc::new(SinKernelNode::new(Arc::clone(
            &self.inner,
        )))))
    }
}

impl RealNode for SinNode {
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

/// Taylor kernel for `sin` on a reduced argument.
pub(crate) struct SinKernelNode {
    inner: NodeHandle,
    cache: ApproxCache,
}

impl SinKernelNode {
    pub(crate) fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            cache: ApproxCache::new(),
        }
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        let q = (2 * p).min(-64);
        check_precision(q)?;
        let x = self.inner.evaluate(q, cx)?.value;
        let x_squared = shift_no_round(&(&x * &x), q);
        let mut term = x.clone();
        let mut sum = x;
        let mut k: u64 = 1;
        loop {
            if k as usize % POLL_INTERVAL == 0 {
                cx.token().checkpoint()?;
            }
            term = shift_no_round(&(&term * &x_squared), q);
            term = -term / BigInt::from(2 * k * (2 * k + 1));
            if term.is_zero() {
                break;
            }
            sum += &term;
            k += 1;
        }
        Ok(Approximation::new(shift_rounded(&sum, q - p), p))
    }
}

impl RealNode for SinKernelNode {
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

/// `atan(inner)` with half-angle reduction for arguments past ~1/2.
pub struct AtanNode {
    inner: NodeHandle,
    cache: ApproxCache,
    reduced: Mutex<Option<Real>>,
}

impl AtanNode {
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
        let arg = Real::from_node(Arc::clone(&self.inner));
        let r = match self.inner.msd(-2, cx)? {
            Some(m) if m >= -1 => {
                // atan(x) = 2 atan(x / (1 + sqrt(1 + x^2)))
                let denominator =
                    Real::from_i64(1) + (Real::from_i64(1) + arg.clone() * arg.clone()).sqrt();
                (arg * denominator.inverse()).atan().shift(1)
            }
            _ => Real::from_node(Arc::new(AtanKernelNode::new(Arc::clone(&self.inner)))),
        };
        *slot = Some(r.clone());
        Ok(r)
    }
}

impl RealNode for AtanNode {
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

/// Taylor kernel for `atan` on an argument below ~1/2.
pub(crate) struct AtanKernelNode {
    inner: NodeHandle,
    cache: ApproxCache,
}

impl AtanKernelNode {
    pub(crate) fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            cache: ApproxCache::new(),
        }
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        let q = (p - 16).min(-16);
        check_precision(q)?;
        let x = self.inner.evaluate(q, cx)?.value;
        let x_squared = shift_no_round(&(&x * &x), q);
        let mut power = x.clone();
        let mut sum = x;
        let mut k: u64 = 1;
        loop {
            if k as usize % POLL_INTERVAL == 0 {
                cx.token().checkpoint()?;
            }
            power = -shift_no_round(&(&power * &x_squared), q);
            if power.is_zero() {
                break;
            }
            sum += &power / &BigInt::from(2 * k + 1);
            k += 1;
        }
        Ok(Approximation::new(shift_rounded(&sum, q - p), p))
    }
}

impl RealNode for AtanKernelNode {
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

/// `asin(inner)` with a magnitude check and half-angle style reduction.
pub struct AsinNode {
    inner: NodeHandle,
    cache: ApproxCache,
    reduced: Mutex<Option<Real>>,
}

impl AsinNode {
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
        let probe = self.inner.evaluate(-5, cx)?;
        if probe.value.abs() > BigInt::from(32) {
            return Err(EvalError::AsinOutOfRange);
        }
        let arg = Real::from_node(Arc::clone(&self.inner));
        let r = match probe.msd() {
            Some(m) if m > -1 => {
                // asin(x) = 2 asin(x / sqrt(2 + 2 sqrt(1 - x^2)))
                let root = (Real::from_i64(1) - arg.clone() * arg.clone()).sqrt();
                let denominator = (Real::from_i64(2) + root.shift(1)).sqrt();
                (arg * denominator.inverse()).asin().shift(1)
            }
            _ => Real::from_node(Arc::new(AsinKernelNode::new(Arc::clone(&self.inner)))),
        };
        *slot = Some(r.clone());
        Ok(r)
    }
}

impl RealNode for AsinNode {
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

/// Newton kernel for `asin`: `z <- z - (sin(z) - a) / cos(z)` with
/// `cos(z) = sqrt(1 - sin(z)^2)`, seeded from a double-precision arcsine.
pub(crate) struct AsinKernelNode {
    inner: NodeHandle,
    cache: ApproxCache,
}

impl AsinKernelNode {
    pub(crate) fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            cache: ApproxCache::new(),
        }
    }

    fn kernel(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p - 6)?;
        let seed_input = self.inner.evaluate(-50, cx)?;
        let seed_value = seed_input.to_f64().clamp(-1.0, 1.0);
        let mut z = BigInt::from((seed_value.asin() * 2f64.powi(40)) as i64);
        let mut scale: Prec = -40;
        let mut accuracy: Prec = 36;

        let arg = Real::from_node(Arc::clone(&self.inner));
        while accuracy < -p + 8 {
            cx.token().checkpoint()?;
            let next_accuracy = (accuracy * 2 - 8).min(-p + 16);
            let next_scale = -next_accuracy - 4;
            check_precision(next_scale)?;

            let iterate = Real::from_scaled(z.clone(), scale);
            let sine = iterate.sin();
            let cosine = (Real::from_i64(1) - sine.clone() * sine.clone()).sqrt();
            let correction =
                ((sine - arg.clone()) * cosine.inverse()).approximate(next_scale, cx)?;

            let aligned = shift_no_round(&z, scale - next_scale);
            z = aligned - correction.value;
            scale = next_scale;
            accuracy = next_accuracy;
        }
        Ok(Approximation::new(shift_rounded(&z, scale - (p - 6)), p - 6))
    }
}

impl RealNode for AsinKernelNode {
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

/// Derived node built lazily from a closure: used by cos, tan and acos,
/// whose derivations need the constants factory only available at
/// evaluation time.
struct DerivedState {
    derived: Mutex<Option<Real>>,
}

impl DerivedState {
    fn new() -> Self {
        Self {
            derived: Mutex::new(None),
        }
    }

    fn get<F>(&self, build: F) -> Real
    where
        F: FnOnce() -> Real,
    {
        let mut slot = self.derived.lock();
        if let Some(r) = slot.as_ref() {
            return r.clone();
        }
        let r = build();
        *slot = Some(r.clone());
        r
    }
}

/// `cos(a) = sin(pi/2 + (-a))`.
pub struct CosNode {
    inner: NodeHandle,
    state: DerivedState,
}

impl CosNode {
    pub fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            state: DerivedState::new(),
        }
    }

    fn derived(&self, cx: &EvalSettings) -> Real {
        self.state.get(|| {
            let arg = Real::from_node(Arc::clone(&self.inner));
            (cx.factory().pi().shift(-1) + (-arg)).sin()
        })
    }
}

impl RealNode for CosNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        self.derived(cx).node().evaluate(p, cx)
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        self.derived(cx).node().msd(p, cx)
    }
}

/// `tan(a) = sin(a) / sqrt(1 - sin(a)^2)`.
pub struct TanNode {
    inner: NodeHandle,
    state: DerivedState,
}

impl TanNode {
    pub fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            state: DerivedState::new(),
        }
    }

    fn derived(&self) -> Real {
        self.state.get(|| {
            let sine = Real::from_node(Arc::clone(&self.inner)).sin();
            let cosine = (Real::from_i64(1) - sine.clone() * sine.clone()).sqrt();
            sine * cosine.inverse()
        })
    }
}

impl RealNode for TanNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        self.derived().node().evaluate(p, cx)
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        self.derived().node().msd(p, cx)
    }
}

/// `acos(a) = pi/2 - asin(a)`.
pub struct AcosNode {
    inner: NodeHandle,
    state: DerivedState,
}

impl AcosNode {
    pub fn new(inner: NodeHandle) -> Self {
        Self {
            inner,
            state: DerivedState::new(),
        }
    }

    fn derived(&self, cx: &EvalSettings) -> Real {
        self.state.get(|| {
            let arg = Real::from_node(Arc::clone(&self.inner));
            cx.factory().pi().shift(-1) - arg.asin()
        })
    }
}

impl RealNode for AcosNode {
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError> {
        check_precision(p)?;
        cx.token().checkpoint()?;
        self.derived(cx).node().evaluate(p, cx)
    }

    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        self.derived(cx).node().msd(p, cx)
    }
}
