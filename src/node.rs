//! The computable-real node contract and shared evaluation machinery.
//!
//! Every node in the expression DAG answers two questions for a signed
//! binary precision `p`:
//!
//! - `evaluate(p)` returns an [`Approximation`] whose `precision` field is
//!   exactly `p` and whose value is the rounded scaled integer.
//! - `msd(p)` locates the most significant bit, or reports `None` when the
//!   magnitude cannot be shown to exceed `2^p`.
//!
//! Nodes are immutable after construction; per-node caches are the only
//! mutable state. The structural hooks (`as_shift`, `as_negate`, ...) let
//! the [`Real`](crate::real::Real) constructors apply the trivial algebraic
//! shortcuts without downcasting.

use std::sync::Arc;

use num_bigint::BigInt;

use crate::approx::{Approximation, Prec};
use crate::error::EvalError;
use crate::settings::EvalSettings;

/// Shared handle to a node in the expression DAG.
pub type NodeHandle = Arc<dyn RealNode>;

/// A computable real: a procedure yielding rounded approximations at any
/// requested precision.
pub trait RealNode: Send + Sync {
    /// Returns `round(x * 2^-p)` scaled at precision `p`.
    ///
    /// Implementations check the cancellation token on entry and verify
    /// that `p` lies in the safe precision range.
    fn evaluate(&self, p: Prec, cx: &EvalSettings) -> Result<Approximation, EvalError>;

    /// Most-significant-bit search down to `p`. The default runs the
    /// generic probing schedule; leaves and caching nodes override it.
    fn msd(&self, p: Prec, cx: &EvalSettings) -> Result<Option<Prec>, EvalError> {
        search_msd(&|q| self.evaluate(q, cx), p, cx)
    }

    /// Structural hook: `Some((inner, n))` when this node is `inner * 2^n`.
    fn as_shift(&self) -> Option<(NodeHandle, Prec)> {
        None
    }

    /// Structural hook: `Some(inner)` when this node is `-inner`.
    fn as_negate(&self) -> Option<NodeHandle> {
        None
    }

    /// Structural hook: `Some(inner)` when this node is `1/inner`.
    fn as_inverse(&self) -> Option<NodeHandle> {
        None
    }

    /// Structural hook: the exact integer this node stands for, if any.
    fn as_integer(&self) -> Option<BigInt> {
        None
    }

    /// Whether this node is the zero terminal.
    fn is_zero(&self) -> bool {
        false
    }
}

/// Initial probe for the MSD search; halved until it reaches 64, after
/// which the schedule walks downward from zero.
const MSD_INITIAL_PROBE: Prec = 1 << 16;

/// Generic MSD search: evaluate along a decreasing schedule of precisions
/// until a clearly nonzero value appears or the requested bound is reached.
///
/// The schedule halves from the initial guess down to 64, then moves from
/// zero downward with a 1.3 multiplicative factor and a -16 step, so the
/// cost of discovering a tiny magnitude grows geometrically rather than
/// linearly. Cancellation is polled on every probe.
pub(crate) fn search_msd<F>(
    eval: &F,
    bound: Prec,
    cx: &EvalSettings,
) -> Result<Option<Prec>, EvalError>
where
    F: Fn(Prec) -> Result<Approximation, EvalError>,
{
    let mut probe = MSD_INITIAL_PROBE;
    loop {
        cx.token().checkpoint()?;
        let probe_at = probe.max(bound);
        let approximation = eval(probe_at)?;
        if let Some(msd) = approximation.strong_msd() {
            return Ok(Some(msd));
        }
        if probe_at <= bound {
            return Ok(None);
        }
        probe = next_probe(probe);
    }
}

fn next_probe(probe: Prec) -> Prec {
    if probe > 64 {
        probe / 2
    } else if probe > 0 {
        0
    } else {
        probe * 13 / 10 - 16
    }
}

/// Evaluates two operands, concurrently when the settings allow it and in
/// deterministic left-then-right order otherwise. Failures from a parallel
/// pair are flattened with arithmetic failures preferred over cancellation.
pub(crate) fn evaluate_pair(
    left: &NodeHandle,
    left_p: Prec,
    right: &NodeHandle,
    right_p: Prec,
    cx: &EvalSettings,
) -> Result<(Approximation, Approximation), EvalError> {
    if cx.parallel() {
        std::thread::scope(|scope| {
            let left_task = scope.spawn(|| left.evaluate(left_p, cx));
            let right_result = right.evaluate(right_p, cx);
            let left_result = left_task
                .join()
                .map_err(|_| EvalError::Internal("operand evaluation panicked"))?;
            match (left_result, right_result) {
                (Ok(a), Ok(b)) => Ok((a, b)),
                (Err(a), Err(b)) => Err(flatten_errors(a, b)),
                (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            }
        })
    } else {
        Ok((left.evaluate(left_p, cx)?, right.evaluate(right_p, cx)?))
    }
}

fn flatten_errors(left: EvalError, right: EvalError) -> EvalError {
    if left == EvalError::Cancelled {
        right
    } else {
        left
    }
}
