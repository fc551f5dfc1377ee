//! Evaluation settings threaded through every `evaluate` call.
//!
//! The settings record carries the division limit (the precision below
//! which a denominator is treated as zero), the multithreading switch, the
//! cancellation token, and the constants factory that memoizes pi, e and
//! 1/e across evaluations. Those three constants are the only process-wide
//! mutable state in the engine.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::approx::Prec;
use crate::concurrency::CancelToken;
use crate::real::Real;

/// Default precision below which a denominator is deemed zero.
pub const DEFAULT_DIVISION_LIMIT: Prec = -65_536;

/// Memoized shared constants. Built lazily under a mutex on first use and
/// shared by every expression evaluated with the same settings.
#[derive(Default)]
pub struct ConstFactory {
    pi: Mutex<Option<Real>>,
    e: Mutex<Option<Real>>,
    inv_e: Mutex<Option<Real>>,
}

impl ConstFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pi(&self) -> Real {
        self.pi.lock().get_or_insert_with(Real::pi).clone()
    }

    pub fn e(&self) -> Real {
        self.e.lock().get_or_insert_with(Real::e).clone()
    }

    /// 1/e, used by the exponential's argument reduction.
    pub fn inv_e(&self) -> Real {
        self.inv_e
            .lock()
            .get_or_insert_with(|| Real::e().inverse())
            .clone()
    }
}

/// Settings record passed to every evaluation.
#[derive(Clone)]
pub struct EvalSettings {
    division_limit: Prec,
    parallel: bool,
    token: Arc<CancelToken>,
    factory: Arc<ConstFactory>,
}

impl EvalSettings {
    pub fn new() -> Self {
        Self {
            division_limit: DEFAULT_DIVISION_LIMIT,
            parallel: false,
            token: Arc::new(CancelToken::unbounded()),
            factory: Arc::new(ConstFactory::new()),
        }
    }

    pub fn division_limit(&self) -> Prec {
        self.division_limit
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn factory(&self) -> &ConstFactory {
        &self.factory
    }

    /// Replaces the cancellation token, keeping the shared factory. The REPL
    /// installs a fresh token (with the configured deadline) per command.
    pub fn with_token(&self, token: Arc<CancelToken>) -> Self {
        Self {
            token,
            ..self.clone()
        }
    }

    pub fn with_division_limit(&self, division_limit: Prec) -> Self {
        Self {
            division_limit,
            ..self.clone()
        }
    }

    /// Enables or disables parallel evaluation of independent operands.
    pub fn with_parallel(&self, parallel: bool) -> Self {
        Self {
            parallel,
            ..self.clone()
        }
    }
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self::new()
    }
}
