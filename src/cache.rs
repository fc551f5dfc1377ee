//! Monotone per-node approximation cache.
//!
//! Every iterative kernel is wrapped by one of these. The cache holds the
//! finest approximation computed so far; coarser requests are served by
//! rounding the stored value, and a fresh result replaces the stored one
//! only when it is strictly finer. Kernels write the cache only on success,
//! so a cancelled iteration leaves it untouched.

use parking_lot::Mutex;

use crate::approx::{check_precision, Approximation, Prec};
use crate::error::EvalError;
use crate::settings::EvalSettings;

#[derive(Debug, Default)]
pub struct ApproxCache {
    slot: Mutex<Option<Approximation>>,
}

impl ApproxCache {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Serves a request at precision `p` from the cache, or `None` when the
    /// stored entry (if any) is coarser than `p`.
    pub fn lookup(&self, p: Prec) -> Option<Approximation> {
        let slot = self.slot.lock();
        match slot.as_ref() {
            Some(stored) if stored.precision <= p => Some(stored.rounded_to(p)),
            _ => None,
        }
    }

    /// Stores `fresh` unless an entry at the same or finer precision already
    /// exists. Entries are never coarsened.
    pub fn store(&self, fresh: Approximation) {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(stored) if stored.precision <= fresh.precision => {}
            _ => *slot = Some(fresh),
        }
    }

    /// MSD of the cached value, when a clearly nonzero value has been seen.
    /// Once such an approximation is cached its MSD is fixed, so this
    /// answers without re-evaluating.
    pub fn cached_msd(&self) -> Option<Prec> {
        self.slot.lock().as_ref().and_then(Approximation::strong_msd)
    }
}

/// Shared evaluate path for value-caching nodes: consult the cache, fall
/// back to the kernel, store the kernel's native-precision result, and
/// relabel to the requested precision.
///
/// The kernel may return a result finer than `p`; the caller still receives
/// precision exactly `p`.
pub fn eval_with_cache<K>(
    cache: &ApproxCache,
    p: Prec,
    cx: &EvalSettings,
    kernel: K,
) -> Result<Approximation, EvalError>
where
    K: FnOnce() -> Result<Approximation, EvalError>,
{
    check_precision(p)?;
    cx.token().checkpoint()?;
    if let Some(hit) = cache.lookup(p) {
        return Ok(hit);
    }
    let fresh = kernel()?;
    cache.store(fresh.clone());
    Ok(fresh.rounded_to(p))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::settings::EvalSettings;
    use num_bigint::BigInt;

    fn approx(v: i64, p: Prec) -> Approximation {
        Approximation::new(BigInt::from(v), p)
    }

    #[test]
    fn lookup_misses_when_empty() {
        let cache = ApproxCache::new();
        assert_eq!(cache.lookup(0), None);
    }

    #[test]
    fn lookup_rounds_finer_entry_to_request() {
        let cache = ApproxCache::new();
        cache.store(approx(1000, -10));
        let hit = cache.lookup(0).expect("cache should serve coarser request");
        assert_eq!(hit, approx(1, 0));
    }

    #[test]
    fn store_never_coarsens() {
        let cache = ApproxCache::new();
        cache.store(approx(1000, -10));
        cache.store(approx(1, 0));
        // The fine entry must survive.
        assert_eq!(cache.lookup(-10), Some(approx(1000, -10)));
    }

    #[test]
    fn store_improves_on_finer_result() {
        let cache = ApproxCache::new();
        cache.store(approx(1, 0));
        cache.store(approx(1000, -10));
        assert_eq!(cache.lookup(-10), Some(approx(1000, -10)));
    }

    #[test]
    fn cached_msd_requires_nonzero_value() {
        let cache = ApproxCache::new();
        cache.store(Approximation::zero(-10));
        assert_eq!(cache.cached_msd(), None);
        cache.store(approx(8, -12));
        assert_eq!(cache.cached_msd(), Some(-9));
    }

    #[test]
    fn eval_with_cache_skips_kernel_on_hit() {
        let cache = ApproxCache::new();
        cache.store(approx(1000, -10));
        let cx = EvalSettings::default();
        let result = eval_with_cache(&cache, -4, &cx, || {
            panic!("kernel must not run on a cache hit")
        })
        .expect("cached evaluate should succeed");
        assert_eq!(result.precision, -4);
    }

    #[test]
    fn eval_with_cache_relabels_kernel_result() {
        let cache = ApproxCache::new();
        let cx = EvalSettings::default();
        let result = eval_with_cache(&cache, 0, &cx, || Ok(approx(1000, -10)))
            .expect("evaluate should succeed");
        assert_eq!(result, approx(1, 0));
        // Native precision was stored.
        assert_eq!(cache.lookup(-10), Some(approx(1000, -10)));
    }
}
