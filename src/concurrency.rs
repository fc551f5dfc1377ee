//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::EvalError;

/// How often tight kernel loops must poll the token, in iterations.
pub const POLL_INTERVAL: usize = 16;

/// Monotonic cancellation token: it can only transition from running to
/// cancelled, either by an explicit [`stop`](CancelToken::stop) or by an
/// optional wall-clock deadline elapsing.
///
/// Uses Release/Acquire ordering so writes made before stopping are visible
/// to loops that observe the stop.
#[derive(Debug)]
pub struct CancelToken {
    stopped: AtomicBool,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that never trips on its own.
    pub fn unbounded() -> Self {
        Self {
            stopped: AtomicBool::new(false),
            deadline: None,
        }
    }

    /// A token that trips once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            stopped: AtomicBool::new(false),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return true;
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Fails with [`EvalError::Cancelled`] once the token has tripped.
    /// Every `evaluate` entry point and every iterative kernel calls this.
    pub fn checkpoint(&self) -> Result<(), EvalError> {
        if self.is_cancelled() {
            Err(EvalError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn unbounded_token_never_trips_by_itself() {
        let token = CancelToken::unbounded();
        assert!(!token.is_cancelled());
        assert!(token.checkpoint().is_ok());
    }

    #[test]
    fn stop_is_permanent() {
        let token = CancelToken::unbounded();
        token.stop();
        assert!(token.is_cancelled());
        assert_eq!(token.checkpoint(), Err(EvalError::Cancelled));
    }

    #[test]
    fn deadline_trips_after_elapsing() {
        let token = CancelToken::with_timeout(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(token.checkpoint(), Err(EvalError::Cancelled));
    }
}
