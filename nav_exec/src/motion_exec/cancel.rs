//! Run cancellation token

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Flag shared between the intake and a single run.
///
/// Set by the intake to preempt the run, observed and cleared by the run once per tick.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run to stop at its next tick.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Return whether cancellation was requested, clearing the request.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_take_clears() {
        let token = CancelToken::new();
        let intake = token.clone();

        assert!(!token.take());

        intake.cancel();
        assert!(token.is_cancelled());
        assert!(token.take());
        assert!(!token.take());
        assert!(!intake.is_cancelled());
    }
}
