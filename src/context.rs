//! Call context carried into every store call: a shared cancellation flag plus an optional deadline.

use crate::errors::StoreError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

/// Clones share cancellation state, so cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// # Errors
    /// `Cancelled` once `cancel` was called, `DeadlineExceeded` past the deadline.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return Err(StoreError::Cancelled);
        }
        if let Some(dl) = self.inner.deadline
            && Instant::now() > dl
        {
            return Err(StoreError::DeadlineExceeded);
        }
        Ok(())
    }
}
