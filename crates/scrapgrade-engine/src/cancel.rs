//! Cooperative cancellation for long grading runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::GradeError;

/// Shared flag a caller can set to stop a run between stages.
///
/// Clones share the same flag. The pipeline polls it once before each
/// stage; a stage already in progress runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// `Err(GradeError::Cancelled)` once cancellation has been requested.
    ///
    /// # Errors
    ///
    /// Returns [`GradeError::Cancelled`] if [`cancel`](Self::cancel) was
    /// called on this token or any clone of it.
    pub fn check(&self) -> Result<(), GradeError> {
        if self.is_cancelled() {
            Err(GradeError::Cancelled)
        } else {
            Ok(())
        }
    }
}
