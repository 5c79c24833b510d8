//! Cooperative cancellation.

use crate::error::{AnalysisError, Result, Stage};
#[cfg(test)]
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag shared between the caller and a running analysis.
///
/// Clones observe the same flag. The analysis polls it between extraction
/// tasks and before every aggregate stage.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    #[cfg(test)]
    tripwire: Option<Arc<Tripwire>>,
}

/// Cancels the token on the n-th check of one stage
#[cfg(test)]
#[derive(Debug)]
struct Tripwire {
    stage: Stage,
    remaining: AtomicUsize,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// A token that cancels itself on check number `checks` of `stage`
    #[cfg(test)]
    pub(crate) fn trip_at(stage: Stage, checks: usize) -> Self {
        Self {
            tripwire: Some(Arc::new(Tripwire {
                stage,
                remaining: AtomicUsize::new(checks),
            })),
            ..Self::default()
        }
    }

    #[cfg(test)]
    fn poll_tripwire(&self, stage: Stage) {
        if let Some(tripwire) = self.tripwire.as_deref().filter(|t| t.stage == stage) {
            if tripwire.remaining.fetch_sub(1, Ordering::Relaxed) == 1 {
                self.cancel();
            }
        }
    }

    /// Fail with `Cancelled { stage }` once cancellation was requested
    pub(crate) fn check(&self, stage: Stage) -> Result<()> {
        #[cfg(test)]
        self.poll_tripwire(stage);

        if self.is_cancelled() {
            log::debug!("Analysis cancelled before {stage}");
            return Err(AnalysisError::Cancelled { stage });
        }
        Ok(())
    }
}
