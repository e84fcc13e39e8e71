//! Single-run guard

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Admits at most one pipeline run at a time
///
/// The permit is moved into the task executing the run and released when
/// that task ends, whether it finishes, fails or panics.
#[derive(Debug, Clone)]
pub struct RunGuard {
    permit: Arc<Semaphore>,
}

/// Proof that the holder owns the single run slot
#[derive(Debug)]
pub struct RunPermit {
    _permit: OwnedSemaphorePermit,
}

impl Default for RunGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RunGuard {
    pub fn new() -> Self {
        Self {
            permit: Arc::new(Semaphore::new(1)),
        }
    }

    /// Claims the run slot without waiting; `None` when a run is in flight
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.permit
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| RunPermit { _permit: permit })
    }

    pub fn is_busy(&self) -> bool {
        self.permit.available_permits() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_permit_released_when_task_panics() {
        let guard = RunGuard::new();
        let permit = guard.try_acquire().unwrap();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            panic!("run crashed");
        });
        assert!(handle.await.is_err());

        assert!(guard.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_only_one_concurrent_claim_succeeds() {
        let guard = RunGuard::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let guard = guard.clone();
                tokio::spawn(async move { guard.try_acquire() })
            })
            .collect();

        let mut held = Vec::new();
        for handle in handles {
            if let Some(permit) = handle.await.unwrap() {
                held.push(permit);
            }
        }
        assert_eq!(held.len(), 1);
    }
}
