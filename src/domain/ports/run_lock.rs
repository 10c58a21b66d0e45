use crate::domain::error::DomainError;
use std::sync::Arc;
use tracing::{debug, warn};

/// Exclusive marker preventing overlapping sync runs across processes.
pub trait RunLock: Send + Sync {
    /// Take the marker. `Ok(None)` on success, `Ok(Some(holder))` when
    /// another run already holds it.
    fn try_acquire(&self, holder: &str) -> Result<Option<String>, DomainError>;
    fn release(&self, holder: &str) -> Result<(), DomainError>;
}

/// Held marker. Releases on drop, so every exit path gives it back.
pub struct RunLease {
    lock: Arc<dyn RunLock>,
    holder: String,
}

impl RunLease {
    /// Acquire the marker or fail with `RunInProgress`.
    pub fn acquire(lock: Arc<dyn RunLock>) -> Result<Self, DomainError> {
        let holder = format!("{}:{}", std::process::id(), uuid::Uuid::new_v4());
        match lock.try_acquire(&holder)? {
            None => {
                debug!(holder = %holder, "run marker acquired");
                Ok(Self { lock, holder })
            }
            Some(current) => Err(DomainError::RunInProgress(current)),
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }
}

impl Drop for RunLease {
    fn drop(&mut self) {
        match self.lock.release(&self.holder) {
            Ok(()) => debug!(holder = %self.holder, "run marker released"),
            Err(e) => warn!(holder = %self.holder, "failed to release run marker: {e}"),
        }
    }
}
