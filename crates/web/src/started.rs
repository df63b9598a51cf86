use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ConfigError;

/// Flips once, when the engine serves its first request. Every mutating call on the engine
/// checks it, so routes can no longer change while lookups run concurrently.
#[derive(Debug, Default)]
pub(crate) struct StartGuard {
    started: AtomicBool,
}

impl StartGuard {
    pub(crate) fn start(&self) {
        if !self.started.load(Ordering::Acquire) {
            self.started.store(true, Ordering::Release);
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub(crate) fn check(&self, operation: &'static str) -> Result<(), ConfigError> {
        if self.is_started() {
            return Err(ConfigError::AlreadyStarted { operation });
        }
        Ok(())
    }
}
