use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::context::Context;

/// Recycles request contexts so the hot path does not allocate them per request.
///
/// The pool never blocks: an empty pool hands out a fresh context.
#[derive(Debug, Default)]
pub(crate) struct ContextPool {
    idle: SegQueue<Box<Context>>,
    params_capacity: AtomicUsize,
}

impl ContextPool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sizes the param buffers of contexts created from now on.
    pub(crate) fn set_params_capacity(&self, capacity: usize) {
        self.params_capacity.store(capacity, Ordering::Relaxed);
    }

    pub(crate) fn acquire(&self) -> Box<Context> {
        self.idle.pop().unwrap_or_else(|| {
            let mut ctx = Box::new(Context::new());
            ctx.reserve_params(self.params_capacity.load(Ordering::Relaxed));
            ctx
        })
    }

    pub(crate) fn release(&self, mut ctx: Box<Context>) {
        ctx.release();
        self.idle.push(ctx);
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.idle.len()
    }
}

#[cfg(test)]
mod tests {
    use super::ContextPool;

    #[test]
    fn test_acquire_reuses_released() {
        let pool = ContextPool::new();
        pool.set_params_capacity(4);

        let first = pool.acquire();
        let second = pool.acquire();
        assert_eq!(pool.idle(), 0);

        let addr = std::ptr::from_ref(&*first);
        pool.release(first);
        pool.release(second);
        assert_eq!(pool.idle(), 2);

        let again = pool.acquire();
        assert_eq!(std::ptr::from_ref(&*again), addr);
        assert!(again.params().is_empty());
        assert!(!again.is_aborted());
    }
}
