//! Thread-scoped "current context" stack.
//!
//! Each thread keeps its own stack, so two execution flows run their own
//! contexts without interference. Activation is guard-based: the previous
//! context is restored on every exit path, including panics, in strict
//! LIFO order.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use super::Context;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Arc<Context>>> = const { RefCell::new(Vec::new()) };
}

/// The context currently shadowing this thread, if any.
pub fn current_context() -> Option<Arc<Context>> {
    CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Keeps a context current for its lifetime; dropping restores the
/// previously current context. Not `Send`: a guard must drop on the thread
/// that created it.
pub struct ContextGuard {
    context: Arc<Context>,
    _thread_bound: PhantomData<*const ()>,
}

pub(crate) fn activate(context: Arc<Context>) -> ContextGuard {
    debug!(context = %context.name(), "activating context");
    CONTEXT_STACK.with(|stack| stack.borrow_mut().push(Arc::clone(&context)));
    ContextGuard {
        context,
        _thread_bound: PhantomData,
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert!(
                popped.is_some_and(|ctx| Arc::ptr_eq(&ctx, &self.context)),
                "context guards must drop in LIFO order"
            );
        });
        debug!(context = %self.context.name(), "deactivated context");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(name: &str) -> Arc<Context> {
        Context::builder(name).build()
    }

    #[test]
    fn test_activation_is_lifo_and_restores_the_outer_context() {
        assert!(current_context().is_none());

        let outer = context("outer");
        let guard = activate(Arc::clone(&outer));
        assert!(Arc::ptr_eq(&current_context().unwrap(), &outer));

        {
            let inner = context("inner");
            let _inner_guard = activate(Arc::clone(&inner));
            assert!(Arc::ptr_eq(&current_context().unwrap(), &inner));
        }

        assert!(Arc::ptr_eq(&current_context().unwrap(), &outer));
        drop(guard);
        assert!(current_context().is_none());
    }

    #[test]
    fn test_restoration_survives_a_panic() {
        let outer = context("outer");
        let _guard = activate(Arc::clone(&outer));

        let result = std::panic::catch_unwind(|| {
            let _inner_guard = activate(context("inner"));
            panic!("use case failed");
        });
        assert!(result.is_err());

        assert!(Arc::ptr_eq(&current_context().unwrap(), &outer));
    }

    #[test]
    fn test_threads_keep_independent_context_stacks() {
        let _guard = activate(context("main-thread"));

        std::thread::spawn(|| {
            assert!(current_context().is_none());
            let _guard = activate(context("worker-thread"));
            assert_eq!(current_context().unwrap().name(), "worker-thread");
        })
        .join()
        .unwrap();

        assert_eq!(current_context().unwrap().name(), "main-thread");
    }
}
