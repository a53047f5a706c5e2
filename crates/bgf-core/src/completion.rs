//! The finish-signaling contract shared by every dispatch path.

use std::sync::atomic::{AtomicBool, Ordering};

/// Releases dispatch-path resources and tells the OS the work unit is done.
///
/// Implementations may be called more than once; wrap them in [`Completion`] to
/// make every call after the first a no-op.
pub trait CompletionHandler: Send + Sync + 'static {
    fn finish(&self);
}

/// Adapts a closure into a [`CompletionHandler`].
pub struct FnCompletion<F>(F);

impl<F> FnCompletion<F>
where
    F: Fn() + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> CompletionHandler for FnCompletion<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn finish(&self) {
        (self.0)()
    }
}

/// Runs the wrapped handler at most once.
pub struct Completion {
    handler: Box<dyn CompletionHandler>,
    done: AtomicBool,
}

impl Completion {
    pub fn new(handler: impl CompletionHandler) -> Self {
        Self {
            handler: Box::new(handler),
            done: AtomicBool::new(false),
        }
    }

    /// Runs the handler; returns `false` if it already ran.
    pub fn complete(&self) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.handler.finish();
        true
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl CompletionHandler for Completion {
    fn finish(&self) {
        self.complete();
    }
}
