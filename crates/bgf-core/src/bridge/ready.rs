//! Single-use "context ready" subscriptions.

use std::sync::{Mutex, PoisonError};

/// Listener that fires at most once.
///
/// Firing consumes the listener, so it is deregistered by construction.
pub struct ReadyListener<T> {
    callback: Box<dyn FnOnce(T) + Send + 'static>,
}

impl<T> ReadyListener<T> {
    pub fn new(callback: impl FnOnce(T) + Send + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn fire(self, value: T) {
        (self.callback)(value)
    }
}

struct State<T> {
    ready: Option<T>,
    pending: Vec<ReadyListener<T>>,
}

/// Latching readiness signal.
///
/// Listeners subscribed before [`ReadySignal::publish`] fire on publish; listeners
/// subscribed afterwards fire immediately, so a subscription racing with
/// readiness is never lost. Runtimes use it to implement
/// [`Runtime::on_context_ready`](super::Runtime::on_context_ready).
pub struct ReadySignal<T> {
    state: Mutex<State<T>>,
}

impl<T: Clone> ReadySignal<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                ready: None,
                pending: Vec::new(),
            }),
        }
    }

    pub fn subscribe(&self, listener: ReadyListener<T>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.ready.clone() {
            Some(value) => {
                drop(state);
                listener.fire(value);
            }
            None => state.pending.push(listener),
        }
    }

    /// Latch `value` and fire every pending listener.
    pub fn publish(&self, value: T) {
        let pending = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.ready = Some(value.clone());
            std::mem::take(&mut state.pending)
        };
        for listener in pending {
            listener.fire(value.clone());
        }
    }

    /// Forget the latched value (e.g. the context was torn down).
    pub fn reset(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ready = None;
    }

    pub fn is_ready(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ready
            .is_some()
    }

    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

impl<T: Clone> Default for ReadySignal<T> {
    fn default() -> Self {
        Self::new()
    }
}
