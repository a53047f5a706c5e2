use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use bgf_model::DispatchEvent;
use tracing::warn;

/// Receives every [`DispatchEvent`] the subsystem emits.
///
/// Called synchronously on the thread that produced the event; implementations
/// should return quickly.
pub trait Subscribe: Send + Sync + 'static {
    fn on_event(&self, event: &DispatchEvent);

    fn name(&self) -> &'static str;
}

/// Fans events out to the registered subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<[Arc<dyn Subscribe>]>,
}

impl EventBus {
    pub fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self {
            subscribers: subscribers.into(),
        }
    }

    pub fn publish(&self, event: DispatchEvent) {
        for sub in self.subscribers.iter() {
            if catch_unwind(AssertUnwindSafe(|| sub.on_event(&event))).is_err() {
                warn!(subscriber = sub.name(), kind = ?event.kind, "subscriber panicked while processing an event");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgf_model::EventKind;
    use std::sync::Mutex;

    struct Collect(Mutex<Vec<EventKind>>);

    impl Subscribe for Collect {
        fn on_event(&self, event: &DispatchEvent) {
            self.0.lock().unwrap().push(event.kind);
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Panicky;

    impl Subscribe for Panicky {
        fn on_event(&self, _event: &DispatchEvent) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[test]
    fn panicking_subscriber_does_not_starve_others() {
        let collect = Arc::new(Collect(Mutex::new(Vec::new())));
        let bus = EventBus::new(vec![Arc::new(Panicky), collect.clone()]);

        bus.publish(DispatchEvent::new(EventKind::TaskRegistered));

        assert_eq!(*collect.0.lock().unwrap(), vec![EventKind::TaskRegistered]);
    }
}
