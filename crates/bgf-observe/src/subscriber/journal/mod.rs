use bgf_core::subscriber::Subscribe;
use bgf_model::DispatchEvent;

use crate::subscriber::view::log_event;

/// Writes every dispatch event to the `tracing` pipeline.
#[derive(Debug, Default)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for Journal {
    fn on_event(&self, event: &DispatchEvent) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "journal"
    }
}
