use std::{
    collections::HashSet,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicI32, Ordering},
    },
};

use tracing::{debug, warn};

use super::PlatformError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl Channel {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Expanded text shown under the body.
    pub summary: Option<String>,
    pub channel: Channel,
}

/// The platform notification manager.
pub trait NotificationSink: Send + Sync {
    fn create_channel(&self, channel: &Channel) -> Result<(), PlatformError>;

    fn notify(&self, id: i32, notification: &Notification) -> Result<(), PlatformError>;
}

/// Posts notifications, registering each channel on first use.
pub struct Notifier<S> {
    sink: S,
    channels: Mutex<HashSet<String>>,
    next_id: AtomicI32,
}

impl<S: NotificationSink> Notifier<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            channels: Mutex::new(HashSet::new()),
            next_id: AtomicI32::new(1),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Fire-and-forget; returns whether the notification was posted.
    pub fn post(&self, notification: &Notification) -> bool {
        if let Err(e) = self.ensure_channel(&notification.channel) {
            warn!(channel = %notification.channel.id, error = %e, "failed to register notification channel");
            return false;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match self.sink.notify(id, notification) {
            Ok(()) => true,
            Err(e) => {
                warn!(channel = %notification.channel.id, error = %e, "failed to post notification");
                false
            }
        }
    }

    fn ensure_channel(&self, channel: &Channel) -> Result<(), PlatformError> {
        let mut known = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if known.contains(&channel.id) {
            return Ok(());
        }
        self.sink.create_channel(channel)?;
        debug!(channel = %channel.id, "notification channel registered");
        known.insert(channel.id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Sink {
        channels: AtomicUsize,
        posted: Mutex<Vec<(i32, String)>>,
        refuse_channels: bool,
    }

    impl NotificationSink for Sink {
        fn create_channel(&self, channel: &Channel) -> Result<(), PlatformError> {
            if self.refuse_channels {
                return Err(PlatformError::Failed(channel.id.clone()));
            }
            self.channels.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn notify(&self, id: i32, notification: &Notification) -> Result<(), PlatformError> {
            self.posted
                .lock()
                .unwrap()
                .push((id, notification.title.clone()));
            Ok(())
        }
    }

    fn note(title: &str, channel: &str) -> Notification {
        Notification {
            title: title.to_string(),
            body: "body".to_string(),
            summary: None,
            channel: Channel::new(channel, "New article", "New articles which you may like"),
        }
    }

    #[test]
    fn channel_is_registered_once_per_id() {
        let notifier = Notifier::new(Sink::default());

        assert!(notifier.post(&note("a", "Messages")));
        assert!(notifier.post(&note("b", "Messages")));
        assert!(notifier.post(&note("c", "Digest")));

        assert_eq!(notifier.sink().channels.load(Ordering::SeqCst), 2);
        let posted = notifier.sink().posted.lock().unwrap().clone();
        assert_eq!(posted.len(), 3);
        assert_ne!(posted[0].0, posted[1].0);
    }

    #[test]
    fn channel_failure_reports_false() {
        let notifier = Notifier::new(Sink {
            refuse_channels: true,
            ..Default::default()
        });

        assert!(!notifier.post(&note("a", "Messages")));
        assert!(notifier.sink().posted.lock().unwrap().is_empty());
    }
}
