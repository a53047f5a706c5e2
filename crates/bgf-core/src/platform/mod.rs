//! Interfaces of the one-shot platform collaborators the host app wires in next
//! to the dispatch pipeline.
//!
//! None of these schedule, retry or hold state beyond a channel registry; they
//! are thin policies over a platform trait the embedder implements.

mod capability;
pub use capability::{ANIMATION_SCALE_KEYS, SettingsSource, animations_enabled};

mod palette;
pub use palette::{ColorResolver, Palette, palette};

mod notify;
pub use notify::{Channel, Notification, NotificationSink, Notifier};

mod permission;
pub use permission::{PermissionRequester, PermissionStatus, request_then};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("not supported on this platform: {0}")]
    Unsupported(String),
    #[error("platform call failed: {0}")]
    Failed(String),
}
