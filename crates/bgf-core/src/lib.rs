//! Background fetch dispatch: turns OS scheduling callbacks into headless payload
//! invocations and makes sure the OS hears back exactly once per execution.

pub mod error;
pub use error::CoreError;

pub mod config;
pub use config::DispatchConfig;

pub mod bridge;
pub mod clock;
pub mod completion;
pub mod os;
pub mod registry;
pub mod schedule;
pub mod subscriber;
pub mod task;
pub mod wakelock;

pub mod dispatch;
pub use dispatch::Dispatcher;

pub mod fetch;
pub use fetch::BackgroundFetch;

pub mod platform;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
