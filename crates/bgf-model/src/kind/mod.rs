mod network;
pub use network::NetworkType;

mod task;
pub use task::{ScheduleKind, TaskConfig};
