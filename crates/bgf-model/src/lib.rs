//! Wire and domain types shared by the background fetch dispatch crates.
//!
//! Nothing here performs I/O: these are the identifiers, OS job metadata,
//! headless payload events and task configuration exchanged between the OS seams,
//! the dispatch core and the observers.

mod domain;
pub use domain::*;

mod kind;
pub use kind::*;

mod event;
pub use event::{DispatchEvent, EventKind};

mod error;
pub use error::ModelError;
