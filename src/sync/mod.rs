// src/sync/mod.rs

// Declare sub-modules for status tracking
pub mod debounce;
pub mod http;
pub mod manager;
pub mod messages;
pub mod source;
pub mod status;
pub mod timer;

pub use manager::{spawn_tracker, TrackerHandle, TrackerSettings};
pub use messages::{ActionKind, TrackerCommand, TrackerEvent};
pub use source::StatusSource;
pub use status::{JobKind, SetupPhase, SetupStatus};
