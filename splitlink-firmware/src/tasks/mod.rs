//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod housekeeping;
pub mod keys;
pub mod target;

pub use housekeeping::{housekeeping_task, LinkInitiator};
pub use keys::{keys_task, NUM_KEYS};
pub use target::{target_task, LinkTarget};
