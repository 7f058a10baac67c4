//! Chunk-update scheduling: dirty-chunk selection, throttled background
//! regeneration and handoff of finished chunks to the rendering thread.
#![forbid(unsafe_code)]

mod config;
mod error;
mod filter;
mod inflight;
pub mod ordering;
mod scheduler;
mod stats;
mod vbo_queue;


pub use config::{SchedulerConfig, default_worker_cap};
pub use error::SchedulerError;
pub use filter::filter_dirty;
pub use inflight::{InFlightTracker, SlotLease};
pub use scheduler::{ChunkUpdateManager, TickOutcome};
pub use stats::{SchedulerStats, UpdateStats};
pub use vbo_queue::{VboSender, VboUpdateQueue};
