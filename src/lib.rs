//! Client-side bookkeeping for files shared in a drop session.
//!
//! The local participant registers files, the coordinating service answers
//! with per-file keys, and every file moves through `Loading`, `Ready` and
//! `Removing` before it is evicted. Transitions the user can see are held
//! back for a short random dwell so fast round-trips do not flicker.

pub mod channel;
pub mod clock;
pub mod config;
mod errors;
pub mod jitter;
pub mod message;
pub mod record;
mod registry;
mod subscriber;

pub use channel::{MessageChannel, MpscChannel};
pub use clock::{Clock, Scheduler, TokioClock, TokioScheduler};
pub use config::RegistryConfig;
pub use errors::{RegistryError, Result};
pub use jitter::{compute_jitter_delay, Dwell, FixedDwell, RandomDwell};
pub use message::{InboundMessage, KeyGrant, KeyRequest, OutboundMessage};
pub use record::{FileData, FileRef, TransferRecord, TransferStatus};
pub use registry::TransferRegistry;
pub use subscriber::RegistrySubscriber;

/// Install an `env_logger` logger honoring `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn initialize() {
    let _ = env_logger::Builder::from_default_env()
        .is_test(cfg!(test))
        .try_init();
}
