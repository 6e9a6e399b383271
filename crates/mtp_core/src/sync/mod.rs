//! Clock synchronization.
//!
//! The video's playback position is the single master clock. Every
//! `interval_ms` while playing, each enabled track's drift
//! (`track_time - master_time`) is classified:
//!
//! ```text
//! |drift| > hard_threshold          -> seek to master, nominal rate
//! soft_threshold < |drift| <= hard  -> nominal * (1 -/+ soft_rate_bias)
//! |drift| <= soft_threshold         -> nominal rate
//! ```

mod clock;
mod drift;
mod synchronizer;

pub use clock::{MasterClock, WallClock};
pub use drift::{drift_correction, Correction};
pub use synchronizer::{ClockSynchronizer, TickReport};
