//! Player controller and its outward event surface.
//!
//! The `Player` owns the track registry, mixer and clock synchronizer for the
//! open file and turns user commands into lifecycle transitions. Front-ends
//! drive it from one task:
//!
//! ```ignore
//! let mut ticker = tokio::time::interval(player.sync_interval());
//! loop {
//!     tokio::select! {
//!         _ = ticker.tick() => { player.tick(); }
//!         Some(event) = player.next_job_event() => player.handle_job_event(event),
//!         // user commands ...
//!     }
//! }
//! ```

mod controller;
mod errors;
mod events;

pub use controller::Player;
pub use errors::{PlayerError, PlayerResult};
pub use events::PlayerEvent;
