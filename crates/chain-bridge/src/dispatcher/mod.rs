//! Public entry points for pipeline lifecycle notifications.
//!
//! [`AsyncDispatcher`] awaits every sink operation. [`BlockingDispatcher`]
//! runs them to completion on a tokio runtime before returning, for callers
//! that cannot suspend. Both drive the same [`BridgeState`](crate::BridgeState),
//! so they produce identical command sequences for identical input.

mod blocking;
mod suspending;

pub use blocking::BlockingDispatcher;
pub use suspending::AsyncDispatcher;
