//! Cancellable lifetime tokens.
//!
//! A [`Lifetime`] is a single-threaded handle that can be cut off exactly once,
//! optionally with an [`OffReason`]. Everything else in the workspace anchors its
//! state to one: contributions, trackers, entry records, whole builders.
//!
//! # Invariants
//!
//! - Off-callbacks run exactly once, outside of any internal borrow, in the order
//!   they were registered.
//! - A callback registered on a token that is already off runs immediately.
//! - [`Lifetime::needs`] propagates the parent's reason to the dependent token and
//!   releases its hook on the parent once the dependent goes off first.

mod lifetime;
mod reason;


pub use lifetime::{Lifetime, LifetimeId, Subscription};
pub use reason::OffReason;
