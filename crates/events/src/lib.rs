//! Push-style event streams.
//!
//! Two primitives, both single-threaded and synchronous:
//!
//! - [`EventEmitter`]: pushes every sent event to the receivers attached at the
//!   time of dispatch.
//! - [`ValueTracker`]: holds a current value, replays it to every new reader and
//!   pushes each replacement afterwards.
//!
//! Both implement [`EventSource`], the contract consumers subscribe through.
//! Every subscription is anchored to a [`Lifetime`]; cutting it off detaches the
//! receiver.

mod emitter;
mod source;
mod tracker;


pub use ctxreg_lifetime::Lifetime;
pub use emitter::EventEmitter;
pub use source::EventSource;
pub use tracker::ValueTracker;
