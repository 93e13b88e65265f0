//! Context value registry.
//!
//! Values of a context are resolved lazily per [`Entry`]. Each entry collects
//! [`Asset`] contributions from the context's own builder and from its
//! [peers](Peer), and its [`Definition`] turns them into a value.
//!
//! ```
//! use ctxreg::assets::const_asset;
//! use ctxreg::entries::recent;
//! use ctxreg::{ContextBuilder, CxValues};
//!
//! let greeting = recent::<String>("greeting");
//! let builder = ContextBuilder::new(|get, _| get);
//!
//! builder.provide(const_asset(&greeting, "hello".to_owned()));
//! builder.provide(const_asset(&greeting, "hi".to_owned()));
//!
//! assert_eq!(builder.context().get(&greeting).unwrap(), "hi");
//! ```
//!
//! # Precedence
//!
//! A [`Request`] selects how a value may be obtained: from provided assets only
//! ([`RequestMethod::Assets`]), from the entry default only
//! ([`RequestMethod::Defaults`]), or assets first with the default as fallback
//! ([`RequestMethod::Fallback`], the default). An explicit fallback value set
//! with [`Request::or`] is returned where nothing else resolves.
//!
//! # Ranks
//!
//! Contributions tracked across peers carry a rank: `0` for the requesting
//! builder's own, growing with the distance to the peer that holds them. Peers
//! listed later rank closer than peers listed earlier.
//!
//! # Lifetimes
//!
//! Every contribution, tracker, record and builder is anchored to a
//! [`Lifetime`]. Cutting a contribution's lifetime off revokes it; cutting a
//! builder's lifetime off disposes everything anchored to it.

mod asset;
pub mod assets;
mod builder;
mod by_rank;
mod cache;
pub mod entries;
mod entry;
mod error;
mod flow;
mod memo;
mod peer;
mod peer_builder;
mod placer;
mod record;
mod request;
mod target;

pub use ctxreg_lifetime::{Lifetime, LifetimeId, OffReason};

pub use self::asset::{
	Asset, BuildFn, Collector, Evaluated, PlaceFn, ProvidedAsset, Provider, Updater,
};
pub use self::builder::{BoundPeer, BuilderOptions, ContextBuilder, CxValues, Getter};
pub use self::entry::{AssignFn, Assigner, Definition, Entry, EntryId};
pub use self::error::{AssetError, ContextError, CxError, ReferenceCause, ReferenceError};
pub use self::flow::Flow;
pub use self::memo::Memo;
pub use self::peer::{Peer, PeerHandle};
pub use self::peer_builder::PeerBuilder;
pub use self::request::{Request, RequestMethod};
pub use self::target::{Lazy, Target};
