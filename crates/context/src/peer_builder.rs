use std::fmt;
use std::rc::Rc;

use ctxreg_lifetime::Lifetime;

use crate::asset::Asset;
use crate::builder::{BuilderCore, BuilderOptions, ContextSlot};
use crate::cache::BuildCache;
use crate::peer::{Peer, PeerHandle, sealed};

/// Collects contributions for other builders without constructing a context of
/// its own.
///
/// Contributions are always evaluated in the requesting context, and nothing is
/// cached here: built contributions are cached by each requesting builder.
#[derive(Clone)]
pub struct PeerBuilder {
	core: Rc<BuilderCore>,
}

impl Default for PeerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl PeerBuilder {
	pub fn new() -> Self {
		Self::with_options(BuilderOptions::new())
	}

	pub fn with_options(options: BuilderOptions) -> Self {
		Self {
			core: BuilderCore::new(options, "peer", BuildCache::disabled(), ContextSlot::Absent),
		}
	}

	pub fn label(&self) -> &str {
		self.core.label()
	}

	pub fn lifetime(&self) -> &Lifetime {
		self.core.lifetime()
	}

	pub fn rank_count(&self) -> usize {
		self.core.rank_count()
	}

	/// Registers a contribution. Returns its lifetime.
	pub fn provide<V: 'static, A: 'static>(&self, asset: Asset<V, A>) -> Lifetime {
		self.core.provide(asset)
	}
}

impl sealed::Sealed for PeerBuilder {}

impl Peer for PeerBuilder {
	fn to_peer(&self) -> PeerHandle {
		PeerHandle::derived(self.core.clone())
	}
}

impl fmt::Debug for PeerBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("PeerBuilder").field(&self.core).finish()
	}
}
