use std::fmt;
use std::rc::Rc;

use ctxreg_lifetime::Lifetime;

use super::BuilderCore;
use crate::peer::{Peer, PeerHandle, sealed};

/// A builder seen as a peer whose contributions are evaluated in that
/// builder's own context, sharing its build cache.
///
/// Obtained from [`ContextBuilder::bound_peer`](super::ContextBuilder::bound_peer).
#[derive(Clone)]
pub struct BoundPeer {
	core: Rc<BuilderCore>,
}

impl BoundPeer {
	pub(crate) fn new(core: Rc<BuilderCore>) -> Self {
		Self { core }
	}

	pub fn lifetime(&self) -> &Lifetime {
		self.core.lifetime()
	}

	pub fn rank_count(&self) -> usize {
		self.core.rank_count()
	}
}

impl sealed::Sealed for BoundPeer {}

impl Peer for BoundPeer {
	fn to_peer(&self) -> PeerHandle {
		PeerHandle::bound(self.core.clone())
	}
}

impl fmt::Debug for BoundPeer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BoundPeer").field("builder", &self.core.label()).finish()
	}
}
