//! Composition roots.
//!
//! A [`ContextBuilder`] owns the records of a context, constructs the context
//! object on first access and resolves entry values for it. Builders chain
//! [peers](crate::Peer) whose contributions rank below their own.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use ctxreg_lifetime::Lifetime;

mod bound;
mod getter;
mod state;
#[cfg(test)]
mod tests;

pub use self::bound::BoundPeer;
pub use self::getter::{CxValues, Getter};
pub(crate) use self::state::{BuilderCore, ContextSlot};
use crate::asset::Asset;
use crate::cache::BuildCache;
use crate::entry::Entry;
use crate::error::CxError;
use crate::peer::{Peer, PeerHandle, sealed};
use crate::request::Request;

/// Builder configuration.
///
/// ```
/// # use ctxreg::{BuilderOptions, Lifetime, PeerBuilder};
/// let parent = PeerBuilder::new();
/// let options = BuilderOptions::new()
/// 	.label("request")
/// 	.peer(&parent)
/// 	.lifetime(&Lifetime::new());
/// # let _ = options;
/// ```
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
	pub(crate) label: Option<Rc<str>>,
	pub(crate) peers: Vec<PeerHandle>,
	pub(crate) lifetime: Option<Lifetime>,
}

impl BuilderOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Name used in logs and `Debug` output.
	pub fn label(mut self, label: impl Into<Rc<str>>) -> Self {
		self.label = Some(label.into());
		self
	}

	/// Appends a peer. Peers listed later rank closer to the builder.
	pub fn peer(mut self, peer: &impl Peer) -> Self {
		self.peers.push(peer.to_peer());
		self
	}

	/// Owning lifetime. Cutting it off disposes the builder.
	pub fn lifetime(mut self, lifetime: &Lifetime) -> Self {
		self.lifetime = Some(lifetime.clone());
		self
	}
}

/// Builds a context object of type `C` and resolves entry values for it.
pub struct ContextBuilder<C> {
	core: Rc<BuilderCore>,
	_context: PhantomData<fn() -> C>,
}

impl<C> Clone for ContextBuilder<C> {
	fn clone(&self) -> Self {
		Self {
			core: self.core.clone(),
			_context: PhantomData,
		}
	}
}

impl<C: 'static> ContextBuilder<C> {
	/// Creates a builder constructing its context with `factory`.
	///
	/// The factory runs once, on the first [`context`](Self::context) call.
	pub fn new(factory: impl FnOnce(Getter, &ContextBuilder<C>) -> C + 'static) -> Self {
		Self::with_options(BuilderOptions::new(), factory)
	}

	pub fn with_options(
		options: BuilderOptions,
		factory: impl FnOnce(Getter, &ContextBuilder<C>) -> C + 'static,
	) -> Self {
		let slot = ContextSlot::Pending(Box::new(move |core: &Rc<BuilderCore>| {
			let builder = Self::from_core(core.clone());
			let context: Rc<dyn Any> = Rc::new(factory(builder.getter(), &builder));
			context
		}));
		Self::from_core(BuilderCore::new(options, "context", BuildCache::new(), slot))
	}

	fn from_core(core: Rc<BuilderCore>) -> Self {
		Self {
			core,
			_context: PhantomData,
		}
	}

	/// The context object, constructed on first access.
	///
	/// # Panics
	///
	/// When called from the context factory itself.
	pub fn context(&self) -> Rc<C> {
		self.core.context::<C>().unwrap_or_else(|error| panic!("{error}"))
	}

	/// Resolver bound to this builder.
	pub fn getter(&self) -> Getter {
		Getter::new(self.core.downgrade())
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

	/// Peer evaluating contributions against this builder's own context and
	/// build cache.
	pub fn bound_peer(&self) -> BoundPeer {
		BoundPeer::new(self.core.clone())
	}

	/// Registers a contribution. Returns its lifetime; cutting it off revokes the
	/// contribution.
	pub fn provide<V: 'static, A: 'static>(&self, asset: Asset<V, A>) -> Lifetime {
		self.core.provide(asset)
	}
}

impl<C: 'static> CxValues for ContextBuilder<C> {
	fn resolve<V: 'static, A: 'static>(
		&self,
		entry: &Entry<V, A>,
		request: Request<V>,
	) -> Result<Option<V>, CxError> {
		self.core.get(entry, request)
	}
}

impl<C> sealed::Sealed for ContextBuilder<C> {}

impl<C> Peer for ContextBuilder<C> {
	fn to_peer(&self) -> PeerHandle {
		PeerHandle::derived(self.core.clone())
	}
}

impl<C> fmt::Debug for ContextBuilder<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ContextBuilder").field(&self.core).finish()
	}
}
