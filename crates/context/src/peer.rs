//! Upstream contribution sources.
//!
//! A builder consults its peers before its own contributions. Two kinds exist:
//!
//! - derived: another builder's records, evaluated against the requesting
//!   target and cache, so built contributions are evaluated per requesting
//!   context;
//! - bound: another builder's records, evaluated against that builder's own
//!   targets and cache, so results are shared with it.

use std::fmt;
use std::rc::Rc;

use ctxreg_lifetime::Lifetime;

use crate::asset::{Collector, ProvidedAsset};
use crate::builder::BuilderCore;
use crate::cache::BuildCache;
use crate::error::CxError;
use crate::record::EntryRecord;
use crate::target::Target;

pub(crate) mod sealed {
	pub trait Sealed {}
}

/// Something a builder can list as a peer.
///
/// Implemented by [`ContextBuilder`](crate::ContextBuilder),
/// [`PeerBuilder`](crate::PeerBuilder), [`BoundPeer`](crate::BoundPeer) and
/// [`PeerHandle`].
pub trait Peer: sealed::Sealed {
	fn to_peer(&self) -> PeerHandle;
}

#[derive(Clone)]
enum PeerKind {
	Derived(Rc<BuilderCore>),
	Bound(Rc<BuilderCore>),
}

/// Type-erased peer as stored in a builder's peer list.
#[derive(Clone)]
pub struct PeerHandle(PeerKind);

impl PeerHandle {
	pub(crate) fn derived(core: Rc<BuilderCore>) -> Self {
		Self(PeerKind::Derived(core))
	}

	pub(crate) fn bound(core: Rc<BuilderCore>) -> Self {
		Self(PeerKind::Bound(core))
	}

	fn core(&self) -> &Rc<BuilderCore> {
		match &self.0 {
			PeerKind::Derived(core) | PeerKind::Bound(core) => core,
		}
	}

	/// Number of rank levels this peer spans.
	pub fn rank_count(&self) -> usize {
		self.core().rank_count()
	}

	/// Lifetime of the builder behind this peer.
	pub fn lifetime(&self) -> &Lifetime {
		self.core().lifetime()
	}

	/// Resolves the record of this peer and the target and cache to evaluate it
	/// with.
	fn with_record<V: 'static, A: 'static, R>(
		&self,
		target: &Target<V, A>,
		cache: &BuildCache,
		f: impl FnOnce(&EntryRecord<V, A>, &Target<V, A>, &BuildCache) -> R,
	) -> R {
		match &self.0 {
			PeerKind::Derived(core) => {
				let record = core.record(target.entry());
				f(&record, target, cache)
			}
			PeerKind::Bound(core) => {
				let record = core.record(target.entry());
				let own = record.target().clone();
				f(&record, &own, core.cache())
			}
		}
	}

	pub(crate) fn each_asset<V: 'static, A: 'static>(
		&self,
		target: &Target<V, A>,
		cache: &BuildCache,
		collector: &mut Collector<'_, A>,
	) -> Result<(), CxError> {
		self.with_record(target, cache, |record, target, cache| {
			record.each_asset(target, cache, collector)
		})
	}

	pub(crate) fn each_recent_asset<V: 'static, A: 'static>(
		&self,
		target: &Target<V, A>,
		cache: &BuildCache,
		collector: &mut Collector<'_, A>,
	) -> Result<(), CxError> {
		self.with_record(target, cache, |record, target, cache| {
			record.each_recent_asset(target, cache, collector)
		})
	}

	pub(crate) fn track_assets<V: 'static, A: 'static>(
		&self,
		target: &Target<V, A>,
		cache: &BuildCache,
		receiver: Box<dyn FnMut(&ProvidedAsset<A>)>,
		tracking: &Lifetime,
	) {
		self.with_record(target, cache, |record, target, cache| {
			record.track_assets(target, cache, receiver, tracking)
		});
	}
}

impl sealed::Sealed for PeerHandle {}

impl Peer for PeerHandle {
	fn to_peer(&self) -> PeerHandle {
		self.clone()
	}
}

impl fmt::Debug for PeerHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (kind, core) = match &self.0 {
			PeerKind::Derived(core) => ("derived", core),
			PeerKind::Bound(core) => ("bound", core),
		};
		f.debug_struct("PeerHandle")
			.field("kind", &kind)
			.field("builder", &core.label())
			.finish()
	}
}
