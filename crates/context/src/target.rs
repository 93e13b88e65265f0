use std::fmt;
use std::rc::{Rc, Weak};

use ctxreg_lifetime::Lifetime;

use crate::asset::{Asset, Evaluated, ProvidedAsset};
use crate::builder::{BuilderCore, CxValues, Getter};
use crate::by_rank;
use crate::entry::Entry;
use crate::error::{ContextError, CxError, ReferenceError};
use crate::flow::Flow;
use crate::memo::Memo;
use crate::record::EntryRecord;
use crate::request::Request;

/// The view of a context an entry definition or contribution works with.
///
/// A target is scoped to a lifetime: the record lifetime for the target a
/// definition receives, the contribution lifetime for the target a setup hook
/// receives. Iteration stops once that lifetime is cut off.
pub struct Target<V, A = V> {
	entry: Entry<V, A>,
	record: Weak<EntryRecord<V, A>>,
	lifetime: Lifetime,
}

impl<V, A> Clone for Target<V, A> {
	fn clone(&self) -> Self {
		Self {
			entry: self.entry.clone(),
			record: self.record.clone(),
			lifetime: self.lifetime.clone(),
		}
	}
}

impl<V, A> Target<V, A> {
	pub(crate) fn new(
		entry: Entry<V, A>,
		record: Weak<EntryRecord<V, A>>,
		lifetime: Lifetime,
	) -> Self {
		Self {
			entry,
			record,
			lifetime,
		}
	}

	pub fn entry(&self) -> &Entry<V, A> {
		&self.entry
	}

	pub fn lifetime(&self) -> &Lifetime {
		&self.lifetime
	}
}

impl<V: 'static, A: 'static> Target<V, A> {
	fn builder(&self) -> Option<Rc<BuilderCore>> {
		self.record.upgrade()?.builder()
	}

	pub(crate) fn builder_lifetime(&self) -> Option<Lifetime> {
		self.builder().map(|core| core.lifetime().clone())
	}

	/// Resolver of the context this target belongs to.
	pub fn getter(&self) -> Getter {
		let builder = self
			.record
			.upgrade()
			.map(|record| record.builder_weak().clone())
			.unwrap_or_default();
		Getter::new(builder)
	}

	/// The context object under construction or constructed.
	///
	/// # Panics
	///
	/// When [`try_context`](Self::try_context) fails.
	pub fn context<C: 'static>(&self) -> Rc<C> {
		self.try_context().unwrap_or_else(|error| panic!("{error}"))
	}

	pub fn try_context<C: 'static>(&self) -> Result<Rc<C>, ContextError> {
		self.builder().ok_or(ContextError::Dropped)?.context::<C>()
	}

	/// Provides a contribution to the context of this target, bounded by this
	/// target's lifetime.
	pub fn provide<V2: 'static, A2: 'static>(&self, asset: Asset<V2, A2>) -> Lifetime {
		let lifetime = match self.builder() {
			Some(core) => core.provide(asset),
			None => {
				let lifetime = asset.lifetime.unwrap_or_default();
				lifetime.off();
				lifetime
			}
		};
		lifetime.needs(&self.lifetime);
		lifetime
	}

	/// Iterates assets in registration order: peers first, then own
	/// contributions.
	pub fn each_asset(&self, mut callback: impl FnMut(A) -> Flow) -> Result<(), CxError> {
		match self.record.upgrade() {
			Some(record) => record.each_asset(self, record.cache(), &mut callback),
			None => Ok(()),
		}
	}

	/// Iterates assets most recent first: own contributions, then peers.
	pub fn each_recent_asset(&self, mut callback: impl FnMut(A) -> Flow) -> Result<(), CxError> {
		match self.record.upgrade() {
			Some(record) => record.each_recent_asset(self, record.cache(), &mut callback),
			None => Ok(()),
		}
	}

	pub fn recent_asset(&self) -> Result<Option<A>, CxError> {
		let mut recent = None;
		self.each_recent_asset(|asset| {
			recent = Some(asset);
			Flow::Stop
		})?;
		Ok(recent)
	}

	/// Sends every current contribution to `receiver`, then every new one, until
	/// `tracking` is cut off. Returns `tracking`.
	pub fn track_assets(
		&self,
		mut receiver: impl FnMut(ProvidedAsset<A>) + 'static,
		tracking: &Lifetime,
	) -> Lifetime {
		match self.record.upgrade() {
			Some(record) => record.track_assets(
				self,
				record.cache(),
				Box::new(move |provided: &ProvidedAsset<A>| receiver(provided.clone())),
				tracking,
			),
			None => tracking.off(),
		}
		tracking.clone()
	}

	/// Follows the most recent asset across ranks.
	///
	/// `receiver` is called with the current value first, then whenever the
	/// evaluated asset changes.
	pub fn track_recent_asset(
		&self,
		receiver: impl FnMut(Result<Option<Evaluated<A>>, CxError>) + 'static,
		tracking: &Lifetime,
	) -> Lifetime {
		let ranks = by_rank::assets_by_rank(self, tracking);
		by_rank::follow_recent(&ranks, receiver, tracking);
		tracking.clone()
	}

	/// Follows the full list of contributions, furthest rank first.
	pub fn track_asset_list(
		&self,
		mut receiver: impl FnMut(&[ProvidedAsset<A>]) + 'static,
		tracking: &Lifetime,
	) -> Lifetime {
		let ranks = by_rank::assets_by_rank(self, tracking);
		ranks.read(move |ranks| receiver(&by_rank::flatten(ranks)), tracking);
		tracking.clone()
	}

	/// Memoizes `evaluate` applied to this target.
	pub fn lazy<T: Clone + 'static>(&self, evaluate: impl Fn(&Self) -> T + 'static) -> Lazy<T> {
		let target = self.clone();
		Lazy {
			memo: Memo::new(),
			evaluate: Box::new(move || evaluate(&target)),
		}
	}
}

impl<V: 'static, A: 'static> CxValues for Target<V, A> {
	fn resolve<V2: 'static, A2: 'static>(
		&self,
		entry: &Entry<V2, A2>,
		request: Request<V2>,
	) -> Result<Option<V2>, CxError> {
		match self.builder() {
			Some(core) => core.get(entry, request),
			None => Err(ReferenceError::dropped(entry).into()),
		}
	}
}

impl<V, A> fmt::Debug for Target<V, A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Target")
			.field("entry", &self.entry)
			.field("lifetime", &self.lifetime)
			.finish()
	}
}

/// Value computed on first [`get`](Self::get), see [`Target::lazy`].
pub struct Lazy<T> {
	memo: Memo<T>,
	evaluate: Box<dyn Fn() -> T>,
}

impl<T: Clone> Lazy<T> {
	pub fn get(&self) -> T {
		self.memo.get_or_init(|| (self.evaluate)())
	}
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Lazy").field(&self.memo).finish()
	}
}
