use std::fmt;
use std::rc::Rc;

use ctxreg_events::EventEmitter;
use ctxreg_lifetime::Lifetime;
use smallvec::SmallVec;

use crate::entry::Entry;
use crate::error::CxError;
use crate::flow::Flow;
use crate::memo::Memo;
use crate::target::Target;

/// Asset callback: receives one asset, decides whether to go on.
pub type Collector<'a, A> = dyn FnMut(A) -> Flow + 'a;

/// Direct placement: pushes assets to the collector on every iteration.
pub type PlaceFn<V, A> = dyn Fn(&Target<V, A>, &mut Collector<'_, A>) -> Result<(), CxError>;

/// Provider builder: runs once per requesting context.
pub type BuildFn<V, A> = dyn Fn(&Target<V, A>, &Updater) -> Result<Option<Provider<A>>, CxError>;

type SetupFn<V, A> = Box<dyn FnOnce(&Target<V, A>)>;

pub(crate) enum AssetKind<V, A> {
	Place(Rc<PlaceFn<V, A>>),
	Build(Rc<BuildFn<V, A>>),
}

/// A contribution of assets to an entry.
pub struct Asset<V, A = V> {
	pub(crate) entry: Entry<V, A>,
	pub(crate) lifetime: Option<Lifetime>,
	pub(crate) kind: AssetKind<V, A>,
	pub(crate) setup: Option<SetupFn<V, A>>,
}

impl<V, A> Asset<V, A> {
	/// Contribution placing assets directly, re-invoked on every iteration.
	pub fn place(
		entry: &Entry<V, A>,
		place: impl Fn(&Target<V, A>, &mut Collector<'_, A>) -> Result<(), CxError> + 'static,
	) -> Self {
		Self {
			entry: entry.clone(),
			lifetime: None,
			kind: AssetKind::Place(Rc::new(place)),
			setup: None,
		}
	}

	/// Contribution building a provider once per requesting context.
	///
	/// `Ok(None)` means the contribution places nothing in that context.
	pub fn build(
		entry: &Entry<V, A>,
		build: impl Fn(&Target<V, A>, &Updater) -> Result<Option<Provider<A>>, CxError> + 'static,
	) -> Self {
		Self {
			entry: entry.clone(),
			lifetime: None,
			kind: AssetKind::Build(Rc::new(build)),
			setup: None,
		}
	}

	/// Bounds the contribution by `lifetime`. A fresh token is used otherwise.
	pub fn with_lifetime(mut self, lifetime: &Lifetime) -> Self {
		self.lifetime = Some(lifetime.clone());
		self
	}

	/// Runs `setup` once the contribution is registered, with a target scoped to
	/// the contribution lifetime.
	pub fn with_setup(mut self, setup: impl FnOnce(&Target<V, A>) + 'static) -> Self {
		self.setup = Some(Box::new(setup));
		self
	}

	pub fn entry(&self) -> &Entry<V, A> {
		&self.entry
	}
}

impl<V, A> fmt::Debug for Asset<V, A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = match self.kind {
			AssetKind::Place(_) => "place",
			AssetKind::Build(_) => "build",
		};
		f.debug_struct("Asset")
			.field("entry", &self.entry)
			.field("kind", &kind)
			.field("lifetime", &self.lifetime)
			.finish()
	}
}

/// Built provider: places the assets of one contribution in one context.
pub struct Provider<A>(Rc<dyn Fn(&mut Collector<'_, A>) -> Result<(), CxError>>);

impl<A> Clone for Provider<A> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<A> Provider<A> {
	pub fn new(place: impl Fn(&mut Collector<'_, A>) -> Result<(), CxError> + 'static) -> Self {
		Self(Rc::new(place))
	}

	pub(crate) fn place(&self, collector: &mut Collector<'_, A>) -> Result<(), CxError> {
		(self.0)(collector)
	}
}

impl<A: Clone + 'static> Provider<A> {
	/// Provider placing clones of `assets` in order.
	pub fn of(assets: impl IntoIterator<Item = A>) -> Self {
		let assets: Rc<[A]> = assets.into_iter().collect();
		Self::new(move |collector| {
			for asset in assets.iter() {
				if collector(asset.clone()).is_stop() {
					break;
				}
			}
			Ok(())
		})
	}
}

/// Signals that a built provider now places different assets.
#[derive(Clone)]
pub struct Updater {
	updates: EventEmitter<()>,
	lifetime: Lifetime,
}

impl Updater {
	pub(crate) fn new(lifetime: &Lifetime) -> Self {
		let updates = EventEmitter::new();
		updates.bind(lifetime);
		Self {
			updates,
			lifetime: lifetime.clone(),
		}
	}

	/// Notifies trackers that cached recent values of this contribution are stale.
	pub fn update(&self) {
		self.updates.send(());
	}

	/// Lifetime of the contribution being built.
	pub fn lifetime(&self) -> &Lifetime {
		&self.lifetime
	}

	pub(crate) fn on(&self, receiver: Box<dyn FnMut(&())>, tracking: &Lifetime) {
		self.updates.on(receiver, tracking);
	}
}

impl fmt::Debug for Updater {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Updater").field("lifetime", &self.lifetime).finish()
	}
}

struct EvaluatedInner<A> {
	asset: A,
	rank: usize,
	lifetime: Lifetime,
}

/// Most recent asset of one contribution, as evaluated once.
///
/// Compares by evaluation identity: re-evaluating the same asset yields an
/// unequal handle.
pub struct Evaluated<A>(Rc<EvaluatedInner<A>>);

impl<A> Evaluated<A> {
	pub(crate) fn new(asset: A, rank: usize, lifetime: Lifetime) -> Self {
		Self(Rc::new(EvaluatedInner {
			asset,
			rank,
			lifetime,
		}))
	}

	pub fn asset(&self) -> &A {
		&self.0.asset
	}

	pub fn rank(&self) -> usize {
		self.0.rank
	}

	pub fn lifetime(&self) -> &Lifetime {
		&self.0.lifetime
	}
}

impl<A> Clone for Evaluated<A> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<A> PartialEq for Evaluated<A> {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl<A> Eq for Evaluated<A> {}

impl<A: fmt::Debug> fmt::Debug for Evaluated<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Evaluated")
			.field("asset", &self.0.asset)
			.field("rank", &self.0.rank)
			.finish()
	}
}

/// One contribution as seen by a tracker.
pub(crate) trait AssetSource<A> {
	fn lifetime(&self) -> &Lifetime;

	fn each_asset(&self, collector: &mut Collector<'_, A>) -> Result<(), CxError>;

	fn on_update(&self, receiver: Box<dyn FnMut(&())>, tracking: &Lifetime);
}

/// Handle to a contribution delivered by asset tracking.
pub struct ProvidedAsset<A> {
	source: Rc<dyn AssetSource<A>>,
	rank: usize,
	recent: Rc<Memo<Option<Evaluated<A>>>>,
}

impl<A> Clone for ProvidedAsset<A> {
	fn clone(&self) -> Self {
		Self {
			source: self.source.clone(),
			rank: self.rank,
			recent: self.recent.clone(),
		}
	}
}

impl<A: 'static> ProvidedAsset<A> {
	pub(crate) fn new(source: Rc<dyn AssetSource<A>>, rank: usize) -> Self {
		let recent = Rc::new(Memo::new());
		let memo = Rc::downgrade(&recent);
		source.on_update(
			Box::new(move |_| {
				if let Some(memo) = memo.upgrade() {
					memo.invalidate();
				}
			}),
			&source.lifetime().derive(),
		);
		Self {
			source,
			rank,
			recent,
		}
	}

	/// The same contribution seen through a peer, `rank` levels away.
	pub(crate) fn with_rank(&self, rank: usize) -> Self {
		Self::new(self.source.clone(), rank)
	}

	/// Distance from the tracking context. `0` for its own contributions.
	pub fn rank(&self) -> usize {
		self.rank
	}

	/// Cut off once the contribution is revoked or tracking stops.
	pub fn lifetime(&self) -> &Lifetime {
		self.source.lifetime()
	}

	/// Iterates the assets of this contribution only, in placement order.
	pub fn each_asset(&self, mut callback: impl FnMut(A) -> Flow) -> Result<(), CxError> {
		self.source.each_asset(&mut callback)
	}

	/// Iterates the assets of this contribution only, most recent first.
	pub fn each_recent_asset(&self, mut callback: impl FnMut(A) -> Flow) -> Result<(), CxError> {
		let mut assets: SmallVec<[A; 4]> = SmallVec::new();
		self.source.each_asset(&mut |asset| {
			assets.push(asset);
			Flow::Continue
		})?;
		for asset in assets.into_iter().rev() {
			if callback(asset).is_stop() {
				break;
			}
		}
		Ok(())
	}

	/// The most recent asset of this contribution, memoized until the
	/// contribution signals an update.
	pub fn recent_asset(&self) -> Result<Option<Evaluated<A>>, CxError> {
		self.recent.get_or_try_init(|| {
			let mut recent = None;
			self.each_recent_asset(|asset| {
				recent = Some(Evaluated::new(asset, self.rank, self.lifetime().clone()));
				Flow::Stop
			})?;
			Ok(recent)
		})
	}

	/// Calls `receiver` on every update signalled by the contribution until
	/// `tracking` or the contribution lifetime is cut off.
	pub fn on_update(&self, mut receiver: impl FnMut() + 'static, tracking: &Lifetime) -> Lifetime {
		tracking.needs(self.lifetime());
		self.source.on_update(Box::new(move |_| receiver()), tracking);
		tracking.clone()
	}
}

impl<A> fmt::Debug for ProvidedAsset<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProvidedAsset")
			.field("rank", &self.rank)
			.field("lifetime", self.source.lifetime())
			.finish()
	}
}
