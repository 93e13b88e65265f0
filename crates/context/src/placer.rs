//! Unified placement of direct and built contributions.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ctxreg_lifetime::Lifetime;

use crate::asset::{AssetKind, AssetSource, BuildFn, Collector, PlaceFn, Provider, Updater};
use crate::cache::BuildCache;
use crate::error::CxError;
use crate::target::Target;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of one registered contribution in build caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PlacerKey(u64);

impl PlacerKey {
	fn next() -> Self {
		Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
	}
}

enum PlacerKind<V, A> {
	Place(Rc<PlaceFn<V, A>>),
	Build {
		key: PlacerKey,
		build: Rc<BuildFn<V, A>>,
		updater: Updater,
	},
}

/// A registered contribution, ready to place assets for any target.
pub(crate) struct Placer<V, A> {
	kind: Rc<PlacerKind<V, A>>,
	lifetime: Lifetime,
}

impl<V, A> Clone for Placer<V, A> {
	fn clone(&self) -> Self {
		Self {
			kind: self.kind.clone(),
			lifetime: self.lifetime.clone(),
		}
	}
}

impl<V: 'static, A: 'static> Placer<V, A> {
	pub(crate) fn new(kind: AssetKind<V, A>, lifetime: &Lifetime) -> Self {
		let kind = match kind {
			AssetKind::Place(place) => PlacerKind::Place(place),
			AssetKind::Build(build) => PlacerKind::Build {
				key: PlacerKey::next(),
				build,
				updater: Updater::new(lifetime),
			},
		};
		Self {
			kind: Rc::new(kind),
			lifetime: lifetime.clone(),
		}
	}

	/// The contribution lifetime.
	pub(crate) fn lifetime(&self) -> &Lifetime {
		&self.lifetime
	}

	/// Places assets for `target`, building the provider into `cache` first when
	/// the contribution is a built one.
	pub(crate) fn place(
		&self,
		target: &Target<V, A>,
		cache: &BuildCache,
		collector: &mut Collector<'_, A>,
	) -> Result<(), CxError> {
		match &*self.kind {
			PlacerKind::Place(place) => place(target, collector),
			PlacerKind::Build {
				key,
				build,
				updater,
			} => {
				let cached = cache
					.get(*key)
					.and_then(|value| value.downcast_ref::<Option<Provider<A>>>().cloned());
				let provider = match cached {
					Some(provider) => provider,
					None => {
						let provider = build(target, updater)?;
						cache.put(*key, Rc::new(provider.clone()), &self.lifetime);
						provider
					}
				};
				match provider {
					Some(provider) => provider.place(collector),
					None => Ok(()),
				}
			}
		}
	}

	pub(crate) fn on_update(&self, receiver: Box<dyn FnMut(&())>, tracking: &Lifetime) {
		if let PlacerKind::Build { updater, .. } = &*self.kind {
			updater.on(receiver, tracking);
		}
	}
}

/// A contribution bound to the target and cache it is tracked for.
pub(crate) struct PlacedAsset<V, A> {
	pub(crate) target: Target<V, A>,
	pub(crate) cache: BuildCache,
	pub(crate) placer: Placer<V, A>,
	pub(crate) lifetime: Lifetime,
}

impl<V: 'static, A: 'static> AssetSource<A> for PlacedAsset<V, A> {
	fn lifetime(&self) -> &Lifetime {
		&self.lifetime
	}

	fn each_asset(&self, collector: &mut Collector<'_, A>) -> Result<(), CxError> {
		self.placer.place(&self.target, &self.cache, collector)
	}

	fn on_update(&self, receiver: Box<dyn FnMut(&())>, tracking: &Lifetime) {
		tracking.needs(&self.lifetime);
		self.placer.on_update(receiver, tracking);
	}
}
