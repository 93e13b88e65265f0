use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use ctxreg_lifetime::Lifetime;
use rustc_hash::FxHashMap;

use crate::placer::PlacerKey;

type CacheMap = FxHashMap<PlacerKey, Rc<dyn Any>>;

/// Per-builder memo of built providers, keyed by contribution.
///
/// A disabled cache stores nothing; peer builders use one.
#[derive(Clone, Default)]
pub(crate) struct BuildCache(Option<Rc<RefCell<CacheMap>>>);

impl BuildCache {
	pub(crate) fn new() -> Self {
		Self(Some(Rc::default()))
	}

	pub(crate) fn disabled() -> Self {
		Self(None)
	}

	pub(crate) fn get(&self, key: PlacerKey) -> Option<Rc<dyn Any>> {
		self.0.as_ref()?.borrow().get(&key).cloned()
	}

	/// Stores `value` until `lifetime` is cut off.
	pub(crate) fn put(&self, key: PlacerKey, value: Rc<dyn Any>, lifetime: &Lifetime) {
		let Some(map) = &self.0 else {
			return;
		};
		map.borrow_mut().insert(key, value);
		tracing::trace!(?key, "build cache filled");

		let map = Rc::downgrade(map);
		lifetime.when_off(move |_| {
			let Some(map) = map.upgrade() else {
				return;
			};
			let evicted = map.borrow_mut().remove(&key);
			if evicted.is_some() {
				tracing::trace!(?key, "build cache evicted");
			}
		});
	}

	pub(crate) fn clear(&self) {
		if let Some(map) = &self.0 {
			let cleared = std::mem::take(&mut *map.borrow_mut());
			tracing::trace!(entries = cleared.len(), "build cache cleared");
		}
	}

	pub(crate) fn len(&self) -> usize {
		self.0.as_ref().map_or(0, |map| map.borrow().len())
	}
}
