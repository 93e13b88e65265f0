use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ctxreg_events::EventSource;
use ctxreg_lifetime::Lifetime;

use crate::asset::{Asset, Provider, Updater};
use crate::entry::Entry;
use crate::target::Target;

/// Receives asset lists pushed by a tracking contribution.
///
/// Each [`send`](Self::send) replaces the assets placed by the contribution.
pub struct AssetSink<A> {
	assets: Rc<RefCell<Rc<[A]>>>,
	updater: Rc<RefCell<Option<Updater>>>,
	lifetime: Lifetime,
}

impl<A> Clone for AssetSink<A> {
	fn clone(&self) -> Self {
		Self {
			assets: self.assets.clone(),
			updater: self.updater.clone(),
			lifetime: self.lifetime.clone(),
		}
	}
}

impl<A: Clone + 'static> AssetSink<A> {
	fn new(updater: &Updater, context: &Lifetime) -> Self {
		let lifetime = Lifetime::new();
		lifetime.needs(updater.lifetime()).needs(context);
		Self {
			assets: Rc::new(RefCell::new(Rc::from(Vec::new()))),
			updater: Rc::default(),
			lifetime,
		}
	}

	/// Replaces the current assets. Ignored once the sink lifetime is off.
	pub fn send(&self, assets: impl IntoIterator<Item = A>) {
		if self.lifetime.is_off() {
			return;
		}
		*self.assets.borrow_mut() = assets.into_iter().collect();
		let updater = self.updater.borrow().clone();
		if let Some(updater) = updater {
			updater.update();
		}
	}

	/// Cut off once the contribution is revoked or its context disposed.
	pub fn lifetime(&self) -> &Lifetime {
		&self.lifetime
	}

	/// Starts signalling updates and returns the provider placing the current
	/// assets. Lists sent before this call are placed without an update signal.
	fn start(self, updater: &Updater) -> Provider<A> {
		*self.updater.borrow_mut() = Some(updater.clone());
		let assets = self.assets;
		Provider::new(move |collector| {
			let current = assets.borrow().clone();
			for asset in current.iter() {
				if collector(asset.clone()).is_stop() {
					break;
				}
			}
			Ok(())
		})
	}
}

impl<A> fmt::Debug for AssetSink<A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AssetSink")
			.field("assets", &self.assets.borrow().len())
			.field("lifetime", &self.lifetime)
			.finish()
	}
}

/// Contribution fed by `track`, started at most once per requesting context.
///
/// `track` receives the sink to push asset lists to and the lifetime to stop
/// pushing at.
pub fn track_asset<V: 'static, A: Clone + 'static>(
	entry: &Entry<V, A>,
	track: impl Fn(&Target<V, A>, AssetSink<A>, &Lifetime) + 'static,
) -> Asset<V, A> {
	Asset::build(entry, move |target, updater| {
		let sink = AssetSink::new(updater, target.lifetime());
		let tracking = sink.lifetime().clone();
		track(target, sink.clone(), &tracking);
		Ok(Some(sink.start(updater)))
	})
}

/// Contribution placing the latest asset list emitted by a per-context event
/// source. `source` returning `None` places nothing in that context.
pub fn on_asset<V: 'static, A: Clone + 'static, S: EventSource<Vec<A>>>(
	entry: &Entry<V, A>,
	source: impl Fn(&Target<V, A>) -> Option<S> + 'static,
) -> Asset<V, A> {
	Asset::build(entry, move |target, updater| {
		let Some(source) = source(target) else {
			return Ok(None);
		};
		let sink = AssetSink::new(updater, target.lifetime());
		let receiver = sink.clone();
		source.subscribe(
			Box::new(move |assets: &Vec<A>| receiver.send(assets.iter().cloned())),
			sink.lifetime(),
		);
		Ok(Some(sink.start(updater)))
	})
}
