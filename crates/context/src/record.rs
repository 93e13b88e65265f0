//! Per-(entry, builder) runtime state.
//!
//! A record owns the contributions registered for one entry in one builder, the
//! trackers following them, and the lazily built [`Definition`]. It implements
//! the value precedence ladder and the pull (iteration) and push (tracking)
//! halves of asset delivery.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ctxreg_events::EventEmitter;
use ctxreg_lifetime::Lifetime;
use indexmap::IndexMap;

use crate::asset::{Asset, Collector, ProvidedAsset};
use crate::builder::BuilderCore;
use crate::cache::BuildCache;
use crate::entry::{Definition, Entry};
use crate::error::{CxError, ReferenceError};
use crate::flow::Flow;
use crate::memo::Memo;
use crate::peer::PeerHandle;
use crate::placer::{PlacedAsset, Placer};
use crate::request::{Request, RequestMethod, Resolution};
use crate::target::Target;


/// Delivers contributions to one tracker.
struct Sender<V, A> {
	target: Target<V, A>,
	cache: BuildCache,
	emitter: EventEmitter<ProvidedAsset<A>>,
	tracking: Lifetime,
}

impl<V, A> Clone for Sender<V, A> {
	fn clone(&self) -> Self {
		Self {
			target: self.target.clone(),
			cache: self.cache.clone(),
			emitter: self.emitter.clone(),
			tracking: self.tracking.clone(),
		}
	}
}

impl<V: 'static, A: 'static> Sender<V, A> {
	fn send(&self, placer: &Placer<V, A>) {
		let lifetime = Lifetime::new();
		if lifetime.needs(placer.lifetime()).needs(&self.tracking).is_off() {
			return;
		}
		let source = PlacedAsset {
			target: self.target.clone(),
			cache: self.cache.clone(),
			placer: placer.clone(),
			lifetime,
		};
		self.emitter.send(ProvidedAsset::new(Rc::new(source), 0));
	}
}

pub(crate) struct EntryRecord<V, A> {
	entry: Entry<V, A>,
	builder: Weak<BuilderCore>,
	label: Rc<str>,
	peers: Rc<[PeerHandle]>,
	cache: BuildCache,
	lifetime: Lifetime,
	target: Target<V, A>,
	definition: Memo<Rc<Definition<V>>>,
	next_key: Cell<u64>,
	placers: RefCell<IndexMap<u64, Placer<V, A>>>,
	senders: RefCell<IndexMap<u64, Sender<V, A>>>,
	this: Weak<Self>,
}

impl<V: 'static, A: 'static> EntryRecord<V, A> {
	pub(crate) fn new(entry: &Entry<V, A>, core: &BuilderCore) -> Rc<Self> {
		let lifetime = core.lifetime().derive();
		let target_lifetime = lifetime.derive();
		Rc::new_cyclic(|this: &Weak<Self>| Self {
			entry: entry.clone(),
			builder: core.downgrade(),
			label: core.label_rc(),
			peers: core.peers(),
			cache: core.cache().clone(),
			lifetime,
			target: Target::new(entry.clone(), this.clone(), target_lifetime),
			definition: Memo::new(),
			next_key: Cell::new(0),
			placers: RefCell::default(),
			senders: RefCell::default(),
			this: this.clone(),
		})
	}

	/// Target the definition is built with.
	pub(crate) fn target(&self) -> &Target<V, A> {
		&self.target
	}

	/// Cut off with the builder; the definition target is cut off with it.
	pub(crate) fn lifetime(&self) -> &Lifetime {
		&self.lifetime
	}

	pub(crate) fn builder(&self) -> Option<Rc<BuilderCore>> {
		self.builder.upgrade()
	}

	pub(crate) fn builder_weak(&self) -> &Weak<BuilderCore> {
		&self.builder
	}

	pub(crate) fn cache(&self) -> &BuildCache {
		&self.cache
	}

	fn next_key(&self) -> u64 {
		let key = self.next_key.get();
		self.next_key.set(key + 1);
		key
	}

	fn definition(&self) -> Rc<Definition<V>> {
		self.definition.get_or_init(|| {
			tracing::trace!(builder = %self.label, entry = %self.entry, "definition built");
			Rc::new(self.entry.define(&self.target))
		})
	}

	/// Resolves the value of the entry for `request`.
	pub(crate) fn get(&self, request: Request<V>) -> Result<Option<V>, CxError> {
		let has_fallback = request.has_fallback();
		let Request {
			by, or, observe, ..
		} = request;

		let (value, method) = match self.resolve(by, has_fallback)? {
			Resolution::Value(value, method) => (value, method),
			Resolution::Fallback => match or {
				Some(fallback) => (fallback, RequestMethod::Fallback),
				None => return Ok(None),
			},
		};
		if let Some(observe) = observe {
			observe(&value, method);
		}
		Ok(Some(value))
	}

	fn resolve(&self, by: RequestMethod, has_fallback: bool) -> Result<Resolution<V>, CxError> {
		let definition = self.definition();
		let mut received = None;

		if by != RequestMethod::Defaults {
			match definition.run_assign(by, has_fallback)? {
				Some((value, method)) if method != RequestMethod::Defaults => {
					return Ok(Resolution::Value(value, method));
				}
				Some(_) if by == RequestMethod::Assets && !has_fallback => {
					return Err(ReferenceError::no_value_provided(&self.entry).into());
				}
				Some(defaulted) => received = Some(defaulted),
				None => {}
			}
			if has_fallback {
				return Ok(Resolution::Fallback);
			}
		}

		if received.is_none() {
			if definition.has_assign_default() {
				received = definition.run_assign_default(by, has_fallback)?;
			} else if by == RequestMethod::Defaults {
				received = definition.run_assign(by, has_fallback)?;
			}
		}

		if let Some((value, method)) = received {
			if method != RequestMethod::Assets {
				return Ok(Resolution::Value(value, method));
			}
			if !has_fallback {
				if by == RequestMethod::Defaults {
					return Err(ReferenceError::no_default(&self.entry).into());
				}
				return Ok(Resolution::Value(value, method));
			}
		}

		if by == RequestMethod::Defaults && has_fallback {
			return Ok(Resolution::Fallback);
		}
		Err(ReferenceError::no_value(&self.entry).into())
	}

	/// Registers a contribution. Returns its lifetime.
	pub(crate) fn provide(&self, asset: Asset<V, A>) -> Lifetime {
		let Asset {
			lifetime, kind, setup, ..
		} = asset;
		let lifetime = lifetime.unwrap_or_default();
		if lifetime.needs(&self.lifetime).is_off() {
			return lifetime;
		}

		let placer = Placer::new(kind, &lifetime);
		let key = self.next_key();
		self.placers.borrow_mut().insert(key, placer.clone());
		let this = self.this.clone();
		lifetime.when_off(move |_| {
			if let Some(record) = this.upgrade() {
				record.placers.borrow_mut().shift_remove(&key);
			}
		});
		tracing::trace!(
			builder = %self.label,
			entry = %self.entry,
			lifetime = %lifetime.id(),
			"asset provided"
		);

		let senders: Vec<_> = self.senders.borrow().values().cloned().collect();
		for sender in &senders {
			sender.send(&placer);
		}

		if let Some(setup) = setup {
			setup(&Target::new(self.entry.clone(), self.this.clone(), lifetime.clone()));
		}
		lifetime
	}

	fn live_placers(&self) -> Vec<Placer<V, A>> {
		self.placers
			.borrow()
			.values()
			.filter(|placer| !placer.lifetime().is_off())
			.cloned()
			.collect()
	}

	/// Visits peer assets in listed order, then own assets in registration order.
	pub(crate) fn each_asset(
		&self,
		target: &Target<V, A>,
		cache: &BuildCache,
		callback: &mut Collector<'_, A>,
	) -> Result<(), CxError> {
		if target.lifetime().is_off() {
			return Ok(());
		}
		let go_on = Cell::new(true);
		let mut collector = guard(target, &go_on, callback);

		for peer in self.peers.iter() {
			peer.each_asset(target, cache, &mut collector)?;
			if !go_on.get() {
				return Ok(());
			}
		}
		for placer in self.live_placers() {
			placer.place(target, cache, &mut collector)?;
			if !go_on.get() {
				break;
			}
		}
		Ok(())
	}

	/// Visits own assets newest first, then peers in reverse listed order, each
	/// reporting its own assets newest first.
	pub(crate) fn each_recent_asset(
		&self,
		target: &Target<V, A>,
		cache: &BuildCache,
		callback: &mut Collector<'_, A>,
	) -> Result<(), CxError> {
		if target.lifetime().is_off() {
			return Ok(());
		}
		let go_on = Cell::new(true);
		let mut collector = guard(target, &go_on, callback);

		for placer in self.live_placers().into_iter().rev() {
			let mut assets = Vec::new();
			placer.place(target, cache, &mut |asset| {
				if target.lifetime().is_off() {
					return Flow::Stop;
				}
				assets.push(asset);
				Flow::Continue
			})?;
			for asset in assets.into_iter().rev() {
				if collector(asset).is_stop() {
					return Ok(());
				}
			}
		}
		for peer in self.peers.iter().rev() {
			peer.each_recent_asset(target, cache, &mut collector)?;
			if !go_on.get() {
				return Ok(());
			}
		}
		Ok(())
	}

	/// Replays current contributions to `receiver`, then delivers each new one
	/// until `tracking` is cut off.
	pub(crate) fn track_assets(
		&self,
		target: &Target<V, A>,
		cache: &BuildCache,
		receiver: Box<dyn FnMut(&ProvidedAsset<A>)>,
		tracking: &Lifetime,
	) {
		let emitter = EventEmitter::new();
		emitter.bind(target.lifetime());
		emitter.on(receiver, tracking);
		if tracking.is_off() {
			return;
		}

		let sender = Sender {
			target: target.clone(),
			cache: cache.clone(),
			emitter: emitter.clone(),
			tracking: tracking.clone(),
		};
		let key = self.next_key();
		self.senders.borrow_mut().insert(key, sender.clone());
		let this = self.this.clone();
		tracking.when_off(move |_| {
			if let Some(record) = this.upgrade() {
				record.senders.borrow_mut().shift_remove(&key);
			}
		});

		let mut rank_offset = 1;
		for peer in self.peers.iter().rev() {
			let first_rank = rank_offset;
			rank_offset += peer.rank_count();
			let emitter = emitter.clone();
			peer.track_assets(
				target,
				cache,
				Box::new(move |provided: &ProvidedAsset<A>| {
					emitter.send(provided.with_rank(first_rank + provided.rank()));
				}),
				tracking,
			);
		}

		for placer in self.live_placers() {
			sender.send(&placer);
		}
	}
}

/// Wraps `callback` so that iteration stops once it returns [`Flow::Stop`] or
/// the target lifetime is cut off, recording the outcome in `go_on`.
fn guard<'a, 'b: 'a, V, A>(
	target: &'a Target<V, A>,
	go_on: &'a Cell<bool>,
	callback: &'a mut Collector<'b, A>,
) -> impl FnMut(A) -> Flow + 'a {
	move |asset| {
		let live = !target.lifetime().is_off()
			&& callback(asset).is_continue()
			&& !target.lifetime().is_off();
		go_on.set(live);
		Flow::from(live)
	}
}
