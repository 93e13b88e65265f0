use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ctxreg_lifetime::Lifetime;
use rustc_hash::FxHashMap;

use super::BuilderOptions;
use crate::asset::Asset;
use crate::cache::BuildCache;
use crate::entry::{Entry, EntryId};
use crate::error::{ContextError, CxError};
use crate::memo::Memo;
use crate::peer::PeerHandle;
use crate::record::EntryRecord;
use crate::request::Request;

type ContextFactory = Box<dyn FnOnce(&Rc<BuilderCore>) -> Rc<dyn Any>>;

/// A type-erased record and the lifetime it is anchored to.
struct RecordSlot {
	record: Rc<dyn Any>,
	lifetime: Lifetime,
}

pub(crate) enum ContextSlot {
	/// Peer builder: never constructs a context.
	Absent,
	Pending(ContextFactory),
	Building,
	Ready(Rc<dyn Any>),
}

/// State shared by every builder flavour: records, peers, cache, lifetime.
pub(crate) struct BuilderCore {
	label: Rc<str>,
	lifetime: Lifetime,
	peers: Rc<[PeerHandle]>,
	cache: BuildCache,
	records: RefCell<FxHashMap<EntryId, RecordSlot>>,
	rank_count: Memo<usize>,
	context: RefCell<ContextSlot>,
	this: Weak<BuilderCore>,
}

impl BuilderCore {
	pub(crate) fn new(
		options: BuilderOptions,
		default_label: &str,
		cache: BuildCache,
		context: ContextSlot,
	) -> Rc<Self> {
		let BuilderOptions {
			label,
			peers,
			lifetime,
		} = options;

		let core = Rc::new_cyclic(|this: &Weak<Self>| Self {
			label: label.unwrap_or_else(|| default_label.into()),
			lifetime: lifetime.unwrap_or_default(),
			peers: peers.into(),
			cache,
			records: RefCell::default(),
			rank_count: Memo::new(),
			context: RefCell::new(context),
			this: this.clone(),
		});

		let weak = Rc::downgrade(&core);
		core.lifetime.when_off(move |reason| {
			let Some(core) = weak.upgrade() else {
				return;
			};
			let records = std::mem::take(&mut *core.records.borrow_mut());
			tracing::debug!(
				builder = %core.label,
				records = records.len(),
				%reason,
				"builder disposed"
			);
			core.cache.clear();
			for slot in records.values() {
				slot.lifetime.off_with(reason.clone());
			}
		});
		core
	}

	pub(crate) fn label(&self) -> &str {
		&self.label
	}

	pub(crate) fn label_rc(&self) -> Rc<str> {
		self.label.clone()
	}

	pub(crate) fn lifetime(&self) -> &Lifetime {
		&self.lifetime
	}

	pub(crate) fn peers(&self) -> Rc<[PeerHandle]> {
		self.peers.clone()
	}

	pub(crate) fn cache(&self) -> &BuildCache {
		&self.cache
	}

	pub(crate) fn downgrade(&self) -> Weak<BuilderCore> {
		self.this.clone()
	}

	/// One for own contributions plus the rank counts of all peers.
	pub(crate) fn rank_count(&self) -> usize {
		self.rank_count
			.get_or_init(|| 1 + self.peers.iter().map(PeerHandle::rank_count).sum::<usize>())
	}

	pub(crate) fn record_count(&self) -> usize {
		self.records.borrow().len()
	}

	/// Returns the record of `entry`, creating it on first access.
	///
	/// Once the builder is disposed, every access gets a fresh record that is
	/// cut off already and is not kept.
	pub(crate) fn record<V: 'static, A: 'static>(
		&self,
		entry: &Entry<V, A>,
	) -> Rc<EntryRecord<V, A>> {
		let existing = self.records.borrow().get(&entry.id()).map(|slot| slot.record.clone());
		let record = match existing {
			Some(record) => record,
			None => {
				let created = EntryRecord::new(entry, self);
				let lifetime = created.lifetime().clone();
				let record: Rc<dyn Any> = created;
				if !lifetime.is_off() {
					let slot = RecordSlot {
						record: record.clone(),
						lifetime,
					};
					self.records.borrow_mut().insert(entry.id(), slot);
				}
				record
			}
		};
		match record.downcast::<EntryRecord<V, A>>() {
			Ok(record) => record,
			Err(_) => unreachable!("record of `{entry}` has a foreign type"),
		}
	}

	pub(crate) fn get<V: 'static, A: 'static>(
		&self,
		entry: &Entry<V, A>,
		request: Request<V>,
	) -> Result<Option<V>, CxError> {
		self.record(entry).get(request)
	}

	pub(crate) fn provide<V: 'static, A: 'static>(&self, asset: Asset<V, A>) -> Lifetime {
		self.record(asset.entry()).provide(asset)
	}

	/// Returns the context object, constructing it on first access.
	pub(crate) fn context<C: 'static>(self: &Rc<Self>) -> Result<Rc<C>, ContextError> {
		self.context_any()?
			.downcast::<C>()
			.map_err(|_| ContextError::WrongType {
				builder: self.label.clone(),
				expected: std::any::type_name::<C>(),
			})
	}

	fn context_any(self: &Rc<Self>) -> Result<Rc<dyn Any>, ContextError> {
		let slot = std::mem::replace(&mut *self.context.borrow_mut(), ContextSlot::Building);
		let (slot, result) = match slot {
			ContextSlot::Ready(context) => (ContextSlot::Ready(context.clone()), Ok(context)),
			ContextSlot::Absent => {
				(ContextSlot::Absent, Err(ContextError::PeerOnly(self.label.clone())))
			}
			ContextSlot::Building => (
				ContextSlot::Building,
				Err(ContextError::UnderConstruction(self.label.clone())),
			),
			ContextSlot::Pending(factory) => {
				let context = factory(self);
				tracing::trace!(builder = %self.label, "context constructed");
				(ContextSlot::Ready(context.clone()), Ok(context))
			}
		};
		*self.context.borrow_mut() = slot;
		result
	}
}

impl fmt::Debug for BuilderCore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BuilderCore")
			.field("label", &self.label)
			.field("lifetime", &self.lifetime)
			.field("peers", &self.peers)
			.field("records", &self.record_count())
			.field("cached", &self.cache.len())
			.finish()
	}
}
