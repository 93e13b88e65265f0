use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use ctxreg_lifetime::Lifetime;
use indexmap::IndexMap;

use crate::source::{EventSource, Receiver};

struct Subscriber<T> {
	lifetime: Lifetime,
	receiver: RefCell<Receiver<T>>,
}

struct Inner<T> {
	lifetime: Lifetime,
	next_key: Cell<u64>,
	subscribers: RefCell<IndexMap<u64, Rc<Subscriber<T>>>>,
	queue: RefCell<VecDeque<T>>,
	dispatching: Cell<bool>,
}

/// Event emitter without replay.
///
/// Events are delivered to subscribers in attachment order. An event sent from
/// inside a receiver is queued and delivered once the current dispatch has
/// reached every subscriber, so no receiver is ever re-entered.
pub struct EventEmitter<T> {
	inner: Rc<Inner<T>>,
}

impl<T> Clone for EventEmitter<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: 'static> Default for EventEmitter<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static> EventEmitter<T> {
	/// Creates an emitter with its own lifetime.
	pub fn new() -> Self {
		let inner = Rc::new(Inner {
			lifetime: Lifetime::new(),
			next_key: Cell::new(0),
			subscribers: RefCell::new(IndexMap::new()),
			queue: RefCell::new(VecDeque::new()),
			dispatching: Cell::new(false),
		});
		let weak: Weak<Inner<T>> = Rc::downgrade(&inner);
		inner.lifetime.when_off(move |reason| {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			let subscribers: Vec<_> =
				inner.subscribers.borrow_mut().drain(..).map(|(_, s)| s).collect();
			inner.queue.borrow_mut().clear();
			for subscriber in subscribers {
				subscriber.lifetime.off_with(reason.clone());
			}
		});
		Self { inner }
	}

	/// Returns the emitter lifetime. Cutting it off detaches every subscriber,
	/// cutting their lifetimes off with the same reason.
	pub fn lifetime(&self) -> &Lifetime {
		&self.inner.lifetime
	}

	/// Cuts this emitter off once `lifetime` is.
	pub fn bind(&self, lifetime: &Lifetime) -> &Self {
		self.inner.lifetime.needs(lifetime);
		self
	}

	/// Returns the number of attached subscribers.
	pub fn len(&self) -> usize {
		self.inner.subscribers.borrow().len()
	}

	/// Returns true when nothing is attached.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Attaches a receiver until `lifetime` is cut off.
	pub fn on(&self, receiver: impl FnMut(&T) + 'static, lifetime: &Lifetime) {
		self.attach(Box::new(receiver), lifetime);
	}

	fn attach(&self, receiver: Receiver<T>, lifetime: &Lifetime) {
		if self.inner.lifetime.is_off() {
			if let Some(reason) = self.inner.lifetime.reason() {
				lifetime.off_with(reason);
			}
			return;
		}
		if lifetime.is_off() {
			return;
		}

		let key = self.inner.next_key.get();
		self.inner.next_key.set(key + 1);
		self.inner.subscribers.borrow_mut().insert(
			key,
			Rc::new(Subscriber {
				lifetime: lifetime.clone(),
				receiver: RefCell::new(receiver),
			}),
		);

		let weak = Rc::downgrade(&self.inner);
		lifetime.when_off(move |_| {
			if let Some(inner) = weak.upgrade() {
				inner.subscribers.borrow_mut().shift_remove(&key);
			}
		});
	}

	/// Pushes an event to every live subscriber.
	pub fn send(&self, event: T) {
		if self.inner.lifetime.is_off() {
			return;
		}
		self.inner.queue.borrow_mut().push_back(event);
		if self.inner.dispatching.replace(true) {
			tracing::trace!(queued = self.inner.queue.borrow().len(), "re-entrant send deferred");
			return;
		}

		loop {
			let Some(event) = self.inner.queue.borrow_mut().pop_front() else {
				break;
			};
			let subscribers: Vec<_> = self.inner.subscribers.borrow().values().cloned().collect();
			for subscriber in subscribers {
				if subscriber.lifetime.is_off() {
					continue;
				}
				(subscriber.receiver.borrow_mut())(&event);
			}
		}

		self.inner.dispatching.set(false);
	}
}

impl<T: 'static> EventSource<T> for EventEmitter<T> {
	fn subscribe(&self, receiver: Receiver<T>, lifetime: &Lifetime) {
		self.attach(receiver, lifetime);
	}
}

impl<T> fmt::Debug for EventEmitter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventEmitter")
			.field("lifetime", &self.inner.lifetime)
			.field("subscribers", &self.inner.subscribers.borrow().len())
			.finish()
	}
}
