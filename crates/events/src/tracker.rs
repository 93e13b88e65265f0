use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ctxreg_lifetime::Lifetime;

use crate::emitter::EventEmitter;
use crate::source::{EventSource, Receiver};

struct Inner<T> {
	value: RefCell<T>,
	on: EventEmitter<T>,
}

/// Current value plus change notifications.
///
/// Readers receive the current value synchronously on subscription, then every
/// value passed to [`set`](Self::set).
pub struct ValueTracker<T> {
	inner: Rc<Inner<T>>,
}

impl<T> Clone for ValueTracker<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Clone + Default + 'static> Default for ValueTracker<T> {
	fn default() -> Self {
		Self::new(T::default())
	}
}

impl<T: Clone + 'static> ValueTracker<T> {
	pub fn new(value: T) -> Self {
		Self {
			inner: Rc::new(Inner {
				value: RefCell::new(value),
				on: EventEmitter::new(),
			}),
		}
	}

	/// Returns a clone of the current value.
	pub fn get(&self) -> T {
		self.inner.value.borrow().clone()
	}

	/// Inspects the current value without cloning.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.inner.value.borrow())
	}

	/// Replaces the current value and notifies every reader, even when the new
	/// value equals the old one.
	pub fn set(&self, value: T) {
		*self.inner.value.borrow_mut() = value.clone();
		self.inner.on.send(value);
	}

	/// Replays the current value to `receiver`, then follows updates until
	/// `lifetime` is off.
	pub fn read(&self, receiver: impl FnMut(&T) + 'static, lifetime: &Lifetime) {
		self.attach(Box::new(receiver), lifetime);
	}

	/// Returns the lifetime of the underlying emitter.
	pub fn lifetime(&self) -> &Lifetime {
		self.inner.on.lifetime()
	}

	/// Stops notifying readers once `lifetime` is off.
	pub fn bind(&self, lifetime: &Lifetime) -> &Self {
		self.inner.on.bind(lifetime);
		self
	}

	fn attach(&self, mut receiver: Receiver<T>, lifetime: &Lifetime) {
		if lifetime.is_off() || self.lifetime().is_off() {
			return;
		}
		let current = self.get();
		receiver(&current);
		self.inner.on.subscribe(receiver, lifetime);
	}
}

impl<T: Clone + 'static> EventSource<T> for ValueTracker<T> {
	fn subscribe(&self, receiver: Receiver<T>, lifetime: &Lifetime) {
		self.attach(receiver, lifetime);
	}
}

impl<T: fmt::Debug> fmt::Debug for ValueTracker<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ValueTracker")
			.field("value", &*self.inner.value.borrow())
			.field("on", &self.inner.on)
			.finish()
	}
}
