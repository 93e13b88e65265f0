use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use slab::Slab;

use crate::OffReason;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`Lifetime`].
///
/// Stable for the lifetime of the token; suitable as an ordered map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LifetimeId(u64);

impl LifetimeId {
	fn next() -> Self {
		Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the underlying u64 value.
	#[inline]
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for LifetimeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Handle to a registered off-callback, see [`Lifetime::forget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(usize);

type OffCallback = Box<dyn FnOnce(&OffReason)>;

enum State {
	Live(Slab<(u64, OffCallback)>),
	Off(OffReason),
}

struct Inner {
	id: LifetimeId,
	seq: Cell<u64>,
	state: RefCell<State>,
}

/// Cancellable token.
///
/// Cloning yields another handle to the same token.
#[derive(Clone)]
pub struct Lifetime(Rc<Inner>);

impl Default for Lifetime {
	fn default() -> Self {
		Self::new()
	}
}

impl Lifetime {
	/// Creates a live token.
	pub fn new() -> Self {
		Self(Rc::new(Inner {
			id: LifetimeId::next(),
			seq: Cell::new(0),
			state: RefCell::new(State::Live(Slab::new())),
		}))
	}

	/// Creates a live token that is cut off together with `self`.
	pub fn derive(&self) -> Self {
		let child = Self::new();
		child.needs(self);
		child
	}

	/// Returns the token identifier.
	#[inline]
	pub fn id(&self) -> LifetimeId {
		self.0.id
	}

	/// Returns true once the token is cut off.
	pub fn is_off(&self) -> bool {
		matches!(*self.0.state.borrow(), State::Off(_))
	}

	/// Returns the cut off reason, or `None` while the token is live.
	pub fn reason(&self) -> Option<OffReason> {
		match &*self.0.state.borrow() {
			State::Off(reason) => Some(reason.clone()),
			State::Live(_) => None,
		}
	}

	/// Registers a callback invoked once this token is cut off.
	///
	/// The callback runs immediately when the token is off already, in which
	/// case `None` is returned.
	pub fn when_off(&self, callback: impl FnOnce(&OffReason) + 'static) -> Option<Subscription> {
		let reason = {
			let mut state = self.0.state.borrow_mut();
			match &mut *state {
				State::Live(callbacks) => {
					let seq = self.0.seq.get();
					self.0.seq.set(seq + 1);
					let callback: OffCallback = Box::new(callback);
					return Some(Subscription(callbacks.insert((seq, callback))));
				}
				State::Off(reason) => reason.clone(),
			}
		};
		callback(&reason);
		None
	}

	/// Drops a callback registered with [`when_off`](Self::when_off) without calling it.
	pub fn forget(&self, subscription: Subscription) {
		if let State::Live(callbacks) = &mut *self.0.state.borrow_mut() {
			callbacks.try_remove(subscription.0);
		}
	}

	/// Makes this token depend on `other`: cutting `other` off cuts this one off
	/// with the same reason.
	pub fn needs(&self, other: &Lifetime) -> &Self {
		if self.0.id == other.0.id {
			return self;
		}
		let dependent = Rc::downgrade(&self.0);
		let hook = other.when_off(move |reason| {
			if let Some(inner) = dependent.upgrade() {
				Lifetime(inner).cut(reason.clone());
			}
		});
		if let Some(hook) = hook {
			let parent: Weak<Inner> = Rc::downgrade(&other.0);
			self.when_off(move |_| {
				if let Some(inner) = parent.upgrade() {
					Lifetime(inner).forget(hook);
				}
			});
		}
		self
	}

	/// Cuts this token off without a reason.
	pub fn off(&self) {
		self.cut(OffReason::none());
	}

	/// Cuts this token off because of `error`.
	pub fn off_because(&self, error: impl Error + 'static) {
		self.cut(OffReason::from_error(error));
	}

	/// Cuts this token off with the given reason.
	///
	/// Does nothing when the token is off already; the first reason sticks.
	pub fn off_with(&self, reason: OffReason) {
		self.cut(reason);
	}

	fn cut(&self, reason: OffReason) {
		let callbacks = {
			let mut state = self.0.state.borrow_mut();
			if matches!(*state, State::Off(_)) {
				return;
			}
			match std::mem::replace(&mut *state, State::Off(reason.clone())) {
				State::Live(callbacks) => callbacks,
				State::Off(_) => return,
			}
		};

		let mut callbacks: Vec<_> = callbacks.into_iter().map(|(_, entry)| entry).collect();
		callbacks.sort_unstable_by_key(|(seq, _)| *seq);
		tracing::trace!(
			lifetime = %self.0.id,
			%reason,
			callbacks = callbacks.len(),
			"lifetime cut off"
		);

		for (_, callback) in callbacks {
			callback(&reason);
		}
	}
}

impl PartialEq for Lifetime {
	fn eq(&self, other: &Self) -> bool {
		self.0.id == other.0.id
	}
}

impl Eq for Lifetime {}

impl Hash for Lifetime {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.id.hash(state);
	}
}

impl fmt::Debug for Lifetime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lifetime")
			.field("id", &self.0.id)
			.field("reason", &self.reason())
			.finish()
	}
}
