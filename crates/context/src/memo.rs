use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ctxreg_lifetime::Lifetime;

/// Compute-on-first-access cell with explicit invalidation.
///
/// No borrow is held while the value is computed, so the initializer may read
/// the memo (or anything else that reads it) re-entrantly. When that happens,
/// the value stored first wins.
pub struct Memo<T> {
	value: RefCell<Option<T>>,
}

impl<T> Default for Memo<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Memo<T> {
	pub const fn new() -> Self {
		Self {
			value: RefCell::new(None),
		}
	}

	/// Forgets the stored value; the next access recomputes it.
	pub fn invalidate(&self) {
		self.value.borrow_mut().take();
	}

	pub fn is_set(&self) -> bool {
		self.value.borrow().is_some()
	}
}

impl<T: Clone> Memo<T> {
	pub fn get(&self) -> Option<T> {
		self.value.borrow().clone()
	}

	pub fn get_or_init(&self, init: impl FnOnce() -> T) -> T {
		if let Some(value) = self.get() {
			return value;
		}
		let value = init();
		self.value.borrow_mut().get_or_insert(value).clone()
	}

	/// Like [`get_or_init`](Self::get_or_init), but failures are not stored.
	pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
		if let Some(value) = self.get() {
			return Ok(value);
		}
		let value = init()?;
		Ok(self.value.borrow_mut().get_or_insert(value).clone())
	}
}

impl<T: 'static> Memo<T> {
	/// Invalidates the memo once `lifetime` is cut off.
	pub fn invalidate_when_off(self: &Rc<Self>, lifetime: &Lifetime) {
		let memo = Rc::downgrade(self);
		lifetime.when_off(move |_| {
			if let Some(memo) = memo.upgrade() {
				memo.invalidate();
			}
		});
	}
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Memo").field(&*self.value.borrow()).finish()
	}
}
