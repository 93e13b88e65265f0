use std::rc::Rc;

use ctxreg_lifetime::Lifetime;

/// Boxed event receiver.
pub type Receiver<T> = Box<dyn FnMut(&T)>;

/// A source of events.
///
/// A fresh subscriber may receive zero or more events synchronously during
/// [`subscribe`](Self::subscribe), then every event pushed afterwards until
/// `lifetime` is cut off.
pub trait EventSource<T> {
	/// Attaches `receiver` for as long as `lifetime` is live.
	fn subscribe(&self, receiver: Receiver<T>, lifetime: &Lifetime);
}

impl<T, S: EventSource<T> + ?Sized> EventSource<T> for Rc<S> {
	fn subscribe(&self, receiver: Receiver<T>, lifetime: &Lifetime) {
		(**self).subscribe(receiver, lifetime);
	}
}
