//! Values kept current by asset tracking.

use std::cell::RefCell;
use std::rc::Rc;

use ctxreg_lifetime::{Lifetime, OffReason};

use crate::entry::{Assigner, Definition, Entry};
use crate::error::{CxError, ReferenceError};
use crate::request::RequestMethod;
use crate::target::Target;

pub(super) type DefaultFn<V, A> = Rc<dyn Fn(&Target<V, A>) -> V>;

/// Failure reported once tracking stopped.
pub(super) type Disposed<V, A> = fn(&Entry<V, A>, OffReason) -> ReferenceError;

#[derive(Clone)]
pub(super) enum State<V> {
	Value(V),
	Empty,
	Failed(CxError),
	Unavailable(OffReason),
}

pub(super) type SharedState<V> = Rc<RefCell<State<V>>>;

/// Recomputes the value from the contributions tracked last.
pub(super) type Refresh<V> = Box<dyn Fn() -> Result<Option<V>, CxError>>;

/// Stores the latest tracked value.
///
/// Failures cannot be returned to anyone from the push path; they are logged
/// and stored. A request finding a stored failure recomputes the value first.
pub(super) fn update<V, A>(
	state: &SharedState<V>,
	entry: &Entry<V, A>,
	next: Result<Option<V>, CxError>,
) {
	let next = match next {
		Ok(Some(value)) => State::Value(value),
		Ok(None) => State::Empty,
		Err(error) => {
			tracing::warn!(%entry, %error, "tracked asset evaluation failed");
			State::Failed(error)
		}
	};
	*state.borrow_mut() = next;
}

/// Definition serving the value written by `track` until the target lifetime
/// is cut off.
///
/// `track` subscribes with the given tracking lifetime, writes every change
/// with [`update`] and returns how to recompute the value after a failure.
pub(super) fn define<V: Clone + 'static, A: 'static>(
	target: &Target<V, A>,
	by_default: Option<DefaultFn<V, A>>,
	disposed: Disposed<V, A>,
	track: impl FnOnce(SharedState<V>, &Lifetime) -> Refresh<V>,
) -> Definition<V> {
	let state: SharedState<V> = Rc::new(RefCell::new(State::Empty));
	let tracking = target.lifetime().derive();
	let refresh = track(state.clone(), &tracking);
	let off = state.clone();
	tracking.when_off(move |reason| *off.borrow_mut() = State::Unavailable(reason.clone()));

	let assign = {
		let state = state.clone();
		let by_default = by_default.clone();
		let target = target.clone();
		move |assigner: &mut Assigner<V>| {
			if matches!(*state.borrow(), State::Failed(_)) {
				update(&state, target.entry(), refresh());
			}
			let current = state.borrow().clone();
			match current {
				State::Value(value) => assigner.assign(value),
				State::Empty => {
					if let Some(by_default) = &by_default {
						assigner.assign_by(by_default(&target), RequestMethod::Defaults);
					}
				}
				State::Failed(error) => return Err(error),
				State::Unavailable(reason) => return Err(disposed(target.entry(), reason).into()),
			}
			Ok(())
		}
	};

	let target = target.clone();
	Definition::new().assign(assign).assign_default(move |assigner| {
		if let Some(reason) = tracking.reason() {
			return Err(disposed(target.entry(), reason).into());
		}
		if let Some(by_default) = &by_default {
			assigner.assign(by_default(&target));
		}
		Ok(())
	})
}
