use std::fmt;
use std::rc::Rc;

use super::tracked::{self, DefaultFn};
use crate::asset::Evaluated;
use crate::by_rank;
use crate::entry::Entry;
use crate::error::{CxError, ReferenceError};
use crate::target::Target;

/// How a [`recent_with`] entry converts its most recent asset.
pub struct RecentOptions<V, A> {
	create: Rc<dyn Fn(A, &Target<V, A>) -> V>,
	by_default: Option<DefaultFn<V, A>>,
}

impl<V, A> Clone for RecentOptions<V, A> {
	fn clone(&self) -> Self {
		Self {
			create: self.create.clone(),
			by_default: self.by_default.clone(),
		}
	}
}

impl<V, A> RecentOptions<V, A> {
	pub fn new(create: impl Fn(A, &Target<V, A>) -> V + 'static) -> Self {
		Self {
			create: Rc::new(create),
			by_default: None,
		}
	}

	/// Value used while nothing is provided, reported as a default.
	pub fn by_default(mut self, by_default: impl Fn(&Target<V, A>) -> V + 'static) -> Self {
		self.by_default = Some(Rc::new(by_default));
		self
	}
}

impl<V, A> fmt::Debug for RecentOptions<V, A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RecentOptions")
			.field("by_default", &self.by_default.is_some())
			.finish()
	}
}

/// Entry following the most recent asset: own contributions first, newest
/// first, then peers.
pub fn recent<T: Clone + 'static>(name: impl Into<Rc<str>>) -> Entry<T> {
	recent_with(name, RecentOptions::new(|asset, _| asset))
}

pub fn recent_or<T: Clone + 'static>(
	name: impl Into<Rc<str>>,
	by_default: impl Fn(&Target<T>) -> T + 'static,
) -> Entry<T> {
	recent_with(name, RecentOptions::new(|asset, _| asset).by_default(by_default))
}

/// Entry following the most recent asset, converted with `options`.
///
/// The value is recomputed only when the most recent asset changes. Once the
/// context is disposed, requests fail with an "is unavailable" error carrying
/// the disposal reason.
pub fn recent_with<V: Clone + 'static, A: Clone + 'static>(
	name: impl Into<Rc<str>>,
	options: RecentOptions<V, A>,
) -> Entry<V, A> {
	Entry::new(name, move |target: &Target<V, A>| {
		let create = options.create.clone();
		tracked::define(
			target,
			options.by_default.clone(),
			ReferenceError::unavailable,
			|state, tracking| {
				let ranks = by_rank::assets_by_rank(target, tracking);
				let convert = {
					let owner = target.clone();
					Rc::new(move |recent: Option<Evaluated<A>>| {
						recent.map(|evaluated| create(evaluated.asset().clone(), &owner))
					})
				};
				let owner = target.clone();
				let push = convert.clone();
				by_rank::follow_recent(
					&ranks,
					move |recent| tracked::update(&state, owner.entry(), recent.map(&*push)),
					tracking,
				);
				Box::new(move || -> Result<Option<V>, CxError> {
					Ok(convert(by_rank::recent_of(&ranks.get())?))
				})
			},
		)
	})
}
