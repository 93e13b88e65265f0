use std::fmt;
use std::rc::Rc;

use super::tracked::{self, DefaultFn};
use crate::asset::ProvidedAsset;
use crate::by_rank;
use crate::entry::Entry;
use crate::error::{CxError, ReferenceError};
use crate::flow::Flow;
use crate::target::Target;

/// How a [`dynamic_with`] entry converts the list of all assets.
pub struct DynamicOptions<V, A> {
	create: Rc<dyn Fn(Vec<A>, &Target<V, A>) -> V>,
	by_default: Option<DefaultFn<V, A>>,
}

impl<V, A> Clone for DynamicOptions<V, A> {
	fn clone(&self) -> Self {
		Self {
			create: self.create.clone(),
			by_default: self.by_default.clone(),
		}
	}
}

impl<V, A> DynamicOptions<V, A> {
	/// `create` receives a non-empty asset list.
	pub fn new(create: impl Fn(Vec<A>, &Target<V, A>) -> V + 'static) -> Self {
		Self {
			create: Rc::new(create),
			by_default: None,
		}
	}

	pub fn by_default(mut self, by_default: impl Fn(&Target<V, A>) -> V + 'static) -> Self {
		self.by_default = Some(Rc::new(by_default));
		self
	}
}

impl<V, A> fmt::Debug for DynamicOptions<V, A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DynamicOptions")
			.field("by_default", &self.by_default.is_some())
			.finish()
	}
}

/// Entry holding every asset, furthest peer first, registration order within
/// a builder. Defaults to an empty list.
pub fn dynamic<A: Clone + 'static>(name: impl Into<Rc<str>>) -> Entry<Vec<A>, A> {
	dynamic_with(name, DynamicOptions::new(|assets, _| assets).by_default(|_| Vec::new()))
}

/// Entry holding every asset, converted with `options`.
///
/// Once the context is disposed, requests fail with an "is no longer available"
/// error carrying the disposal reason.
pub fn dynamic_with<V: Clone + 'static, A: 'static>(
	name: impl Into<Rc<str>>,
	options: DynamicOptions<V, A>,
) -> Entry<V, A> {
	Entry::new(name, move |target: &Target<V, A>| {
		let create = options.create.clone();
		tracked::define(
			target,
			options.by_default.clone(),
			ReferenceError::no_longer_available,
			|state, tracking| {
				let ranks = by_rank::assets_by_rank(target, tracking);
				let owner = target.clone();
				let push = create.clone();
				ranks.read(
					move |ranks| {
						let next = collect(&by_rank::flatten(ranks), &*push, &owner);
						tracked::update(&state, owner.entry(), next);
					},
					tracking,
				);
				let owner = target.clone();
				Box::new(move || collect(&by_rank::flatten(&ranks.get()), &*create, &owner))
			},
		)
	})
}

/// Converts the assets of `list`; `None` when there are none.
fn collect<V, A: 'static>(
	list: &[ProvidedAsset<A>],
	create: &dyn Fn(Vec<A>, &Target<V, A>) -> V,
	target: &Target<V, A>,
) -> Result<Option<V>, CxError> {
	let mut assets = Vec::new();
	for provided in list {
		provided.each_asset(|asset| {
			assets.push(asset);
			Flow::Continue
		})?;
	}
	Ok((!assets.is_empty()).then(|| create(assets, target)))
}
