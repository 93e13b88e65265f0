//! Rank-bucketed view of tracked contributions.

use std::rc::Rc;

use ctxreg_events::ValueTracker;
use ctxreg_lifetime::{Lifetime, LifetimeId};
use indexmap::IndexMap;

use crate::asset::{Evaluated, ProvidedAsset};
use crate::error::CxError;
use crate::target::Target;

/// Live contributions per rank, in registration order within a rank.
pub(crate) type Ranks<A> = Rc<Vec<IndexMap<LifetimeId, ProvidedAsset<A>>>>;

/// Tracks the contributions of `target` bucketed by rank until `tracking` or
/// the target lifetime is cut off.
///
/// The returned tracker already holds the replayed contributions.
pub(crate) fn assets_by_rank<V: 'static, A: 'static>(
	target: &Target<V, A>,
	tracking: &Lifetime,
) -> ValueTracker<Ranks<A>> {
	let tracker: ValueTracker<Ranks<A>> = ValueTracker::new(Rc::default());
	tracker.bind(tracking).bind(target.lifetime());

	let ranks = tracker.clone();
	target.track_assets(move |provided| add(&ranks, provided), tracker.lifetime());
	tracker
}

fn add<A: 'static>(tracker: &ValueTracker<Ranks<A>>, provided: ProvidedAsset<A>) {
	let rank = provided.rank();
	let id = provided.lifetime().id();

	let mut ranks = Vec::clone(&tracker.get());
	if ranks.len() <= rank {
		ranks.resize_with(rank + 1, IndexMap::new);
	}
	ranks[rank].insert(id, provided.clone());
	tracker.set(Rc::new(ranks));

	let removed = tracker.clone();
	provided.lifetime().when_off(move |_| {
		let mut ranks = Vec::clone(&removed.get());
		if let Some(assets) = ranks.get_mut(rank) {
			assets.shift_remove(&id);
		}
		removed.set(Rc::new(ranks));
	});

	let updated = tracker.clone();
	provided.on_update(move || updated.set(updated.get()), &tracker.lifetime().derive());
}

/// The most recent asset, closest rank first, newest contribution first within
/// a rank.
pub(crate) fn recent_of<A: 'static>(
	ranks: &[IndexMap<LifetimeId, ProvidedAsset<A>>],
) -> Result<Option<Evaluated<A>>, CxError> {
	for assets in ranks {
		for provided in assets.values().rev() {
			if let Some(recent) = provided.recent_asset()? {
				return Ok(Some(recent));
			}
		}
	}
	Ok(None)
}

/// Calls `receiver` with the most recent asset of `ranks` now and whenever
/// another evaluation becomes the most recent one.
pub(crate) fn follow_recent<A: 'static>(
	ranks: &ValueTracker<Ranks<A>>,
	mut receiver: impl FnMut(Result<Option<Evaluated<A>>, CxError>) + 'static,
	tracking: &Lifetime,
) {
	let mut last: Option<Option<Evaluated<A>>> = None;
	ranks.read(
		move |ranks| {
			let recent = recent_of(ranks);
			match &recent {
				Ok(evaluated) if last.as_ref() == Some(evaluated) => return,
				Ok(evaluated) => last = Some(evaluated.clone()),
				Err(_) => last = None,
			}
			receiver(recent);
		},
		tracking,
	);
}

/// Every contribution, furthest rank first, registration order within a rank.
pub(crate) fn flatten<A>(
	ranks: &[IndexMap<LifetimeId, ProvidedAsset<A>>],
) -> Vec<ProvidedAsset<A>> {
	ranks
		.iter()
		.rev()
		.flat_map(|assets| assets.values().cloned())
		.collect()
}
