use crate::asset::Asset;
use crate::builder::CxValues;
use crate::entry::Entry;
use crate::error::{CxError, ReferenceCause, ReferenceError};

/// Places the value of `origin` as the asset of `entry`.
///
/// A not-found failure of `origin` is reported as a failure of `entry` caused by
/// it. Other failures pass through unchanged.
pub fn alias_asset<V: 'static, A: 'static, O: 'static>(
	entry: &Entry<V, A>,
	origin: &Entry<A, O>,
) -> Asset<V, A> {
	let origin = origin.clone();
	Asset::place(entry, move |target, collector| match target.get(&origin) {
		Ok(asset) => {
			collector(asset);
			Ok(())
		}
		Err(CxError::Reference(error)) => Err(ReferenceError::no_value(target.entry())
			.caused_by(ReferenceCause::Reference(Box::new(error)))
			.into()),
		Err(error) => Err(error),
	})
}
