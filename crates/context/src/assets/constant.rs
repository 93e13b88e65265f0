use crate::asset::Asset;
use crate::entry::Entry;

/// Places a clone of `value` on every iteration.
pub fn const_asset<V, A: Clone + 'static>(entry: &Entry<V, A>, value: A) -> Asset<V, A> {
	Asset::place(entry, move |_, collector| {
		collector(value.clone());
		Ok(())
	})
}

/// Places nothing, but still occupies a registration slot.
pub fn none_asset<V, A>(entry: &Entry<V, A>) -> Asset<V, A> {
	Asset::place(entry, |_, _| Ok(()))
}
