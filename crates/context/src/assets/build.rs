use crate::asset::{Asset, Provider};
use crate::entry::Entry;
use crate::error::CxError;
use crate::target::Target;

/// Builds the asset at most once per requesting context.
///
/// The result, including `None`, is cached in the requesting builder until the
/// contribution is revoked.
pub fn build_asset<V: 'static, A: Clone + 'static>(
	entry: &Entry<V, A>,
	build: impl Fn(&Target<V, A>) -> Result<Option<A>, CxError> + 'static,
) -> Asset<V, A> {
	Asset::build(entry, move |target, _| {
		Ok(build(target)?.map(|asset| Provider::of([asset])))
	})
}
