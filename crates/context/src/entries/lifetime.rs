use ctxreg_lifetime::Lifetime;

use crate::entry::{Definition, Entry};
use crate::target::Target;

thread_local! {
	static CONTEXT_LIFETIME: Entry<Lifetime> = Entry::new("context lifetime", define);
}

/// Well-known entry holding the lifetime of a context.
///
/// Resolves to the most recently provided lifetime, or to the lifetime of the
/// builder when none is provided. Entries are thread-bound, so each thread
/// sees its own instance.
pub fn context_lifetime() -> Entry<Lifetime> {
	CONTEXT_LIFETIME.with(Entry::clone)
}

fn define(target: &Target<Lifetime>) -> Definition<Lifetime> {
	let provided = target.clone();
	let owner = target.clone();
	Definition::new()
		.assign(move |assigner| {
			if let Some(lifetime) = provided.recent_asset()? {
				assigner.assign(lifetime);
			}
			Ok(())
		})
		.assign_default(move |assigner| {
			if let Some(lifetime) = owner.builder_lifetime() {
				assigner.assign(lifetime);
			}
			Ok(())
		})
}
