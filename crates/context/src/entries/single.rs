use std::rc::Rc;

use crate::entry::{Definition, Entry};
use crate::memo::Memo;
use crate::target::Target;

type DefaultFn<T> = Rc<dyn Fn(&Target<T>) -> T>;

/// Entry holding the most recent asset, memoized once found.
pub fn single<T: Clone + 'static>(name: impl Into<Rc<str>>) -> Entry<T> {
	Entry::new(name, |target: &Target<T>| define(target, None))
}

/// Like [`single`], falling back to `by_default` when nothing is provided.
pub fn single_or<T: Clone + 'static>(
	name: impl Into<Rc<str>>,
	by_default: impl Fn(&Target<T>) -> T + 'static,
) -> Entry<T> {
	let by_default: DefaultFn<T> = Rc::new(by_default);
	Entry::new(name, move |target: &Target<T>| define(target, Some(by_default.clone())))
}

fn define<T: Clone + 'static>(
	target: &Target<T>,
	by_default: Option<DefaultFn<T>>,
) -> Definition<T> {
	let found = Memo::new();
	let recent = target.clone();
	let definition = Definition::new().assign(move |assigner| {
		if let Some(value) = found.get() {
			assigner.assign(value);
		} else if let Some(asset) = recent.recent_asset()? {
			assigner.assign(found.get_or_init(|| asset));
		}
		Ok(())
	});

	match by_default {
		Some(by_default) => {
			let target = target.clone();
			definition.assign_default(move |assigner| {
				assigner.assign(by_default(&target));
				Ok(())
			})
		}
		None => definition,
	}
}
