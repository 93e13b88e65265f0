use std::cell::Cell;
use std::rc::Rc;

use crate::builder::{CxValues, Getter};
use crate::entry::{Definition, Entry};
use crate::request::{Request, RequestMethod};
use crate::target::Target;

/// Entry resolved in the context designated by `scope`.
///
/// `scope` holds the getter of the designated context. That context builds the
/// value with `define`; any other context delegates to it, so assets provided
/// to nested contexts are ignored.
pub fn scoped<V: 'static, A: 'static>(
	name: impl Into<Rc<str>>,
	scope: &Entry<Getter>,
	define: impl Fn(&Target<V, A>) -> Definition<V> + 'static,
) -> Entry<V, A> {
	let scope = scope.clone();
	Entry::new(name, move |target: &Target<V, A>| match target.get(&scope) {
		Ok(getter) if getter.is_context_of(target) => define(target),
		Ok(getter) => delegate(target.entry().clone(), getter),
		Err(error) => Definition::failing(error),
	})
}

fn delegate<V: 'static, A: 'static>(entry: Entry<V, A>, getter: Getter) -> Definition<V> {
	Definition::new().assign(move |assigner| {
		let by = Rc::new(Cell::new(RequestMethod::Assets));
		let observed = by.clone();
		let request = Request::new()
			.by(assigner.requested_by())
			.observe(move |_, method| observed.set(method));
		if let Some(value) = getter.get_opt_with(&entry, request)? {
			assigner.assign_by(value, by.get());
		}
		Ok(())
	})
}
